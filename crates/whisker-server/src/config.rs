//! Configuration types and loading logic.

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;
use whisker_tracing::TracingConfig;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub tracing: TracingConfig,
}

/// Server listen configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
}

/// Authorization configuration for the /cats resource.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_token")]
    pub token: String,
}

fn default_listen_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_token() -> String {
    "secret_token".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token: default_token(),
        }
    }
}

impl ServerConfig {
    /// Base URL for calling back into this server, e.g. from /run_test.
    pub fn self_base_url(&self) -> String {
        let addr = self.listen_address.replace("0.0.0.0", "127.0.0.1");
        format!("http://{addr}")
    }
}

impl AppConfig {
    /// Load configuration from TOML file and environment variables.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (WHISKER_ prefix, __ for nesting)
    /// 2. TOML config file
    /// 3. Defaults
    pub fn load(config_path: &str) -> anyhow::Result<Self> {
        let config = Figment::new()
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("WHISKER_").split("__"))
            .extract()?;
        Ok(config)
    }
}
