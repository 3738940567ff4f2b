use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;

/// Listener settings shared by every binary in this workspace.
///
/// Only the HTTP lifecycle lives here; service-specific settings
/// (database pool, aggregator credentials) belong to the service crate.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Bind address. Port 0 asks the OS for a free port, which the test
    /// harness relies on.
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Config {
    /// Load from an optional `configuration.*` file, with `APP`-prefixed
    /// environment variables (`APP__HOST`, `APP__PORT`) taking precedence.
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "host": "127.0.0.1", "port": 9000 }"#).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9000);
    }
}
