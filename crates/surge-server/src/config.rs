//! Server configuration.
//!
//! Configuration can be loaded from:
//! - Environment variables (SURGE_*)
//! - TOML configuration file

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

use surge_core::DEFAULT_ACTIVITY_TIMEOUT;

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// The application identity served by this instance.
    #[serde(default)]
    pub app: AppIdentity,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// The single configured application identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppIdentity {
    /// Application id, used in the publish endpoint path.
    #[serde(default = "default_app_id")]
    pub id: String,

    /// Application key presented by connecting clients.
    #[serde(default = "default_app_key")]
    pub key: String,

    /// Application secret used to sign subscription auth tokens.
    #[serde(default = "default_app_secret")]
    pub secret: String,

    /// Activity-timeout hint sent to clients, in seconds.
    #[serde(default = "default_activity_timeout")]
    pub activity_timeout_secs: u64,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics export.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics port.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default value functions
fn default_host() -> String {
    std::env::var("SURGE_HOST").unwrap_or_else(|_| "127.0.0.1".to_string())
}

fn default_port() -> u16 {
    std::env::var("SURGE_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080)
}

fn default_app_id() -> String {
    std::env::var("SURGE_APP_ID").unwrap_or_else(|_| "app".to_string())
}

fn default_app_key() -> String {
    std::env::var("SURGE_APP_KEY").unwrap_or_else(|_| "app-key".to_string())
}

fn default_app_secret() -> String {
    std::env::var("SURGE_APP_SECRET").unwrap_or_else(|_| "app-secret".to_string())
}

fn default_activity_timeout() -> u64 {
    DEFAULT_ACTIVITY_TIMEOUT
}

fn default_true() -> bool {
    true
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            app: AppIdentity::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for AppIdentity {
    fn default() -> Self {
        Self {
            id: default_app_id(),
            key: default_app_key(),
            secret: default_app_secret(),
            activity_timeout_secs: default_activity_timeout(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_metrics_port(),
        }
    }
}

impl Config {
    /// Load configuration from file or defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_paths = [
            "surge.toml",
            "/etc/surge/surge.toml",
            "~/.config/surge/surge.toml",
        ];

        for path in &config_paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::from_file(expanded.as_ref());
            }
        }

        // Fall back to defaults with environment overrides
        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Get the socket address to bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("Invalid host:port")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert!(config.metrics.enabled);
        assert_eq!(config.app.activity_timeout_secs, 120);
    }

    #[test]
    fn test_config_bind_addr() {
        let config = Config::default();
        let addr = config.bind_addr();
        assert_eq!(addr.port(), 8080);
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            host = "0.0.0.0"
            port = 9000

            [app]
            id = "chat"
            key = "chat-key"
            secret = "chat-secret"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert_eq!(config.app.id, "chat");
        assert_eq!(config.app.key, "chat-key");
        assert_eq!(config.app.activity_timeout_secs, 120);
    }
}
