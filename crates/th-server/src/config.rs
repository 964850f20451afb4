//! Configuration management

use serde::{Deserialize, Serialize};
use th_import::config::{IdentifierPolicy, ImportConfig};

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    /// Import options used when a request does not override them
    pub import: ImportConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins; empty or `*` allows any origin
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from environment and defaults
    ///
    /// Store credentials are loaded separately through
    /// [`th_import::config::StoreConfig::from_env`].
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let mut import = ImportConfig::default();
        if env_flag("TH_OFFSET_MEMBER_IDS") {
            import = import.with_identifier_policy(IdentifierPolicy::Offset);
        }
        if let Ok(suffix) = std::env::var("TH_EMAIL_SUFFIX") {
            if !suffix.is_empty() {
                import = import.with_email_suffix(suffix);
            }
        }

        let config = Config {
            server: ServerConfig {
                host: std::env::var("TH_HOST").unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
                port: std::env::var("TH_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: std::env::var("TH_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            },
            cors: CorsConfig {
                allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "*".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            import,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.server.host.trim().is_empty() {
            anyhow::bail!("Server host cannot be empty");
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            cors: CorsConfig {
                allowed_origins: vec!["*".to_string()],
            },
            import: ImportConfig::default(),
        }
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;
    use th_import::config::EmailTransform;

    #[test]
    #[serial]
    fn test_load_from_env() {
        std::env::set_var("TH_PORT", "9100");
        std::env::set_var("TH_OFFSET_MEMBER_IDS", "true");
        std::env::set_var("TH_EMAIL_SUFFIX", ".imported");

        let config = Config::load().unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.import.member_id_offset(), 1_000_000);
        assert_eq!(
            config.import.email_transform,
            EmailTransform::Suffix(".imported".into())
        );

        std::env::remove_var("TH_PORT");
        std::env::remove_var("TH_OFFSET_MEMBER_IDS");
        std::env::remove_var("TH_EMAIL_SUFFIX");
    }

    #[test]
    fn test_validate_rejects_port_zero() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
        assert!(Config::default().validate().is_ok());
    }
}
