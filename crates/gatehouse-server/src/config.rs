//! Server configuration loading.
//!
//! Configuration is a single TOML file. Every section has defaults, so a
//! missing file still yields a runnable development configuration.
//!
//! # Example (gatehouse.toml)
//!
//! ```toml
//! listen = "127.0.0.1:8080"
//! cors_allowed_origins = ["https://localhost:4200"]
//! subject_header = "x-authenticated-subject"
//! grant_cleanup_interval = "5m"
//!
//! [auth]
//! issuer = "https://id.example.com"
//! audience = "https://api.example.com"
//!
//! [[seed_clients]]
//! client_id = "web-app"
//! name = "Web App"
//! redirect_uris = ["https://localhost:4200/callback"]
//! scopes = ["openid", "read"]
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::seed::SeedClient;
use gatehouse_auth::config::AuthConfig;

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        /// The path that failed to read.
        path: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        /// The path that failed to parse.
        path: String,
        /// The underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
}

/// Root server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the server binds to.
    pub listen: String,

    /// Origins allowed for cross-origin requests. Empty disables CORS
    /// entirely (no cross-origin access).
    pub cors_allowed_origins: Vec<String>,

    /// Header carrying the authenticated subject, set by the fronting
    /// authentication layer. Requests to the authorization endpoint without
    /// it are rejected.
    pub subject_header: String,

    /// How often expired codes and dead refresh tokens are garbage
    /// collected.
    #[serde(with = "humantime_serde")]
    pub grant_cleanup_interval: Duration,

    /// Authorization server core configuration.
    pub auth: AuthConfig,

    /// Clients created at startup if absent. Registration CRUD beyond this
    /// bootstrap is delegated to the management interface.
    pub seed_clients: Vec<SeedClient>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8080".to_string(),
            cors_allowed_origins: Vec::new(),
            subject_header: "x-authenticated-subject".to_string(),
            grant_cleanup_interval: Duration::from_secs(300),
            auth: AuthConfig::default(),
            seed_clients: Vec::new(),
        }
    }
}

/// Loads configuration from the given path.
///
/// A missing file is not an error: defaults apply, which is the expected
/// mode for local development.
///
/// # Errors
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "config file not found, using defaults");
        return Ok(ServerConfig::default());
    }

    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.listen, "127.0.0.1:8080");
        assert_eq!(config.subject_header, "x-authenticated-subject");
        assert!(config.seed_clients.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            listen = "0.0.0.0:9000"
            cors_allowed_origins = ["https://localhost:4200"]
            grant_cleanup_interval = "1m"

            [auth]
            issuer = "https://id.example.com"

            [[seed_clients]]
            client_id = "web-app"
            name = "Web App"
            redirect_uris = ["https://localhost:4200/callback"]
            scopes = ["openid", "read"]
        "#;

        let config: ServerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.listen, "0.0.0.0:9000");
        assert_eq!(config.cors_allowed_origins.len(), 1);
        assert_eq!(config.grant_cleanup_interval, Duration::from_secs(60));
        assert_eq!(config.auth.issuer, "https://id.example.com");
        assert_eq!(config.seed_clients.len(), 1);
        assert_eq!(config.seed_clients[0].client_id, "web-app");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = load_config(Path::new("/nonexistent/gatehouse.toml")).unwrap();
        assert_eq!(config.listen, "127.0.0.1:8080");
    }
}
