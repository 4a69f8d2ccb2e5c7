//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::{net::IpAddr, path::PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub media: MediaConfig,
    /// Only required when `media.backend = "r2"`
    #[serde(default)]
    pub cloudflare: Option<CloudflareConfig>,
    pub auth: AuthConfig,
    pub activity: ActivityConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Public domain (e.g., "posts.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the base URL for the site
    ///
    /// # Returns
    /// Full URL like "https://posts.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Where uploaded images are kept
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaBackend {
    /// Local directory, served under `/media`
    #[default]
    Local,
    /// Cloudflare R2 bucket
    R2,
}

/// Media storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    #[serde(default)]
    pub backend: MediaBackend,
    /// Root directory for the local backend
    pub root: PathBuf,
    /// Public URL prefix for stored files
    /// e.g., "/media" or "https://media.example.com"
    pub public_url: String,
    /// R2 bucket name
    pub bucket: Option<String>,
}

/// Cloudflare credentials
#[derive(Debug, Clone, Deserialize)]
pub struct CloudflareConfig {
    /// Cloudflare account ID
    pub account_id: String,
    /// R2 access key ID
    pub r2_access_key_id: String,
    /// R2 secret access key
    pub r2_secret_access_key: String,
}

/// Session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Session secret key (32+ bytes)
    pub session_secret: String,
    /// Session max age in seconds (default: 1209600 = 14 days)
    pub session_max_age: i64,
}

/// Last-seen tracking configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityConfig {
    /// Minimum seconds between two writes of a user's last-seen time
    pub interval_seconds: i64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (POSTWALL__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.domain", "localhost:8080")?
            .set_default("server.protocol", "http")?
            .set_default("database.path", "data/postwall.db")?
            .set_default("media.backend", "local")?
            .set_default("media.root", "data/media")?
            .set_default("media.public_url", "/media")?
            .set_default("auth.session_max_age", 1_209_600)?
            .set_default("activity.interval_seconds", 300)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("POSTWALL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn should_use_secure_cookies(&self) -> bool {
        self.server.protocol.eq_ignore_ascii_case("https")
            || !is_local_server_domain(&self.server.domain)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_SESSION_SECRET_BYTES: usize = 32;

        if self.auth.session_secret.as_bytes().len() < MIN_SESSION_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.session_secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.auth.session_max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.session_max_age must be greater than 0".to_string(),
            ));
        }

        if self.activity.interval_seconds <= 0 {
            return Err(crate::error::AppError::Config(
                "activity.interval_seconds must be greater than 0".to_string(),
            ));
        }

        if self.media.backend == MediaBackend::R2 {
            if self.media.bucket.as_deref().map(str::trim).unwrap_or("").is_empty() {
                return Err(crate::error::AppError::Config(
                    "media.bucket is required when media.backend=r2".to_string(),
                ));
            }
            if self.cloudflare.is_none() {
                return Err(crate::error::AppError::Config(
                    "cloudflare credentials are required when media.backend=r2".to_string(),
                ));
            }
        }

        if !self.should_use_secure_cookies() {
            tracing::warn!(
                domain = %self.server.domain,
                protocol = %self.server.protocol,
                "Using insecure session cookies for local development"
            );
        }

        Ok(())
    }
}

fn normalized_server_host(domain: &str) -> String {
    let trimmed = domain.trim();
    let host = match trimmed.rsplit_once(':') {
        Some((host, port))
            if !host.contains(':') && port.chars().all(|c| c.is_ascii_digit()) =>
        {
            host
        }
        _ => trimmed,
    };
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .trim_end_matches('.')
        .to_ascii_lowercase()
}

fn is_local_server_domain(domain: &str) -> bool {
    let host = normalized_server_host(domain);
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                domain: "localhost:8080".to_string(),
                protocol: "http".to_string(),
            },
            database: DatabaseConfig {
                path: PathBuf::from("/tmp/postwall-test.db"),
            },
            media: MediaConfig {
                backend: MediaBackend::Local,
                root: PathBuf::from("/tmp/postwall-media"),
                public_url: "/media".to_string(),
                bucket: None,
            },
            cloudflare: None,
            auth: AuthConfig {
                session_secret: "x".repeat(32),
                session_max_age: 604_800,
            },
            activity: ActivityConfig {
                interval_seconds: 300,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    #[test]
    fn validate_accepts_http_on_localhost() {
        let config = valid_config();
        assert!(config.validate().is_ok());
        assert!(!config.should_use_secure_cookies());
    }

    #[test]
    fn validate_rejects_short_session_secret() {
        let mut config = valid_config();
        config.auth.session_secret = "short-secret".to_string();

        let error = config
            .validate()
            .expect_err("session secret shorter than 32 bytes must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("auth.session_secret")
        ));
    }

    #[test]
    fn validate_rejects_zero_activity_interval() {
        let mut config = valid_config();
        config.activity.interval_seconds = 0;

        let error = config.validate().expect_err("interval must be positive");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("activity.interval_seconds")
        ));
    }

    #[test]
    fn validate_requires_bucket_for_r2() {
        let mut config = valid_config();
        config.media.backend = MediaBackend::R2;
        config.cloudflare = Some(CloudflareConfig {
            account_id: "account".to_string(),
            r2_access_key_id: "key".to_string(),
            r2_secret_access_key: "secret".to_string(),
        });

        let error = config.validate().expect_err("bucket is required");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message) if message.contains("media.bucket")
        ));

        config.media.bucket = Some("media".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn public_domain_uses_secure_cookies() {
        let mut config = valid_config();
        config.server.domain = "posts.example.com".to_string();
        assert!(config.should_use_secure_cookies());
        assert!(!is_local_server_domain("posts.example.com"));
        assert!(is_local_server_domain("127.0.0.1:3000"));
    }
}
