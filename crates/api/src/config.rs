//! Application configuration loaded from environment variables.

use std::time::Duration;

use domain::Email;
use provisioning::{DEFAULT_DERIVED_EMAIL_DOMAIN, HostedIdentityConfig};
use thiserror::Error;
use url::Url;

const DEFAULT_AUTH_TIMEOUT_SECS: u64 = 10;

/// Invalid combination or value of configuration variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{set} is set but {missing} is not")]
    Incomplete {
        set: &'static str,
        missing: &'static str,
    },

    #[error("Invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: Postgres connection string (unset: in-memory record store)
/// - `AUTH_URL`, `AUTH_SERVICE_KEY`: hosted auth admin API (unset: in-memory identities)
/// - `AUTH_TIMEOUT_SECS`: auth request timeout (default: `10`)
/// - `DERIVED_EMAIL_DOMAIN`: domain for emails derived from codes (default: `"school.local"`)
/// - `RUN_MIGRATIONS`: apply migrations on startup (default: `true`)
#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub auth_url: Option<String>,
    pub auth_service_key: Option<String>,
    pub auth_timeout_secs: u64,
    pub derived_email_domain: String,
    pub run_migrations: bool,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through `lookup`, treating blank values as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: var("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: var("DATABASE_URL"),
            auth_url: var("AUTH_URL"),
            auth_service_key: var("AUTH_SERVICE_KEY"),
            auth_timeout_secs: var("AUTH_TIMEOUT_SECS")
                .and_then(|t| t.parse().ok())
                .unwrap_or(defaults.auth_timeout_secs),
            derived_email_domain: var("DERIVED_EMAIL_DOMAIN")
                .unwrap_or(defaults.derived_email_domain),
            run_migrations: var("RUN_MIGRATIONS")
                .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no"))
                .unwrap_or(defaults.run_migrations),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Rejects values that would only fail later, on the first request.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Derived logins are `<code>@<domain>`, so the domain must form a valid address.
        Email::parse(&format!("user@{}", self.derived_email_domain)).map_err(|e| {
            ConfigError::Invalid {
                name: "DERIVED_EMAIL_DOMAIN",
                reason: e.to_string(),
            }
        })?;
        Ok(())
    }

    /// Settings for the hosted identity service, or `None` to run in memory.
    pub fn hosted_identity(&self) -> Result<Option<HostedIdentityConfig>, ConfigError> {
        let (url, key) = match (&self.auth_url, &self.auth_service_key) {
            (None, None) => return Ok(None),
            (Some(_), None) => {
                return Err(ConfigError::Incomplete {
                    set: "AUTH_URL",
                    missing: "AUTH_SERVICE_KEY",
                });
            }
            (None, Some(_)) => {
                return Err(ConfigError::Incomplete {
                    set: "AUTH_SERVICE_KEY",
                    missing: "AUTH_URL",
                });
            }
            (Some(url), Some(key)) => (url, key),
        };

        let base_url = Url::parse(url).map_err(|e| ConfigError::Invalid {
            name: "AUTH_URL",
            reason: e.to_string(),
        })?;

        Ok(Some(HostedIdentityConfig {
            base_url,
            service_key: key.clone(),
            timeout: Duration::from_secs(self.auth_timeout_secs),
        }))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            auth_url: None,
            auth_service_key: None,
            auth_timeout_secs: DEFAULT_AUTH_TIMEOUT_SECS,
            derived_email_domain: DEFAULT_DERIVED_EMAIL_DOMAIN.to_string(),
            run_migrations: true,
        }
    }
}

// Connection strings and keys carry credentials.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("auth_url", &self.auth_url)
            .field(
                "auth_service_key",
                &self.auth_service_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("auth_timeout_secs", &self.auth_timeout_secs)
            .field("derived_email_domain", &self.derived_email_domain)
            .field("run_migrations", &self.run_migrations)
            .finish()
    }
}
