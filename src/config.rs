//! Application configuration.
//!
//! # Environment Variables
//!
//! - `HOST`: Server host address (default: `0.0.0.0`)
//! - `PORT`: Server port (default: `3000`)
//! - `STORAGE_MODE` / `DATABASE_URL`: see [`RepositoryConfig`]
//! - `ALLOWED_USER`: the one identity allowed to log in (default: `Marushka`)
//! - `IDLE_TIMEOUT_SECS`: idle limit in seconds, must be positive (default: `10`)
//! - `DELETE_MARKER_POLICY`: `keep` (default) | `clear-matching`
//! - `SESSION_RETENTION_SECS`: how long an untouched session slot is kept
//!   (default: `1800`, never less than the idle limit)

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::domain::DeleteMarkerPolicy;
use crate::infrastructure::{ConfigurationError, DEFAULT_SESSION_RETENTION, RepositoryConfig};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_ALLOWED_USER: &str = "Marushka";
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Session and login settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub allowed_identity: String,
    pub idle_timeout: Duration,
    pub delete_marker_policy: DeleteMarkerPolicy,
    pub retention: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            allowed_identity: DEFAULT_ALLOWED_USER.to_string(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            delete_marker_policy: DeleteMarkerPolicy::default(),
            retention: DEFAULT_SESSION_RETENTION,
        }
    }
}

impl SessionConfig {
    /// Reads `ALLOWED_USER`, `IDLE_TIMEOUT_SECS`, `DELETE_MARKER_POLICY` and
    /// `SESSION_RETENTION_SECS`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidValue` for a non-positive duration,
    /// an unknown policy or an empty identity.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let defaults = Self::default();

        let allowed_identity = match env::var("ALLOWED_USER") {
            Ok(value) if value.is_empty() => {
                return Err(invalid("ALLOWED_USER", "must not be empty"));
            }
            Ok(value) => value,
            Err(_) => defaults.allowed_identity,
        };

        let idle_timeout = match non_empty_var("IDLE_TIMEOUT_SECS") {
            Some(value) => parse_seconds("IDLE_TIMEOUT_SECS", &value)?,
            None => defaults.idle_timeout,
        };

        let delete_marker_policy = match non_empty_var("DELETE_MARKER_POLICY") {
            Some(value) => value
                .parse()
                .map_err(|error| invalid("DELETE_MARKER_POLICY", error))?,
            None => defaults.delete_marker_policy,
        };

        let retention = match non_empty_var("SESSION_RETENTION_SECS") {
            Some(value) => parse_seconds("SESSION_RETENTION_SECS", &value)?,
            None => defaults.retention,
        };

        Ok(Self {
            allowed_identity,
            idle_timeout,
            delete_marker_policy,
            retention,
        })
    }

    /// Retention for session slots, raised to the idle limit when shorter so
    /// an expired session can still show its timeout notice.
    #[must_use]
    pub fn slot_retention(&self) -> Duration {
        self.retention.max(self.idle_timeout)
    }
}

/// Everything the server needs at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub repository: RepositoryConfig,
    pub session: SessionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            repository: RepositoryConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

impl AppConfig {
    /// Reads the whole configuration from the environment.
    ///
    /// Call `dotenvy::dotenv()` first if a `.env` file should be honored.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigurationError` encountered.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let host = non_empty_var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match non_empty_var("PORT") {
            Some(value) => value
                .parse()
                .map_err(|error| invalid("PORT", format!("{error}")))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            host,
            port,
            repository: RepositoryConfig::from_env()?,
            session: SessionConfig::from_env()?,
        })
    }

    #[must_use]
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Socket address to bind.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidValue` when `host:port` is not a
    /// socket address.
    pub fn socket_address(&self) -> Result<SocketAddr, ConfigurationError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|error| invalid("HOST", format!("{}:{} ({error})", self.host, self.port)))
    }
}

/// Builder for [`AppConfig`], mostly for tests.
#[derive(Debug, Clone, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    #[must_use]
    pub fn allowed_identity(mut self, identity: impl Into<String>) -> Self {
        self.config.session.allowed_identity = identity.into();
        self
    }

    #[must_use]
    pub fn idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.config.session.idle_timeout = idle_timeout;
        self
    }

    #[must_use]
    pub fn delete_marker_policy(mut self, policy: DeleteMarkerPolicy) -> Self {
        self.config.session.delete_marker_policy = policy;
        self
    }

    #[must_use]
    pub fn repository(mut self, repository: RepositoryConfig) -> Self {
        self.config.repository = repository;
        self
    }

    #[must_use]
    pub fn build(self) -> AppConfig {
        self.config
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_seconds(key: &str, value: &str) -> Result<Duration, ConfigurationError> {
    match value.parse::<u64>() {
        Ok(0) => Err(invalid(key, "must be greater than 0")),
        Ok(seconds) => Ok(Duration::from_secs(seconds)),
        Err(error) => Err(invalid(key, format!("{value} ({error})"))),
    }
}

fn invalid(key: &str, message: impl ToString) -> ConfigurationError {
    ConfigurationError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}
