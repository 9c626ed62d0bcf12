//! Ledger factory for runtime backend selection.
//!
//! # Environment Variables
//!
//! - `STORAGE_MODE`: `in_memory` (default) | `sqlite`
//! - `DATABASE_URL`: `SQLite` URL, e.g. `sqlite://todo.db` (required when `STORAGE_MODE=sqlite`)
//!
//! # Example
//!
//! ```ignore
//! use infrastructure::factory::{LedgerFactory, RepositoryConfig};
//!
//! let config = RepositoryConfig::from_env()?;
//! let ledger = LedgerFactory::new(config).create(clock).await?;
//! ```

use std::env;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use super::clock::Clock;
use super::in_memory::InMemoryLedger;
use super::repository::{Ledger, RepositoryError};
use super::sqlite::SqliteLedger;

// =============================================================================
// Configuration Types
// =============================================================================

/// Where tasks and history are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageMode {
    /// Process memory; lost on restart.
    #[default]
    InMemory,
    /// `SQLite` database file.
    Sqlite,
}

impl FromStr for StorageMode {
    type Err = ConfigurationError;

    /// Parses a storage mode from a string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidStorageMode` if the string is not recognized.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "in_memory" | "inmemory" | "memory" => Ok(Self::InMemory),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            _ => Err(ConfigurationError::InvalidStorageMode(value.to_string())),
        }
    }
}

/// Errors raised while reading configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Invalid storage mode: {0} (expected in_memory | sqlite)")]
    InvalidStorageMode(String),

    #[error("DATABASE_URL is required when STORAGE_MODE=sqlite")]
    MissingDatabaseUrl,

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Storage configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryConfig {
    pub storage_mode: StorageMode,
    /// `SQLite` URL (required when `storage_mode` is `Sqlite`).
    pub database_url: Option<String>,
}

impl RepositoryConfig {
    /// Reads `STORAGE_MODE` and `DATABASE_URL`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if `STORAGE_MODE` is invalid or
    /// `DATABASE_URL` is missing for the `sqlite` mode.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let storage_mode = match env::var("STORAGE_MODE") {
            Ok(value) => value.parse()?,
            Err(env::VarError::NotPresent) => StorageMode::default(),
            Err(env::VarError::NotUnicode(_)) => {
                return Err(ConfigurationError::InvalidStorageMode(
                    "<non-UTF-8 value>".to_string(),
                ));
            }
        };

        // Empty or whitespace-only counts as unset
        let database_url = env::var("DATABASE_URL")
            .ok()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        let config = Self {
            storage_mode,
            database_url,
        };
        config.validate()?;
        Ok(config)
    }

    /// Configuration for a `SQLite` database at `database_url`.
    #[must_use]
    pub fn sqlite(database_url: impl Into<String>) -> Self {
        Self {
            storage_mode: StorageMode::Sqlite,
            database_url: Some(database_url.into()),
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::MissingDatabaseUrl` for `sqlite` without a URL.
    pub const fn validate(&self) -> Result<(), ConfigurationError> {
        if matches!(self.storage_mode, StorageMode::Sqlite) && self.database_url.is_none() {
            return Err(ConfigurationError::MissingDatabaseUrl);
        }
        Ok(())
    }
}

// =============================================================================
// Factory
// =============================================================================

/// Errors that can occur while creating the ledger.
#[derive(Debug, Error)]
pub enum FactoryError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("Failed to open storage: {0}")]
    Storage(#[from] RepositoryError),
}

/// Builds the configured [`Ledger`].
#[derive(Debug, Clone)]
pub struct LedgerFactory {
    config: RepositoryConfig,
}

impl LedgerFactory {
    #[must_use]
    pub const fn new(config: RepositoryConfig) -> Self {
        Self { config }
    }

    /// Opens the backend selected by the configuration.
    ///
    /// # Errors
    ///
    /// Returns `FactoryError` if the configuration is invalid or the
    /// database cannot be opened.
    pub async fn create(&self, clock: Arc<dyn Clock>) -> Result<Arc<dyn Ledger>, FactoryError> {
        self.config.validate()?;

        match self.config.storage_mode {
            StorageMode::InMemory => {
                tracing::info!("Using in-memory ledger");
                Ok(Arc::new(InMemoryLedger::with_clock(clock)))
            }
            StorageMode::Sqlite => {
                let url = self
                    .config
                    .database_url
                    .as_deref()
                    .ok_or(ConfigurationError::MissingDatabaseUrl)?;
                tracing::info!(database_url = %url, "Opening SQLite ledger");
                let ledger = SqliteLedger::connect_with_clock(url, clock).await?;
                Ok(Arc::new(ledger))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::SystemClock;
    use rstest::rstest;

    #[rstest]
    #[case("in_memory", StorageMode::InMemory)]
    #[case("MEMORY", StorageMode::InMemory)]
    #[case("sqlite", StorageMode::Sqlite)]
    #[case("Sqlite3", StorageMode::Sqlite)]
    fn test_storage_mode_from_str(#[case] input: &str, #[case] expected: StorageMode) {
        assert_eq!(input.parse::<StorageMode>().unwrap(), expected);
    }

    #[rstest]
    fn test_storage_mode_rejects_postgres() {
        assert_eq!(
            "postgres".parse::<StorageMode>(),
            Err(ConfigurationError::InvalidStorageMode("postgres".to_string()))
        );
    }

    #[rstest]
    fn test_validate_requires_database_url_for_sqlite() {
        let config = RepositoryConfig {
            storage_mode: StorageMode::Sqlite,
            database_url: None,
        };
        assert_eq!(config.validate(), Err(ConfigurationError::MissingDatabaseUrl));
        assert!(RepositoryConfig::default().validate().is_ok());
    }

    #[rstest]
    #[tokio::test]
    async fn test_factory_creates_in_memory_ledger_by_default() {
        let factory = LedgerFactory::new(RepositoryConfig::default());
        let ledger = factory.create(Arc::new(SystemClock)).await.unwrap();
        assert_eq!(ledger.backend_name(), "in_memory");
    }

    #[rstest]
    #[tokio::test]
    async fn test_factory_creates_sqlite_ledger() {
        let directory = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", directory.path().join("todo.db").display());
        let factory = LedgerFactory::new(RepositoryConfig::sqlite(url));

        let ledger = factory.create(Arc::new(SystemClock)).await.unwrap();

        assert_eq!(ledger.backend_name(), "sqlite");
    }
}
