//! Durable dictionary store with degrade-to-empty reads

use crate::config::StorageConfig;
use crate::dictionary::{
    DATABASE_NAMES, DatabaseId, DatabaseNames, DictionaryKind, DictionarySnapshot,
    SESSION_PARAMETER_VALUES, SessionParameterValues, SimpleDictionary,
};
use crate::error::{OnecMapError, Result};
use crate::storage::backend::{FileBackend, StorageBackend};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// Bounded retry for dictionary reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub attempts: u32,
    /// Fixed delay between attempts
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    /// Retry without sleeping
    pub fn immediate(attempts: u32) -> Self {
        Self {
            attempts,
            backoff: Duration::ZERO,
        }
    }
}

/// Persists dictionary snapshots and reads them back for enrichment
///
/// Each dictionary is written independently. The backend makes every single
/// write atomic, but there is no transaction across the ten dictionaries of
/// a snapshot: a concurrent reader may see members of two consecutive
/// snapshots, each of them complete.
#[derive(Clone)]
pub struct DictionaryStore {
    backend: Arc<dyn StorageBackend>,
    retry: RetryPolicy,
}

impl DictionaryStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self::with_retry(backend, RetryPolicy::default())
    }

    pub fn with_retry(backend: Arc<dyn StorageBackend>, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }

    /// File-backed store from settings
    pub fn from_config(config: &StorageConfig) -> Self {
        Self::with_retry(
            Arc::new(FileBackend::new(config.base_path.clone())),
            RetryPolicy {
                attempts: config.load_attempts,
                backoff: config.retry_backoff(),
            },
        )
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Key of a per-database dictionary: {database_id}/{name}.json
    pub fn database_key(database: &DatabaseId, name: &str) -> String {
        format!("{}/{}.json", database.as_str(), name)
    }

    /// Key of the global database name map
    pub fn database_names_key() -> String {
        format!("{DATABASE_NAMES}.json")
    }

    /// Replace every dictionary of `database` with the snapshot's contents
    pub async fn persist(&self, database: &DatabaseId, snapshot: &DictionarySnapshot) -> Result<()> {
        for kind in DictionaryKind::ALL {
            self.write(&Self::database_key(database, kind.name()), snapshot.get(kind))
                .await?;
        }
        self.write(
            &Self::database_key(database, SESSION_PARAMETER_VALUES),
            &snapshot.session_parameters,
        )
        .await?;

        tracing::info!(
            database = %database,
            entries = snapshot.len(),
            users = snapshot.user.len(),
            metadata = snapshot.metadata.len(),
            session_parameters = snapshot.session_parameter.len(),
            "Persisted dictionary snapshot"
        );
        Ok(())
    }

    /// Replace the global database name map
    pub async fn persist_database_names(&self, names: &DatabaseNames) -> Result<()> {
        self.write(&Self::database_names_key(), names).await?;
        tracing::info!(databases = names.len(), "Persisted database names");
        Ok(())
    }

    /// Read one flat dictionary, empty if it cannot be read
    pub async fn load(&self, database: &DatabaseId, kind: DictionaryKind) -> SimpleDictionary {
        self.load_or_default(&Self::database_key(database, kind.name()))
            .await
    }

    /// Read the nested session parameter values, empty if they cannot be read
    pub async fn load_session_values(&self, database: &DatabaseId) -> SessionParameterValues {
        self.load_or_default(&Self::database_key(database, SESSION_PARAMETER_VALUES))
            .await
    }

    /// Read the database id → display name map, empty if it cannot be read
    pub async fn load_database_names(&self) -> DatabaseNames {
        self.load_or_default(&Self::database_names_key()).await
    }

    /// Read all ten dictionaries of `database` concurrently
    pub async fn load_snapshot(&self, database: &DatabaseId) -> DictionarySnapshot {
        let (
            user,
            computer,
            application,
            event,
            metadata,
            server,
            primary_port,
            secondary_port,
            session_parameter,
            session_parameters,
        ) = tokio::join!(
            self.load(database, DictionaryKind::User),
            self.load(database, DictionaryKind::Computer),
            self.load(database, DictionaryKind::Application),
            self.load(database, DictionaryKind::Event),
            self.load(database, DictionaryKind::Metadata),
            self.load(database, DictionaryKind::Server),
            self.load(database, DictionaryKind::PrimaryPort),
            self.load(database, DictionaryKind::SecondaryPort),
            self.load(database, DictionaryKind::SessionParameter),
            self.load_session_values(database),
        );

        DictionarySnapshot {
            user,
            computer,
            application,
            event,
            metadata,
            server,
            primary_port,
            secondary_port,
            session_parameter,
            session_parameters,
        }
    }

    async fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let data = serde_json::to_vec_pretty(value)?;
        self.backend.put(key, data).await
    }

    async fn load_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        let attempts = self.retry.attempts.max(1);

        for attempt in 1..=attempts {
            match self.try_load(key).await {
                Ok(value) => return value,
                Err(e) if attempt < attempts => {
                    tracing::debug!(
                        key = %key,
                        attempt = attempt,
                        error = %e,
                        "Dictionary read failed, retrying"
                    );
                    if !self.retry.backoff.is_zero() {
                        tokio::time::sleep(self.retry.backoff).await;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        key = %key,
                        attempts = attempts,
                        error = %e,
                        "Dictionary unavailable, using empty mapping"
                    );
                }
            }
        }

        T::default()
    }

    async fn try_load<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        let data = self
            .backend
            .get(key)
            .await?
            .ok_or_else(|| OnecMapError::Storage(format!("dictionary not found: {key}")))?;

        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(T::default());
        }

        let value: Option<T> = serde_json::from_slice(&data)?;
        Ok(value.unwrap_or_default())
    }
}
