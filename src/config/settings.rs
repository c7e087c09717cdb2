use crate::dictionary::DatabaseId;
use crate::error::{OnecMapError, Result};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Settings {
    pub storage: StorageConfig,
    pub watch: WatchConfig,
    pub enrich: EnrichConfig,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub base_path: PathBuf,
    pub load_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl StorageConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub sources: Vec<WatchSource>,
    pub poll_interval_ms: u64,
}

impl WatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatchSource {
    pub database: DatabaseId,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct EnrichConfig {
    pub stdin: bool,
}

pub fn load_settings() -> Result<Settings> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let storage = StorageConfig {
        base_path: std::env::var("ONEC_MAP_STORAGE_PATH")
            .unwrap_or_else(|_| "/var/lib/onec-map".to_string())
            .into(),
        load_attempts: std::env::var("ONEC_MAP_LOAD_ATTEMPTS")
            .unwrap_or_else(|_| "3".to_string())
            .parse()
            .map_err(|_| OnecMapError::Config("Invalid ONEC_MAP_LOAD_ATTEMPTS".to_string()))?,
        retry_backoff_ms: std::env::var("ONEC_MAP_RETRY_BACKOFF_MS")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .map_err(|_| OnecMapError::Config("Invalid ONEC_MAP_RETRY_BACKOFF_MS".to_string()))?,
    };

    let watch = WatchConfig {
        sources: parse_watch_sources(&std::env::var("ONEC_MAP_WATCH").unwrap_or_default())?,
        poll_interval_ms: std::env::var("ONEC_MAP_POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "500".to_string())
            .parse()
            .map_err(|_| OnecMapError::Config("Invalid ONEC_MAP_POLL_INTERVAL_MS".to_string()))?,
    };

    let enrich = EnrichConfig {
        stdin: std::env::var("ONEC_MAP_ENRICH_STDIN")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .map_err(|_| OnecMapError::Config("Invalid ONEC_MAP_ENRICH_STDIN".to_string()))?,
    };

    Ok(Settings {
        storage,
        watch,
        enrich,
    })
}

/// Parse `db1=/path/a.lgf;db2=/path/b.lgf` into watch sources
pub fn parse_watch_sources(raw: &str) -> Result<Vec<WatchSource>> {
    raw.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (database, path) = entry.split_once('=').ok_or_else(|| {
                OnecMapError::Config(format!("Invalid ONEC_MAP_WATCH entry: {entry}"))
            })?;
            let (database, path) = (database.trim(), path.trim());
            if database.is_empty() || path.is_empty() {
                return Err(OnecMapError::Config(format!(
                    "Invalid ONEC_MAP_WATCH entry: {entry}"
                )));
            }
            Ok(WatchSource {
                database: DatabaseId::new(database),
                path: PathBuf::from(path),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_watch_sources() {
        let sources =
            parse_watch_sources("DB1=/srv/1c/db1/1Cv8.lgf; DB2 = /srv/1c/db2/1Cv8.lgf;").unwrap();

        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].database.as_str(), "DB1");
        assert_eq!(sources[0].path, PathBuf::from("/srv/1c/db1/1Cv8.lgf"));
        assert_eq!(sources[1].database.as_str(), "DB2");
    }

    #[test]
    fn test_parse_watch_sources_empty() {
        assert!(parse_watch_sources("").unwrap().is_empty());
        assert!(parse_watch_sources(" ; ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_watch_sources_rejects_malformed_entry() {
        assert!(matches!(
            parse_watch_sources("DB1"),
            Err(OnecMapError::Config(_))
        ));
        assert!(matches!(
            parse_watch_sources("=/tmp/x"),
            Err(OnecMapError::Config(_))
        ));
    }
}
