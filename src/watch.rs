//! Polls dictionary source files and re-extracts them when they change

use crate::config::WatchSource;
use crate::dictionary::DatabaseId;
use crate::logging::log_error;
use crate::pipeline::extract_and_persist;
use crate::storage::DictionaryStore;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;

struct WatchedFile {
    database: DatabaseId,
    path: PathBuf,
    /// Checksum of the last content that was persisted successfully
    checksum: Option<u32>,
}

/// Watches catalog files (`1Cv8.lgf`) and refreshes the stored dictionaries
pub struct DictionaryWatcher {
    store: DictionaryStore,
    files: Vec<WatchedFile>,
    interval: Duration,
}

impl DictionaryWatcher {
    pub fn new(store: DictionaryStore, sources: Vec<WatchSource>, interval: Duration) -> Self {
        let files = sources
            .into_iter()
            .map(|source| {
                tracing::info!(
                    database = %source.database,
                    path = %source.path.display(),
                    "Added dictionary file for watching"
                );
                WatchedFile {
                    database: source.database,
                    path: source.path,
                    checksum: None,
                }
            })
            .collect();

        Self {
            store,
            files,
            interval,
        }
    }

    /// Check every file once; returns how many were re-extracted
    pub async fn poll_once(&mut self) -> usize {
        let mut refreshed = 0;

        for file in &mut self.files {
            let data = match tokio::fs::read(&file.path).await {
                Ok(data) => data,
                Err(e) => {
                    tracing::warn!(
                        database = %file.database,
                        path = %file.path.display(),
                        error = %e,
                        "Failed to read dictionary file"
                    );
                    continue;
                }
            };

            let checksum = crc32fast::hash(&data);
            if file.checksum == Some(checksum) {
                continue;
            }

            tracing::info!(
                database = %file.database,
                path = %file.path.display(),
                checksum = checksum,
                "Dictionary file changed"
            );

            let text = String::from_utf8_lossy(&data);
            match extract_and_persist(&self.store, &file.database, &text).await {
                Ok(_) => {
                    file.checksum = Some(checksum);
                    refreshed += 1;
                }
                Err(e) => log_error("extract_and_persist", file.database.as_str(), &e),
            }
        }

        refreshed
    }

    /// Poll immediately, then on every interval until `shutdown` becomes true
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Stopping dictionary watcher");
                        break;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::DictionaryKind;
    use crate::storage::{MemoryBackend, RetryPolicy};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn store() -> DictionaryStore {
        DictionaryStore::with_retry(Arc::new(MemoryBackend::new()), RetryPolicy::immediate(1))
    }

    fn source(dir: &TempDir) -> WatchSource {
        WatchSource {
            database: DatabaseId::new("DB1"),
            path: dir.path().join("1Cv8.lgf"),
        }
    }

    #[tokio::test]
    async fn test_poll_extracts_only_on_change() {
        let dir = TempDir::new().unwrap();
        let store = store();
        std::fs::write(dir.path().join("1Cv8.lgf"), "{1,u,\"Admin\",1},\n").unwrap();

        let mut watcher =
            DictionaryWatcher::new(store.clone(), vec![source(&dir)], Duration::from_millis(10));

        assert_eq!(watcher.poll_once().await, 1);
        assert_eq!(watcher.poll_once().await, 0);

        std::fs::write(
            dir.path().join("1Cv8.lgf"),
            "{1,u,\"Admin\",1},\n{1,u,\"Guest\",2},\n",
        )
        .unwrap();
        assert_eq!(watcher.poll_once().await, 1);

        let users = store.load(&DatabaseId::new("DB1"), DictionaryKind::User).await;
        assert_eq!(users.len(), 2);
        assert_eq!(users["2"], "Guest");
    }

    #[tokio::test]
    async fn test_poll_skips_missing_file() {
        let dir = TempDir::new().unwrap();
        let mut watcher = DictionaryWatcher::new(store(), vec![source(&dir)], Duration::from_millis(10));

        assert_eq!(watcher.poll_once().await, 0);

        std::fs::write(dir.path().join("1Cv8.lgf"), "{2,\"WKSTN01\",5},").unwrap();
        assert_eq!(watcher.poll_once().await, 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("1Cv8.lgf"), "{2,\"WKSTN01\",5},").unwrap();
        let store = store();
        let watcher = DictionaryWatcher::new(store.clone(), vec![source(&dir)], Duration::from_millis(10));

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(watcher.run(rx));
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();

        let computers = store.load(&DatabaseId::new("DB1"), DictionaryKind::Computer).await;
        assert_eq!(computers["5"], "WKSTN01");
    }
}
