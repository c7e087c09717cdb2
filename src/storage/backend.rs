//! Storage backends for persisted dictionaries

use crate::error::{OnecMapError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use uuid::Uuid;

/// Keyed blob storage shared by the extraction and enrichment stages.
///
/// Keys are `/`-separated relative paths such as `DB1/user.json`.
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// Reads an object, `Ok(None)` if it does not exist.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Replaces an object. Readers observe either the old or the new
    /// content, never a partial write.
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()>;
}

/// Filesystem backend rooted at a base directory
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the path for a key: {root}/{database_id}/{name}.json
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !valid {
            return Err(OnecMapError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl StorageBackend for FileBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()> {
        let path = self.path_for(key)?;
        let parent = path
            .parent()
            .ok_or_else(|| OnecMapError::InvalidKey(key.to_string()))?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| OnecMapError::InvalidKey(key.to_string()))?;

        fs::create_dir_all(parent).await?;

        // Same directory as the target so the rename stays on one filesystem
        let tmp = parent.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));
        fs::write(&tmp, &data).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        tracing::trace!(path = %path.display(), bytes = data.len(), "Wrote dictionary file");
        Ok(())
    }
}

/// In-memory backend with read failure injection
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    objects: Arc<DashMap<String, Vec<u8>>>,
    failures: Arc<DashMap<String, u32>>,
    reads: Arc<DashMap<String, u32>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` reads of `key` fail
    pub fn inject_read_failures(&self, key: impl Into<String>, count: u32) {
        self.failures.insert(key.into(), count);
    }

    /// Number of reads attempted for `key`
    pub fn read_count(&self, key: &str) -> u32 {
        self.reads.get(key).map(|count| *count.value()).unwrap_or(0)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        *self.reads.entry(key.to_string()).or_insert(0) += 1;

        if let Some(mut remaining) = self.failures.get_mut(key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(OnecMapError::Storage(format!("injected failure: {key}")));
            }
        }

        Ok(self.objects.get(key).map(|data| data.value().clone()))
    }

    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()> {
        self.objects.insert(key.to_string(), data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_path_for_rejects_escaping_keys() {
        let backend = FileBackend::new("/var/lib/onec-map");

        assert_eq!(
            backend.path_for("DB1/user.json").unwrap(),
            PathBuf::from("/var/lib/onec-map/DB1/user.json")
        );
        assert!(backend.path_for("../etc/passwd").is_err());
        assert!(backend.path_for("/user.json").is_err());
        assert!(backend.path_for("DB1/../../x").is_err());
        assert!(backend.path_for("").is_err());
    }

    #[tokio::test]
    async fn test_file_backend_put_get() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::new(dir.path());

        assert!(backend.get("DB1/user.json").await.unwrap().is_none());

        backend
            .put("DB1/user.json", b"{\"1\":\"Admin\"}".to_vec())
            .await
            .unwrap();
        backend
            .put("DB1/user.json", b"{\"2\":\"Guest\"}".to_vec())
            .await
            .unwrap();

        let data = backend.get("DB1/user.json").await.unwrap().unwrap();
        assert_eq!(data, b"{\"2\":\"Guest\"}");
    }

    #[tokio::test]
    async fn test_file_backend_leaves_no_temporary_files() {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::new(dir.path());

        backend.put("DB1/event.json", b"{}".to_vec()).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path().join("DB1"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["event.json".to_string()]);
    }

    #[tokio::test]
    async fn test_memory_backend_injected_failures() {
        let backend = MemoryBackend::new();
        backend.put("DB1/user.json", b"{}".to_vec()).await.unwrap();
        backend.inject_read_failures("DB1/user.json", 2);

        assert!(backend.get("DB1/user.json").await.is_err());
        assert!(backend.get("DB1/user.json").await.is_err());
        assert!(backend.get("DB1/user.json").await.unwrap().is_some());
        assert_eq!(backend.read_count("DB1/user.json"), 3);
    }
}
