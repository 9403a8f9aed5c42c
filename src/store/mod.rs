//! File-backed JSON key/value storage.
//!
//! A [`JsonStore`] owns a single JSON document on disk. Every operation takes
//! the per-file lock from the shared [`LockRegistry`], so `read`, `write` and
//! `update` against one file never interleave.

mod lock;

pub use lock::LockRegistry;

use serde::{de::DeserializeOwned, Serialize};
use std::{
    io::ErrorKind,
    marker::PhantomData,
    path::PathBuf,
    sync::Arc,
};
use tokio::{fs, sync::Mutex};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed content in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode value for {path}: {source}")]
    Serialize {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub struct JsonStore<T> {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
    _value: PhantomData<fn() -> T>,
}

impl<T> JsonStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(registry: &LockRegistry, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock = registry.lock_for(&path);
        Self {
            path,
            lock,
            _value: PhantomData,
        }
    }

    #[cfg(test)]
    fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Returns the stored value, or `T::default()` when nothing was written yet.
    pub async fn read(&self) -> Result<T, StoreError> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    /// Replaces the stored value.
    pub async fn write(&self, value: &T) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        self.persist(value).await
    }

    /// Read-modify-write under the file lock.
    ///
    /// The updater runs against the freshly loaded value. When it returns
    /// `Ok`, the mutated value is persisted and the result handed back; when
    /// it returns `Err`, nothing is written. The lock is released on both
    /// paths. The updater must not call back into this store.
    pub async fn update<R, E, F>(&self, updater: F) -> Result<R, E>
    where
        F: FnOnce(&mut T) -> Result<R, E>,
        E: From<StoreError>,
    {
        let _guard = self.lock.lock().await;
        let mut value = self.load().await?;
        let result = updater(&mut value)?;
        self.persist(&value).await?;
        Ok(result)
    }

    async fn load(&self) -> Result<T, StoreError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(T::default()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.display_path(),
                    source,
                })
            }
        };

        serde_json::from_slice(&bytes).map_err(|source| StoreError::Parse {
            path: self.display_path(),
            source,
        })
    }

    async fn persist(&self, value: &T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Serialize {
            path: self.display_path(),
            source,
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }

        // Atomic write
        let temp_path = self.temp_path();
        fs::write(&temp_path, &bytes)
            .await
            .map_err(|source| self.io_error(source))?;
        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|source| self.io_error(source))?;

        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.display_path(),
            source,
        }
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        value: u64,
    }

    #[derive(Debug, thiserror::Error)]
    enum TestError {
        #[error("store: {0}")]
        Store(#[from] StoreError),
        #[error("refused")]
        Refused,
    }

    fn counter_store(dir: &TempDir, registry: &LockRegistry) -> JsonStore<Counter> {
        JsonStore::new(registry, dir.path().join("counter.json"))
    }

    #[tokio::test]
    async fn read_missing_file_returns_default() {
        let dir = TempDir::new().unwrap();
        let registry = LockRegistry::new();
        let store = counter_store(&dir, &registry);

        assert_eq!(store.read().await.unwrap(), Counter::default());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn write_then_read_returns_same_value() {
        let dir = TempDir::new().unwrap();
        let registry = LockRegistry::new();
        let store: JsonStore<BTreeMap<String, Vec<String>>> =
            JsonStore::new(&registry, dir.path().join("nested/dir/map.json"));

        let mut value = BTreeMap::new();
        value.insert("alice".to_string(), vec!["a".to_string(), "b".to_string()]);
        value.insert("bob".to_string(), Vec::new());
        store.write(&value).await.unwrap();

        assert_eq!(store.read().await.unwrap(), value);
        assert!(!dir.path().join("nested/dir/map.json.tmp").exists());
    }

    #[tokio::test]
    async fn malformed_content_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let registry = LockRegistry::new();
        let store = counter_store(&dir, &registry);
        std::fs::write(store.path(), "{ not json").unwrap();

        let err = store.read().await.unwrap_err();
        assert!(matches!(err, StoreError::Parse { .. }));
    }

    #[tokio::test]
    async fn reading_a_directory_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let registry = LockRegistry::new();
        let store: JsonStore<Counter> = JsonStore::new(&registry, dir.path());

        let err = store.read().await.unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[tokio::test]
    async fn update_returns_result_and_persists() {
        let dir = TempDir::new().unwrap();
        let registry = LockRegistry::new();
        let store = counter_store(&dir, &registry);

        let previous = store
            .update(|counter| {
                let previous = counter.value;
                counter.value += 5;
                Ok::<_, StoreError>(previous)
            })
            .await
            .unwrap();

        assert_eq!(previous, 0);
        assert_eq!(store.read().await.unwrap().value, 5);
    }

    #[tokio::test]
    async fn failed_update_writes_nothing_and_releases_lock() {
        let dir = TempDir::new().unwrap();
        let registry = LockRegistry::new();
        let store = counter_store(&dir, &registry);
        store.write(&Counter { value: 1 }).await.unwrap();

        let err = store
            .update(|counter| {
                counter.value = 99;
                Err::<(), _>(TestError::Refused)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TestError::Refused));

        // Would hang if the guard leaked.
        assert_eq!(store.read().await.unwrap().value, 1);
    }

    #[tokio::test]
    async fn two_concurrent_increments_both_land() {
        let dir = TempDir::new().unwrap();
        let registry = LockRegistry::new();
        let store = Arc::new(counter_store(&dir, &registry));

        let increment = |store: Arc<JsonStore<Counter>>| async move {
            store
                .update(|counter| {
                    counter.value += 1;
                    Ok::<_, StoreError>(())
                })
                .await
        };
        let (a, b) = tokio::join!(increment(store.clone()), increment(store.clone()));
        a.unwrap();
        b.unwrap();

        assert_eq!(store.read().await.unwrap().value, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_updates_lose_nothing() {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(LockRegistry::new());
        let path = dir.path().join("counter.json");

        // Separate store handles on the same path share one lock.
        let mut handles = Vec::new();
        for _ in 0..64 {
            let store: JsonStore<Counter> = JsonStore::new(&registry, path.clone());
            handles.push(tokio::spawn(async move {
                store
                    .update(|counter| {
                        counter.value += 1;
                        Ok::<_, StoreError>(())
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let store: JsonStore<Counter> = JsonStore::new(&registry, path);
        assert_eq!(store.read().await.unwrap().value, 64);
    }
}
