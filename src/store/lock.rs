use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex as StdMutex},
};

use tokio::sync::Mutex;

/// Hands out one async lock per store file.
///
/// Built once at startup and shared by every [`super::JsonStore`]. Two stores
/// opened on the same path receive the same lock, so their operations are
/// serialized. `tokio::sync::Mutex` queues waiters in FIFO order and never
/// times out.
#[derive(Default)]
pub struct LockRegistry {
    locks: StdMutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        let key = normalize(path);
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

// Files may not exist yet, so canonicalize() is not an option here.
fn normalize(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
