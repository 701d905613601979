use super::{ObjectStore, StorageError, validate_name};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// A simple store that keeps objects in an in-memory BTreeMap.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>>, StorageError> {
        self.inner
            .lock()
            .map_err(|_| StorageError::Backend("memory store lock poisoned".to_owned()))
    }
}

impl ObjectStore for MemoryStore {
    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        validate_name(name)?;
        self.lock()?.insert(name.to_owned(), bytes);
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        validate_name(name)?;
        self.lock()?
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(name.to_owned()))
    }
}
