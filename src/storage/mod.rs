use std::future::Future;
use thiserror::Error;

mod bucket;
mod local;
mod memory;

pub use bucket::BucketStore;
pub use local::LocalStore;
pub use memory::MemoryStore;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<reqwest::Error> for StorageError {
    fn from(error: reqwest::Error) -> Self {
        StorageError::Backend(error.to_string())
    }
}

/// Named blobs. `put` replaces whatever was stored under the name before.
pub trait ObjectStore: Send + Sync + 'static {
    fn put(&self, name: &str, bytes: Vec<u8>)
    -> impl Future<Output = Result<(), StorageError>> + Send;

    fn get(&self, name: &str) -> impl Future<Output = Result<Vec<u8>, StorageError>> + Send;
}

/// The storage variant picked at startup.
pub enum Backend {
    Local(LocalStore),
    Bucket(BucketStore),
    Memory(MemoryStore),
}

impl Backend {
    pub fn kind(&self) -> &'static str {
        match self {
            Backend::Local(_) => "local",
            Backend::Bucket(_) => "supabase",
            Backend::Memory(_) => "memory",
        }
    }
}

impl ObjectStore for Backend {
    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        match self {
            Backend::Local(store) => store.put(name, bytes).await,
            Backend::Bucket(store) => store.put(name, bytes).await,
            Backend::Memory(store) => store.put(name, bytes).await,
        }
    }

    async fn get(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        match self {
            Backend::Local(store) => store.get(name).await,
            Backend::Bucket(store) => store.get(name).await,
            Backend::Memory(store) => store.get(name).await,
        }
    }
}

/// Object names map 1:1 onto file names and URL path segments, so only a
/// conservative character set is accepted.
pub(crate) fn validate_name(name: &str) -> Result<(), StorageError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

    if valid {
        Ok(())
    } else {
        Err(StorageError::Backend(format!("invalid object name {name:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("0b6a1f5e-8f2c-4c1e-9d6b-0a5f3e2d1c4b.enc").is_ok());
        assert!(validate_name("tokens_index.json").is_ok());

        assert!(validate_name("").is_err());
        assert!(validate_name(".hidden").is_err());
        assert!(validate_name("../etc/passwd").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("a b").is_err());
    }

    #[tokio::test]
    async fn test_backend_dispatch() {
        let backend = Backend::Memory(MemoryStore::default());
        assert_eq!(backend.kind(), "memory");

        backend.put("x.enc", vec![1, 2, 3]).await.unwrap();
        assert_eq!(backend.get("x.enc").await.unwrap(), vec![1, 2, 3]);
        assert!(matches!(
            backend.get("y.enc").await,
            Err(StorageError::NotFound(_))
        ));
    }
}
