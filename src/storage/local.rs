use super::{ObjectStore, StorageError, validate_name};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use uuid::Uuid;

/// One file per object inside a dedicated directory.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalStore { root: root.into() }
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, StorageError> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }
}

impl ObjectStore for LocalStore {
    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StorageError::Backend(format!("creating {}: {e}", self.root.display())))?;

        // Write then rename so readers never observe a half-written object.
        let staging = self.root.join(format!(".{name}.{}.tmp", Uuid::new_v4()));
        if let Err(e) = fs::write(&staging, &bytes).await {
            let _ = fs::remove_file(&staging).await;
            return Err(StorageError::Backend(format!("writing {name}: {e}")));
        }
        if let Err(e) = fs::rename(&staging, &path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(StorageError::Backend(format!("replacing {name}: {e}")));
        }

        debug!(name, bytes = bytes.len(), "stored object on local disk");
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(name)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(name.to_owned())),
            Err(e) => Err(StorageError::Backend(format!("reading {name}: {e}"))),
        }
    }
}
