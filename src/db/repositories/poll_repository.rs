use crate::cipher::{self, Key};
use crate::db::models::PollRecord;
use crate::error::PollError;
use crate::storage::{ObjectStore, StorageError};
use std::sync::Arc;
use uuid::Uuid;

pub fn record_name(poll_id: Uuid) -> String {
    format!("{poll_id}.enc")
}

/// Encrypted poll records, one object per poll.
pub struct PollRepository<S> {
    storage: Arc<S>,
}

impl<S: ObjectStore> PollRepository<S> {
    pub fn new(storage: Arc<S>) -> Self {
        PollRepository { storage }
    }

    /// Last writer wins; callers serialize writes per poll.
    pub async fn save(&self, poll_id: Uuid, record: &PollRecord, key: &Key) -> Result<(), PollError> {
        let plaintext = serde_json::to_vec(record)
            .map_err(|e| PollError::BackendError(format!("serializing poll {poll_id}: {e}")))?;
        let ciphertext = cipher::encrypt(&plaintext, key)?;

        self.storage.put(&record_name(poll_id), ciphertext).await?;
        Ok(())
    }

    pub async fn load(&self, poll_id: Uuid, key: &Key) -> Result<PollRecord, PollError> {
        let ciphertext = match self.storage.get(&record_name(poll_id)).await {
            Ok(bytes) => bytes,
            Err(StorageError::NotFound(_)) => return Err(PollError::PollNotFound),
            Err(e) => return Err(e.into()),
        };

        let plaintext = cipher::decrypt(&ciphertext, key)?;
        serde_json::from_slice(&plaintext)
            .map_err(|e| PollError::BackendError(format!("corrupt poll record {poll_id}: {e}")))
    }
}
