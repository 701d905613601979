use crate::db::models::TokenIndex;
use crate::error::PollError;
use crate::storage::{ObjectStore, StorageError};
use std::sync::Arc;

pub const TOKEN_INDEX_NAME: &str = "tokens_index.json";

/// The global vote token index. Stored as plain JSON: the tokens are bearer
/// credentials either way.
pub struct TokenRepository<S> {
    storage: Arc<S>,
}

impl<S: ObjectStore> TokenRepository<S> {
    pub fn new(storage: Arc<S>) -> Self {
        TokenRepository { storage }
    }

    /// An index that was never written is simply empty.
    pub async fn load(&self) -> Result<TokenIndex, PollError> {
        let bytes = match self.storage.get(TOKEN_INDEX_NAME).await {
            Ok(bytes) => bytes,
            Err(StorageError::NotFound(_)) => return Ok(TokenIndex::new()),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&bytes)
            .map_err(|e| PollError::BackendError(format!("corrupt token index: {e}")))
    }

    pub async fn save(&self, index: &TokenIndex) -> Result<(), PollError> {
        let bytes = serde_json::to_vec_pretty(index)
            .map_err(|e| PollError::BackendError(format!("serializing token index: {e}")))?;

        self.storage.put(TOKEN_INDEX_NAME, bytes).await?;
        Ok(())
    }
}
