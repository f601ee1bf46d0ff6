//! Document store boundary.
//!
//! The session store reads and lazily creates profile documents through
//! [`DocumentStore`]. [`MemoryDocumentStore`] backs tests and local runs.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

/// A stored document: a JSON object.
pub type Document = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Merge top-level fields into an existing document instead of replacing it.
    pub merge: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document store unavailable: {0}")]
    Unavailable(String),
    #[error("document serialization failed: {0}")]
    Serialize(String),
}

#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the backend cannot be reached.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the backend cannot be reached.
    async fn set(&self, collection: &str, id: &str, data: Document, options: SetOptions) -> Result<(), StoreError>;
}

// =============================================================================
// IN-MEMORY STORE
// =============================================================================

#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    docs: Arc<RwLock<HashMap<(String, String), Document>>>,
}

impl MemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in `collection`.
    pub async fn count(&self, collection: &str) -> usize {
        self.docs
            .read()
            .await
            .keys()
            .filter(|(c, _)| c == collection)
            .count()
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let docs = self.docs.read().await;
        Ok(docs.get(&(collection.to_owned(), id.to_owned())).cloned())
    }

    async fn set(&self, collection: &str, id: &str, data: Document, options: SetOptions) -> Result<(), StoreError> {
        let mut docs = self.docs.write().await;
        let entry = docs
            .entry((collection.to_owned(), id.to_owned()))
            .or_default();
        if options.merge {
            entry.extend(data);
        } else {
            *entry = data;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
