//! Database layer: a keyed document store over named collections.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::Result;
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    /// Profile records (keyed by identity ID)
    pub const USERS: &str = "users";
}

/// Document body: top-level field name to value.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Result of a create-if-absent write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// Another writer got there first; nothing was written.
    AlreadyExists,
}

/// Keyed get/create/update over a collection of documents.
///
/// Implementations must make `create` atomic per key: of two racing
/// creators exactly one observes `Created`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a document. `Ok(None)` when it does not exist.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Fields>>;

    /// Write a document only if no document exists under `id`.
    async fn create(&self, collection: &str, id: &str, fields: Fields) -> Result<CreateOutcome>;

    /// Merge `patch` into an existing document. Fields not named in the
    /// patch are left untouched. Fails with `NotFound` if the document
    /// does not exist.
    async fn update(&self, collection: &str, id: &str, patch: Fields) -> Result<()>;
}
