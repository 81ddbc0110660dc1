//! Snapshot store trait abstraction.

use async_trait::async_trait;
use serde_json::Value;

/// Error type for snapshot store operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during snapshot store operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Durable key-value snapshot store.
///
/// Namespaces are flat, stable strings (`"timer"`, `"items"`, ...). Values
/// are structured JSON; schema is the caller's concern. Implementations
/// must make `save` atomic per namespace but need not coordinate across
/// namespaces - the coordinator serializes its own writes.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Save structured state under a namespace (create or replace).
    async fn save(&self, namespace: &str, state: &Value) -> Result<()>;

    /// Load the state stored under a namespace, if any.
    async fn load(&self, namespace: &str) -> Result<Option<Value>>;

    /// Delete a namespace. Deleting an absent namespace is not an error.
    async fn delete(&self, namespace: &str) -> Result<()>;
}
