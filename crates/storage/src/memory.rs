//! In-memory snapshot store.
//!
//! Backs tests and ephemeral sessions where nothing should touch disk.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::{Result, SnapshotStore, StorageError};

/// Volatile snapshot store; contents are lost when dropped.
#[derive(Default)]
pub struct MemorySnapshotStore {
    namespaces: Mutex<HashMap<String, Value>>,
}

impl MemorySnapshotStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored namespaces.
    pub fn len(&self) -> usize {
        self.namespaces.lock().map(|ns| ns.len()).unwrap_or(0)
    }

    /// True when nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Value>>> {
        self.namespaces
            .lock()
            .map_err(|_| StorageError::Other("snapshot store lock poisoned".to_string()))
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn save(&self, namespace: &str, state: &Value) -> Result<()> {
        self.lock()?.insert(namespace.to_string(), state.clone());
        Ok(())
    }

    async fn load(&self, namespace: &str) -> Result<Option<Value>> {
        Ok(self.lock()?.get(namespace).cloned())
    }

    async fn delete(&self, namespace: &str) -> Result<()> {
        self.lock()?.remove(namespace);
        Ok(())
    }
}
