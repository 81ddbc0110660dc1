//! JSON file snapshot store.
//!
//! Stores each namespace as a pretty-printed JSON file in a data
//! directory. Writes go through a temp file and rename so a crash
//! mid-write cannot leave a torn snapshot behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;

use super::{Result, SnapshotStore};

/// File-based JSON snapshot store.
pub struct JsonSnapshotStore {
    root: PathBuf,
}

impl JsonSnapshotStore {
    /// Create a store rooted at `root`, creating the directory if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn namespace_path(&self, namespace: &str) -> PathBuf {
        self.root.join(format!("{}.json", namespace))
    }
}

#[async_trait]
impl SnapshotStore for JsonSnapshotStore {
    async fn save(&self, namespace: &str, state: &Value) -> Result<()> {
        let path = self.namespace_path(namespace);
        let tmp = self.root.join(format!("{}.json.tmp", namespace));

        let json = serde_json::to_string_pretty(state)?;
        fs::write(&tmp, json.as_bytes()).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn load(&self, namespace: &str) -> Result<Option<Value>> {
        match fs::read_to_string(self.namespace_path(namespace)).await {
            Ok(json) => {
                let value = serde_json::from_str(&json)?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, namespace: &str) -> Result<()> {
        fs::remove_file(self.namespace_path(namespace))
            .await
            .or_else(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Ok(())
                } else {
                    Err(e)
                }
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSnapshotStore::new(dir.path()).await.unwrap();

        let state = json!({"state": "paused", "elapsed_seconds": 17});
        store.save("timer", &state).await.unwrap();

        let loaded = store.load("timer").await.unwrap();
        assert_eq!(loaded, Some(state));
    }

    #[tokio::test]
    async fn load_missing_namespace_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSnapshotStore::new(dir.path()).await.unwrap();

        assert!(store.load("items").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_replaces_existing_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSnapshotStore::new(dir.path()).await.unwrap();

        store.save("items", &json!({"completed": []})).await.unwrap();
        store
            .save("items", &json!({"completed": ["apple"]}))
            .await
            .unwrap();

        let loaded = store.load("items").await.unwrap().unwrap();
        assert_eq!(loaded["completed"], json!(["apple"]));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSnapshotStore::new(dir.path()).await.unwrap();

        store.save("timer", &json!({})).await.unwrap();
        store.delete("timer").await.unwrap();
        assert!(store.load("timer").await.unwrap().is_none());

        // absent namespace
        store.delete("timer").await.unwrap();
    }
}
