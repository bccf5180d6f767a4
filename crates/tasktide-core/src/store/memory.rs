//! In-process document store.
//!
//! Optionally snapshotted to a JSON file after every mutation, so a local
//! profile survives restarts without an external backend.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use super::{ChangeEvent, ChangeKind, Document, DocumentStore, Query, StoreError};

/// Length of generated document ids.
const ID_LENGTH: usize = 20;

/// Buffered change notifications per subscriber before it starts lagging.
const CHANGE_BUFFER_SIZE: usize = 64;

type Collections = HashMap<String, BTreeMap<String, Value>>;

pub struct InMemoryStore {
    collections: RwLock<Collections>,
    changes: broadcast::Sender<ChangeEvent>,
    snapshot_path: Option<PathBuf>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER_SIZE);
        Self {
            collections: RwLock::new(HashMap::new()),
            changes,
            snapshot_path: None,
        }
    }

    /// Open a store backed by a JSON snapshot file, loading it if present.
    pub fn open(path: PathBuf) -> Result<Self, StoreError> {
        let collections: Collections = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), collections = collections.len(), "Document store loaded");

        let (changes, _) = broadcast::channel(CHANGE_BUFFER_SIZE);
        Ok(Self {
            collections: RwLock::new(collections),
            changes,
            snapshot_path: Some(path),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, Collections> {
        self.collections.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Collections> {
        self.collections.write().unwrap_or_else(|e| e.into_inner())
    }

    fn generate_id() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(ID_LENGTH)
            .map(char::from)
            .collect()
    }

    fn persist(&self, collections: &Collections) -> Result<(), StoreError> {
        if let Some(ref path) = self.snapshot_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = serde_json::to_string_pretty(collections)?;
            std::fs::write(path, contents)?;
        }
        Ok(())
    }

    /// Apply `change` so that it only becomes visible once the snapshot has
    /// been written. A failed write leaves the store untouched.
    fn commit<R>(
        &self,
        change: impl FnOnce(&mut Collections) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let mut collections = self.write();
        if self.snapshot_path.is_none() {
            return change(&mut collections);
        }
        let mut next = collections.clone();
        let result = change(&mut next)?;
        self.persist(&next)?;
        *collections = next;
        Ok(result)
    }

    fn notify(&self, collection: &str, id: &str, kind: ChangeKind) {
        // Nobody listening is fine
        let _ = self.changes.send(ChangeEvent {
            collection: collection.to_string(),
            id: id.to_string(),
            kind,
        });
    }
}

fn ensure_object(data: &Value) -> Result<(), StoreError> {
    if data.is_object() {
        Ok(())
    } else {
        Err(StoreError::InvalidDocument(
            "document body must be a JSON object".to_string(),
        ))
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn create(&self, collection: &str, data: Value) -> Result<String, StoreError> {
        ensure_object(&data)?;
        let id = Self::generate_id();
        self.commit(|collections| {
            collections
                .entry(collection.to_string())
                .or_default()
                .insert(id.clone(), data);
            Ok(())
        })?;
        self.notify(collection, &id, ChangeKind::Added);
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError> {
        ensure_object(&data)?;
        let existed = self.commit(|collections| {
            Ok(collections
                .entry(collection.to_string())
                .or_default()
                .insert(id.to_string(), data)
                .is_some())
        })?;
        let kind = if existed {
            ChangeKind::Modified
        } else {
            ChangeKind::Added
        };
        self.notify(collection, id, kind);
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self
            .read()
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|data| Document {
                id: id.to_string(),
                data: data.clone(),
            }))
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<(), StoreError> {
        let Value::Object(fields) = patch else {
            return Err(StoreError::InvalidDocument(
                "update patch must be a JSON object".to_string(),
            ));
        };
        self.commit(|collections| {
            let doc = collections
                .get_mut(collection)
                .and_then(|docs| docs.get_mut(id))
                .ok_or_else(|| StoreError::not_found(collection, id))?;
            if let Value::Object(existing) = doc {
                for (field, value) in fields {
                    existing.insert(field, value);
                }
            }
            Ok(())
        })?;
        self.notify(collection, id, ChangeKind::Modified);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let exists = self
            .read()
            .get(collection)
            .is_some_and(|docs| docs.contains_key(id));
        let removed = exists
            && self.commit(|collections| {
                Ok(collections
                    .get_mut(collection)
                    .and_then(|docs| docs.remove(id))
                    .is_some())
            })?;
        if removed {
            self.notify(collection, id, ChangeKind::Removed);
        }
        Ok(())
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        let docs: Vec<Document> = self
            .read()
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| Document {
                        id: id.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(query.apply(docs))
    }

    fn changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Direction;
    use serde_json::json;

    #[tokio::test]
    async fn test_crud_round() {
        let store = InMemoryStore::new();
        let id = store
            .create("tasks", json!({ "title": "Read ch. 4", "userId": "u1" }))
            .await
            .unwrap();
        assert_eq!(id.len(), ID_LENGTH);

        store
            .update("tasks", &id, json!({ "completed": true }))
            .await
            .unwrap();
        let doc = store.get("tasks", &id).await.unwrap().unwrap();
        assert_eq!(doc.data["title"], "Read ch. 4");
        assert_eq!(doc.data["completed"], true);

        store.delete("tasks", &id).await.unwrap();
        assert!(store.get("tasks", &id).await.unwrap().is_none());
        // Deleting again is a no-op
        store.delete("tasks", &id).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = InMemoryStore::new();
        let err = store
            .update("tasks", "nope", json!({ "a": 1 }))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_non_object_rejected() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.create("tasks", json!([1, 2])).await,
            Err(StoreError::InvalidDocument(_))
        ));
    }

    #[tokio::test]
    async fn test_query_filters_by_user() {
        let store = InMemoryStore::new();
        store.create("tasks", json!({ "userId": "u1", "n": 1 })).await.unwrap();
        store.create("tasks", json!({ "userId": "u2", "n": 2 })).await.unwrap();
        store.create("tasks", json!({ "userId": "u1", "n": 3 })).await.unwrap();

        let docs = store
            .query(
                "tasks",
                &Query::new()
                    .where_eq("userId", "u1")
                    .order_by("n", Direction::Descending),
            )
            .await
            .unwrap();
        let ns: Vec<i64> = docs.iter().map(|d| d.data["n"].as_i64().unwrap()).collect();
        assert_eq!(ns, vec![3, 1]);
    }

    #[tokio::test]
    async fn test_snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let id = {
            let store = InMemoryStore::open(path.clone()).unwrap();
            store.create("grades", json!({ "score": 92 })).await.unwrap()
        };

        let reopened = InMemoryStore::open(path).unwrap();
        let doc = reopened.get("grades", &id).await.unwrap().unwrap();
        assert_eq!(doc.data["score"], 92);
    }

    #[tokio::test]
    async fn test_mutations_broadcast_changes() {
        let store = InMemoryStore::new();
        let mut rx = store.changes();
        let id = store.create("tasks", json!({})).await.unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.collection, "tasks");
        assert_eq!(event.id, id);
        assert_eq!(event.kind, ChangeKind::Added);
    }

    #[tokio::test]
    async fn test_failed_snapshot_write_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = InMemoryStore::open(path.clone()).unwrap();
        let id = store.create("tasks", json!({ "title": "a" })).await.unwrap();

        // A directory where the snapshot file should be makes every write fail
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();
        let mut rx = store.changes();

        assert!(store.create("tasks", json!({ "title": "b" })).await.is_err());
        assert!(store.update("tasks", &id, json!({ "title": "c" })).await.is_err());
        assert!(store.delete("tasks", &id).await.is_err());

        let docs = store.query("tasks", &Query::new()).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].data["title"], "a");
        assert!(rx.try_recv().is_err());
    }
}
