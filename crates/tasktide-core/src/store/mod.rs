//! Document store port.
//!
//! The external document database is reached only through the
//! [`DocumentStore`] trait: CRUD keyed by collection name, equality/order
//! queries, and a change feed that backs [`Subscription`]. The wire format
//! of any real backend stays behind the trait.

pub mod error;
pub mod memory;
pub mod query;
pub mod subscription;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

pub use error::StoreError;
pub use memory::InMemoryStore;
pub use query::{Direction, Document, Filter, OrderBy, Query};
pub use subscription::Subscription;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub collection: String,
    pub id: String,
    pub kind: ChangeKind,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document and return its generated id.
    async fn create(&self, collection: &str, data: Value) -> Result<String, StoreError>;

    /// Insert or replace the document with a caller-chosen id.
    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Merge top-level fields of `patch` into an existing document.
    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<(), StoreError>;

    /// Delete a document. Deleting a missing document succeeds.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Feed of every mutation made through this store.
    fn changes(&self) -> broadcast::Receiver<ChangeEvent>;
}

impl dyn DocumentStore {
    /// Live query over `collection`. See [`Subscription`].
    pub fn subscribe(self: &Arc<Self>, collection: &str, query: Query) -> Subscription {
        Subscription::new(Arc::clone(self), collection, query)
    }
}
