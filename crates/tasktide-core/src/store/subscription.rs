use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;

use super::{ChangeEvent, Document, DocumentStore, Query, StoreError};

/// Push-style view over a query: yields the current result set first, then a
/// fresh result set after every change to the collection.
pub struct Subscription {
    store: Arc<dyn DocumentStore>,
    collection: String,
    query: Query,
    changes: broadcast::Receiver<ChangeEvent>,
    delivered_initial: bool,
}

impl Subscription {
    pub fn new(store: Arc<dyn DocumentStore>, collection: &str, query: Query) -> Self {
        let changes = store.changes();
        Self {
            store,
            collection: collection.to_string(),
            query,
            changes,
            delivered_initial: false,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Next snapshot, or `None` once the store has shut down.
    pub async fn next(&mut self) -> Option<Result<Vec<Document>, StoreError>> {
        if !self.delivered_initial {
            self.delivered_initial = true;
            return Some(self.fetch().await);
        }

        loop {
            match self.changes.recv().await {
                Ok(event) if event.collection == self.collection => {
                    return Some(self.fetch().await);
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(collection = %self.collection, skipped, "Subscription lagged, refetching");
                    return Some(self.fetch().await);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    async fn fetch(&self) -> Result<Vec<Document>, StoreError> {
        self.store.query(&self.collection, &self.query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_subscription_yields_initial_then_updates() {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryStore::new());
        store.create("tasks", json!({ "userId": "u1" })).await.unwrap();

        let mut sub = Subscription::new(
            store.clone(),
            "tasks",
            Query::new().where_eq("userId", "u1"),
        );
        assert_eq!(sub.next().await.unwrap().unwrap().len(), 1);

        // A change in another collection is ignored
        store.create("grades", json!({ "userId": "u1" })).await.unwrap();
        store.create("tasks", json!({ "userId": "u1" })).await.unwrap();
        assert_eq!(sub.next().await.unwrap().unwrap().len(), 2);
    }
}
