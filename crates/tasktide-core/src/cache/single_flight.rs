//! Registry of in-flight cached operations.
//!
//! The first caller for a key becomes the leader and holds a [`FlightLease`];
//! later callers get a receiver and wait for the leader's outcome. Dropping
//! the lease (completion, error or cancellation) releases the key.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde_json::Value;
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub(crate) enum FlightOutcome {
    Ready(Value),
    Failed,
}

pub(crate) type FlightReceiver = watch::Receiver<Option<FlightOutcome>>;

pub(crate) enum Role<'a> {
    Leader(FlightLease<'a>),
    Follower(FlightReceiver),
}

#[derive(Debug, Default)]
pub(crate) struct FlightRegistry {
    flights: Mutex<HashMap<String, (u64, FlightReceiver)>>,
    next_id: AtomicU64,
}

impl FlightRegistry {
    /// Join the flight for `key`, starting one if none is running.
    pub(crate) fn join(&self, key: &str) -> Role<'_> {
        let mut flights = self.lock();
        if let Some((_, rx)) = flights.get(key) {
            return Role::Follower(rx.clone());
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = watch::channel(None);
        flights.insert(key.to_string(), (id, rx));
        Role::Leader(FlightLease {
            registry: self,
            key: key.to_string(),
            id,
            tx,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn release(&self, key: &str, id: u64) {
        let mut flights = self.lock();
        if flights.get(key).is_some_and(|(current, _)| *current == id) {
            flights.remove(key);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, (u64, FlightReceiver)>> {
        self.flights.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub(crate) struct FlightLease<'a> {
    registry: &'a FlightRegistry,
    key: String,
    id: u64,
    tx: watch::Sender<Option<FlightOutcome>>,
}

impl FlightLease<'_> {
    /// Publish the outcome to every waiting follower and release the key.
    pub(crate) fn finish(self, outcome: FlightOutcome) {
        // No receivers left is fine: nobody was waiting.
        let _ = self.tx.send(Some(outcome));
    }
}

impl Drop for FlightLease<'_> {
    fn drop(&mut self) {
        self.registry.release(&self.key, self.id);
    }
}

/// Wait for a leader to publish. `None` means the leader went away without
/// publishing (cancelled).
pub(crate) async fn wait_for_outcome(mut rx: FlightReceiver) -> Option<FlightOutcome> {
    let outcome = match rx.wait_for(|outcome| outcome.is_some()).await {
        Ok(outcome) => outcome.clone(),
        Err(_) => None,
    };
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_join_is_follower() {
        let registry = FlightRegistry::default();
        let first = registry.join("k");
        assert!(matches!(first, Role::Leader(_)));
        assert!(matches!(registry.join("k"), Role::Follower(_)));
        assert!(matches!(registry.join("other"), Role::Leader(_)));
    }

    #[test]
    fn test_dropping_lease_releases_key() {
        let registry = FlightRegistry::default();
        {
            let _lease = registry.join("k");
            assert_eq!(registry.len(), 1);
        }
        assert_eq!(registry.len(), 0);
        assert!(matches!(registry.join("k"), Role::Leader(_)));
    }

    #[tokio::test]
    async fn test_follower_sees_published_outcome() {
        let registry = FlightRegistry::default();
        let Role::Leader(lease) = registry.join("k") else {
            panic!("expected leader");
        };
        let Role::Follower(rx) = registry.join("k") else {
            panic!("expected follower");
        };

        lease.finish(FlightOutcome::Ready(serde_json::json!(42)));
        match wait_for_outcome(rx).await {
            Some(FlightOutcome::Ready(v)) => assert_eq!(v, 42),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(registry.len(), 0);
    }

    #[tokio::test]
    async fn test_follower_sees_cancelled_leader() {
        let registry = FlightRegistry::default();
        let lease = registry.join("k");
        let Role::Follower(rx) = registry.join("k") else {
            panic!("expected follower");
        };
        drop(lease);
        assert!(wait_for_outcome(rx).await.is_none());
    }
}
