//! Cached, user-scoped access to the document store.
//!
//! Reads go through [`CacheManager::cached_operation`] keyed by
//! `<category>_<uid>`, so concurrent screens asking for the same list share
//! one query. Every mutation drops that key.

use std::marker::PhantomData;
use std::sync::Arc;

use futures::Stream;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{cache_key, CacheCategory, CacheManager};
use crate::models::{CalendarEvent, Grade, PomodoroSessionRecord, StudyMaterial, Task};
use crate::settings::UserSettings;
use crate::store::{Direction, Document, DocumentStore, Query, StoreError, Subscription};

/// Collection holding one settings document per user, keyed by uid.
const SETTINGS_COLLECTION: &str = "settings";

/// A user-owned record type stored in its own collection.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: &'static str;
    const CATEGORY: CacheCategory;
    /// Field lists are ordered by, newest first.
    const ORDER_FIELD: &'static str = "createdAt";

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    fn user_id(&self) -> &str;
}

macro_rules! impl_record {
    ($ty:ty, $collection:expr, $category:expr, $order:expr) => {
        impl Record for $ty {
            const COLLECTION: &'static str = $collection;
            const CATEGORY: CacheCategory = $category;
            const ORDER_FIELD: &'static str = $order;

            fn id(&self) -> &str {
                &self.id
            }

            fn set_id(&mut self, id: String) {
                self.id = id;
            }

            fn user_id(&self) -> &str {
                &self.user_id
            }
        }
    };
}

impl_record!(Task, "tasks", CacheCategory::Tasks, "createdAt");
impl_record!(Grade, "grades", CacheCategory::Grades, "createdAt");
impl_record!(StudyMaterial, "studyMaterials", CacheCategory::StudyMaterials, "createdAt");
impl_record!(CalendarEvent, "events", CacheCategory::CalendarEvents, "start");
impl_record!(
    PomodoroSessionRecord,
    "pomodoroSessions",
    CacheCategory::PomodoroSessions,
    "startedAt"
);

fn decode<T: Record>(doc: Document) -> Option<T> {
    match serde_json::from_value::<T>(doc.data) {
        Ok(mut record) => {
            record.set_id(doc.id);
            Some(record)
        }
        Err(e) => {
            warn!(collection = T::COLLECTION, id = %doc.id, error = %e, "Skipping malformed document");
            None
        }
    }
}

/// Serialize a record for storage. The id lives in the document key, not the body.
fn encode<T: Record>(record: &T) -> Result<Value, StoreError> {
    let mut value = serde_json::to_value(record)?;
    if let Value::Object(ref mut fields) = value {
        fields.remove("id");
    }
    Ok(value)
}

#[derive(Clone)]
pub struct DataService {
    store: Arc<dyn DocumentStore>,
    cache: Arc<CacheManager>,
}

impl DataService {
    pub fn new(store: Arc<dyn DocumentStore>, cache: Arc<CacheManager>) -> Self {
        Self { store, cache }
    }

    pub fn cache(&self) -> &Arc<CacheManager> {
        &self.cache
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    fn user_query<T: Record>(uid: &str) -> Query {
        Query::new()
            .where_eq("userId", uid)
            .order_by(T::ORDER_FIELD, Direction::Descending)
    }

    /// All of a user's records, newest first, served from cache when fresh.
    pub async fn list<T: Record>(&self, uid: &str) -> Result<Vec<T>, StoreError> {
        let key = cache_key(T::CATEGORY, uid);
        self.cache
            .cached_operation(&key, Some(T::CATEGORY.default_ttl()), || self.fetch::<T>(uid))
            .await
    }

    /// Query the store directly, bypassing the cache.
    pub async fn fetch<T: Record>(&self, uid: &str) -> Result<Vec<T>, StoreError> {
        let docs = self
            .store
            .query(T::COLLECTION, &Self::user_query::<T>(uid))
            .await?;
        debug!(collection = T::COLLECTION, count = docs.len(), "Records fetched");
        Ok(docs.into_iter().filter_map(decode).collect())
    }

    pub async fn get<T: Record>(&self, id: &str) -> Result<Option<T>, StoreError> {
        Ok(self.store.get(T::COLLECTION, id).await?.and_then(decode))
    }

    /// Insert a new record and return its id.
    pub async fn create<T: Record>(&self, record: &T) -> Result<String, StoreError> {
        let id = self.store.create(T::COLLECTION, encode(record)?).await?;
        self.invalidate::<T>(record.user_id());
        debug!(collection = T::COLLECTION, id = %id, "Record created");
        Ok(id)
    }

    /// Replace a stored record wholesale. The record must carry its id.
    pub async fn save<T: Record>(&self, record: &T) -> Result<(), StoreError> {
        if record.id().is_empty() {
            return Err(StoreError::InvalidDocument(
                "cannot save a record without an id".to_string(),
            ));
        }
        self.store
            .set(T::COLLECTION, record.id(), encode(record)?)
            .await?;
        self.invalidate::<T>(record.user_id());
        Ok(())
    }

    /// Merge `patch` into the record `id` owned by `uid`.
    pub async fn update<T: Record>(&self, uid: &str, id: &str, patch: Value) -> Result<(), StoreError> {
        self.store.update(T::COLLECTION, id, patch).await?;
        self.invalidate::<T>(uid);
        Ok(())
    }

    pub async fn delete<T: Record>(&self, uid: &str, id: &str) -> Result<(), StoreError> {
        self.store.delete(T::COLLECTION, id).await?;
        self.invalidate::<T>(uid);
        Ok(())
    }

    /// Drop the cached list for `uid`, and any analytics derived from it.
    pub fn invalidate<T: Record>(&self, uid: &str) {
        self.cache.delete(&cache_key(T::CATEGORY, uid));
        if matches!(
            T::CATEGORY,
            CacheCategory::Tasks | CacheCategory::PomodoroSessions
        ) {
            let prefix = format!("{}_", cache_key(CacheCategory::Analytics, uid));
            self.cache.invalidate_prefix(&prefix);
        }
    }

    /// Live view of a user's records. Each snapshot also refreshes the cache.
    pub fn subscribe<T: Record>(&self, uid: &str) -> RecordSubscription<T> {
        RecordSubscription {
            inner: self
                .store
                .subscribe(T::COLLECTION, Self::user_query::<T>(uid)),
            cache: Arc::clone(&self.cache),
            key: cache_key(T::CATEGORY, uid),
            _record: PhantomData,
        }
    }

    // ===== Settings =====

    /// Load a user's settings, falling back to defaults when none are stored.
    pub async fn load_settings(&self, uid: &str) -> Result<UserSettings, StoreError> {
        let key = cache_key(CacheCategory::Settings, uid);
        self.cache
            .cached_operation(&key, Some(CacheCategory::Settings.default_ttl()), || {
                self.fetch_settings(uid)
            })
            .await
    }

    async fn fetch_settings(&self, uid: &str) -> Result<UserSettings, StoreError> {
        match self.store.get(SETTINGS_COLLECTION, uid).await? {
            Some(doc) => Ok(serde_json::from_value(doc.data)?),
            None => Ok(UserSettings::default()),
        }
    }

    pub async fn save_settings(&self, uid: &str, settings: &UserSettings) -> Result<(), StoreError> {
        self.store
            .set(SETTINGS_COLLECTION, uid, serde_json::to_value(settings)?)
            .await?;
        self.cache.set(
            &cache_key(CacheCategory::Settings, uid),
            settings,
            Some(CacheCategory::Settings.default_ttl()),
        );
        Ok(())
    }
}

pub struct RecordSubscription<T> {
    inner: Subscription,
    cache: Arc<CacheManager>,
    key: String,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> RecordSubscription<T> {
    pub async fn next(&mut self) -> Option<Result<Vec<T>, StoreError>> {
        let docs = match self.inner.next().await? {
            Ok(docs) => docs,
            Err(e) => return Some(Err(e)),
        };
        let records: Vec<T> = docs.into_iter().filter_map(decode).collect();
        self.cache
            .set(&self.key, &records, Some(T::CATEGORY.default_ttl()));
        Some(Ok(records))
    }

    /// Adapt into a `Stream` of snapshots.
    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<T>, StoreError>> + Send {
        futures::stream::unfold(self, |mut sub| async move {
            let item = sub.next().await?;
            Some((item, sub))
        })
    }
}
