use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use tasktide_core::cache::{CacheManager, FileStore, MemoryStore, PersistentStore};
use tasktide_core::clock::ManualClock;

fn manager_at(clock: &Arc<ManualClock>, store: Arc<dyn PersistentStore>) -> CacheManager {
    CacheManager::with_clock(store, clock.clone())
}

#[test]
fn test_task_list_expires_after_five_minutes() {
    let clock = Arc::new(ManualClock::default());
    let cache = manager_at(&clock, Arc::new(MemoryStore::new()));
    let tasks = vec!["write essay".to_string(), "read chapter 4".to_string()];

    cache.set("tasks_u1", &tasks, Some(Duration::minutes(5)));
    clock.advance(Duration::minutes(4) + Duration::seconds(59));
    assert_eq!(cache.get::<Vec<String>>("tasks_u1"), Some(tasks));

    clock.advance(Duration::seconds(1));
    assert_eq!(cache.get::<Vec<String>>("tasks_u1"), None);
    assert_eq!(cache.stats().memory_entries, 0);
    assert_eq!(cache.stats().persistent_entries, 0);
}

#[test]
fn test_entries_survive_restart_through_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::default());

    {
        let store = Arc::new(FileStore::new(dir.path().to_path_buf()).unwrap());
        let cache = manager_at(&clock, store);
        cache.set("grades_u1", &vec![91, 78], Some(Duration::minutes(10)));
    }

    let store = Arc::new(FileStore::new(dir.path().to_path_buf()).unwrap());
    let cache = manager_at(&clock, store);
    assert_eq!(cache.stats().memory_entries, 0);
    assert_eq!(cache.get::<Vec<u32>>("grades_u1"), Some(vec![91, 78]));
    // Rehydrated into memory on first read
    assert_eq!(cache.stats().memory_entries, 1);
}

#[test]
fn test_corrupted_entry_is_swept() {
    let clock = Arc::new(ManualClock::default());
    let store = Arc::new(MemoryStore::new());
    store.insert_raw("tasktide_cache_tasks_u1", "{not json");
    let cache = manager_at(&clock, store);

    let report = cache.clear_expired();
    assert_eq!(report.corrupted_removed, 1);
    assert_eq!(cache.stats().persistent_entries, 0);
}

#[test]
fn test_quota_exceeded_falls_back_to_memory() {
    let clock = Arc::new(ManualClock::default());
    let cache = manager_at(&clock, Arc::new(MemoryStore::with_quota(16)));

    let big = "x".repeat(1024);
    cache.set("materials_u1", &big, None);
    assert_eq!(cache.get::<String>("materials_u1"), Some(big));
    assert_eq!(cache.stats().persistent_entries, 0);
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_loads_share_one_call() {
    let cache = Arc::new(CacheManager::in_memory());
    let calls = Arc::new(AtomicUsize::new(0));

    let load = |cache: Arc<CacheManager>, calls: Arc<AtomicUsize>| async move {
        cache
            .cached_operation("analytics_u1", None, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(StdDuration::from_millis(250)).await;
                Ok::<_, String>(vec![1, 2, 3])
            })
            .await
    };

    let first = tokio::spawn(load(cache.clone(), calls.clone()));
    tokio::task::yield_now().await;
    let second = tokio::spawn(load(cache.clone(), calls.clone()));

    let (a, b) = (first.await.unwrap(), second.await.unwrap());
    assert_eq!(a, Ok(vec![1, 2, 3]));
    assert_eq!(b, Ok(vec![1, 2, 3]));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.stats().in_flight, 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_load_is_not_cached() {
    let cache = CacheManager::in_memory();

    let err: Result<u32, String> = cache
        .cached_operation("profile_u1", None, || async { Err("offline".to_string()) })
        .await;
    assert_eq!(err, Err("offline".to_string()));

    let ok: Result<u32, String> = cache
        .cached_operation("profile_u1", None, || async { Ok(5) })
        .await;
    assert_eq!(ok, Ok(5));
}
