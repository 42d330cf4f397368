/// Tests for ResourceRegistry and ResourceHandle
///
/// These tests validate creation, acquisition, release, destructor
/// invocation and cross-thread refcounting.

use super::*;
use std::sync::atomic::AtomicUsize;
use std::sync::{Arc, Barrier};

// ============================================================================
// Helper Functions
// ============================================================================

/// Destructor that counts its invocations
fn counting_destructor(counter: &Arc<AtomicUsize>) -> Option<Destructor> {
    let counter = counter.clone();
    Some(Box::new(move |_id, _payload| {
        counter.fetch_add(1, Ordering::SeqCst);
    }))
}

// ============================================================================
// Tests: Create
// ============================================================================

#[test]
fn test_create_starts_with_count_one() {
    let registry = ResourceRegistry::new();
    let handle = registry.create("blob:a", vec![1u8, 2, 3], 3, None).unwrap();

    assert_eq!(handle.identifier(), "blob:a");
    assert_eq!(handle.size(), 3);
    assert_eq!(handle.ref_count(), 1);
    assert_eq!(handle.downcast::<Vec<u8>>(), Some(&vec![1u8, 2, 3]));
    assert!(handle.downcast::<String>().is_none());
    assert_eq!(registry.live_count(), 1);
}

#[test]
fn test_create_empty_identifier_fails() {
    let registry = ResourceRegistry::new();
    let result = registry.create("", 0u32, 4, None);
    assert!(matches!(result, Err(Galaxy3dError::InvalidArgument(_))));
    assert_eq!(registry.live_count(), 0);
}

#[test]
fn test_create_duplicate_identifier_fails() {
    let registry = ResourceRegistry::new();
    let _first = registry.create("blob:a", 1u32, 4, None).unwrap();

    let second = registry.create("blob:a", 2u32, 4, None);
    assert_eq!(second.unwrap_err(), Galaxy3dError::AlreadyExists("blob:a".to_string()));
    assert_eq!(registry.live_count(), 1);
}

#[test]
fn test_create_after_destroy_succeeds() {
    let registry = ResourceRegistry::new();
    let first = registry.create("blob:a", 1u32, 4, None).unwrap();
    assert!(first.release());

    let second = registry.create("blob:a", 2u32, 4, None).unwrap();
    assert_eq!(second.downcast::<u32>(), Some(&2));
}

// ============================================================================
// Tests: Acquire / Release
// ============================================================================

#[test]
fn test_acquire_increments_count() {
    let registry = ResourceRegistry::new();
    let handle = registry.create("blob:a", 7u64, 8, None).unwrap();

    let acquired = registry.acquire("blob:a").unwrap().unwrap();
    assert!(acquired.ptr_eq(&handle));
    assert_eq!(handle.ref_count(), 2);
    assert_eq!(registry.ref_count("blob:a"), Some(2));
}

#[test]
fn test_acquire_missing_returns_none() {
    let registry = ResourceRegistry::new();
    assert!(registry.acquire("blob:missing").unwrap().is_none());
}

#[test]
fn test_release_runs_destructor_once_after_last_release() {
    let registry = ResourceRegistry::new();
    let destroyed = Arc::new(AtomicUsize::new(0));
    let handle = registry.create("blob:a", 1u8, 1, counting_destructor(&destroyed)).unwrap();

    // k = 4 acquisitions in total (create + 3 acquires)
    let extra: Vec<_> = (0..3)
        .map(|_| registry.acquire("blob:a").unwrap().unwrap())
        .collect();

    for h in extra {
        assert!(!registry.release(h));
        assert_eq!(destroyed.load(Ordering::SeqCst), 0);
    }

    assert!(registry.release(handle));
    assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    assert!(!registry.contains("blob:a"));
    assert!(registry.acquire("blob:a").unwrap().is_none());
}

#[test]
fn test_clone_and_drop_follow_refcount() {
    let registry = ResourceRegistry::new();
    let destroyed = Arc::new(AtomicUsize::new(0));
    let handle = registry.create("blob:a", 1u8, 1, counting_destructor(&destroyed)).unwrap();

    let clone = handle.clone();
    assert_eq!(handle.ref_count(), 2);
    drop(handle);
    assert_eq!(destroyed.load(Ordering::SeqCst), 0);
    drop(clone);
    assert_eq!(destroyed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_destructor_receives_identifier_and_payload() {
    let registry = ResourceRegistry::new();
    let seen = Arc::new(std::sync::Mutex::new(None));
    let seen_in_destructor = seen.clone();

    let handle = registry.create("blob:payload", 99u32, 4, Some(Box::new(move |id, payload| {
        let value = payload.downcast_ref::<u32>().copied();
        *seen_in_destructor.lock().unwrap() = Some((id.to_string(), value));
    }))).unwrap();

    handle.release();
    assert_eq!(*seen.lock().unwrap(), Some(("blob:payload".to_string(), Some(99))));
}

// ============================================================================
// Tests: Stats
// ============================================================================

#[test]
fn test_stats_track_bytes_and_lifecycle() {
    let registry = ResourceRegistry::new();
    let a = registry.create("blob:a", (), 100, None).unwrap();
    let b = registry.create("blob:b", (), 50, None).unwrap();

    let stats = registry.stats();
    assert_eq!(stats.live_entries, 2);
    assert_eq!(stats.total_bytes, 150);
    assert_eq!(stats.created, 2);
    assert_eq!(stats.destroyed, 0);

    a.release();
    let stats = registry.stats();
    assert_eq!(stats.live_entries, 1);
    assert_eq!(stats.total_bytes, 50);
    assert_eq!(stats.destroyed, 1);
    drop(b);
}

// ============================================================================
// Tests: Concurrency
// ============================================================================

#[test]
fn test_concurrent_acquire_release_destroys_exactly_once() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 500;

    let registry = ResourceRegistry::new();
    let destroyed = Arc::new(AtomicUsize::new(0));
    let handle = registry.create("blob:shared", 0u32, 4, counting_destructor(&destroyed)).unwrap();
    let barrier = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = registry.clone();
            let barrier = barrier.clone();
            std::thread::spawn(move || {
                barrier.wait();
                for _ in 0..ROUNDS {
                    let h = registry.acquire("blob:shared").unwrap().unwrap();
                    let c = h.clone();
                    drop(h);
                    c.release();
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(destroyed.load(Ordering::SeqCst), 0);
    assert_eq!(handle.ref_count(), 1);
    assert!(handle.release());
    assert_eq!(destroyed.load(Ordering::SeqCst), 1);
}
