//! Integration tests for the async loader
//!
//! Priority precedence and per-task failure isolation through the public
//! `AssetManager` API.
//!
//! Run with: cargo test --test async_integration_tests

use galaxy_3d_assets::galaxy3d::{AssetConfig, AssetManager, Galaxy3dError};
use galaxy_3d_assets::galaxy3d::async_loader::{TaskKind, TaskPayload, TaskPriority, TaskStatus};
use galaxy_3d_assets::galaxy3d::resource::{MeshData, PixelFormat, TextureData, Vertex};
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// ============================================================================
// HELPERS
// ============================================================================

fn create_manager(workers: usize) -> AssetManager {
    AssetManager::new(AssetConfig::default().with_worker_threads(workers)).unwrap()
}

fn create_triangle(offset: f32) -> MeshData {
    let n = [0.0, 0.0, 1.0];
    MeshData::new(
        vec![
            Vertex::new([offset, 0.0, 0.0], n, [0.0, 0.0]),
            Vertex::new([offset + 1.0, 0.0, 0.0], n, [1.0, 0.0]),
            Vertex::new([offset, 1.0, 0.0], n, [0.0, 1.0]),
        ],
        vec![0, 1, 2],
    )
}

fn drain_until(manager: &AssetManager, done: &AtomicUsize, expected: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while done.load(Ordering::SeqCst) < expected {
        manager.process_completed_tasks();
        assert!(Instant::now() < deadline, "timed out waiting for {} callbacks", expected);
        std::thread::sleep(Duration::from_millis(1));
    }
}

// ============================================================================
// PRIORITY
// ============================================================================

#[test]
fn test_integration_critical_not_after_earlier_low() {
    let manager = create_manager(1);
    let done = Arc::new(AtomicUsize::new(0));
    let order = Arc::new(Mutex::new(Vec::new()));

    // Hold the only worker so the three tasks queue up together
    let (gate_tx, gate_rx) = crossbeam_channel::bounded::<()>(1);
    let (started_tx, started_rx) = crossbeam_channel::bounded::<()>(1);
    manager
        .submit_custom(
            TaskPriority::Low,
            TaskPayload::Empty,
            move |_| {
                let _ = started_tx.send(());
                let _ = gate_rx.recv();
                Ok(Box::new(()) as Box<dyn Any + Send>)
            },
            |_| {},
        )
        .unwrap();
    started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    for (offset, priority) in [(0.0, TaskPriority::Low), (1.0, TaskPriority::Critical), (2.0, TaskPriority::Normal)] {
        let order = order.clone();
        let done = done.clone();
        manager
            .load_mesh_async(create_triangle(offset), priority, move |task| {
                order.lock().unwrap().push(task.priority());
                done.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
    }

    gate_tx.send(()).unwrap();
    drain_until(&manager, &done, 3);

    assert_eq!(
        *order.lock().unwrap(),
        vec![TaskPriority::Critical, TaskPriority::Normal, TaskPriority::Low]
    );
}

#[test]
fn test_integration_fifo_when_priority_disabled() {
    let manager = AssetManager::new(
        AssetConfig::default().with_worker_threads(1).with_priority_ordering(false),
    )
    .unwrap();
    let done = Arc::new(AtomicUsize::new(0));
    let order = Arc::new(Mutex::new(Vec::new()));

    let (gate_tx, gate_rx) = crossbeam_channel::bounded::<()>(1);
    let (started_tx, started_rx) = crossbeam_channel::bounded::<()>(1);
    manager
        .submit_custom(TaskPriority::Low, TaskPayload::Empty, move |_| {
            let _ = started_tx.send(());
            let _ = gate_rx.recv();
            Ok(Box::new(()) as Box<dyn Any + Send>)
        }, |_| {})
        .unwrap();
    started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    for priority in [TaskPriority::Low, TaskPriority::Critical, TaskPriority::Normal] {
        let order = order.clone();
        let done = done.clone();
        manager
            .submit(TaskKind::BufferUpload, TaskPayload::Bytes(vec![0; 4]), priority, move |task| {
                order.lock().unwrap().push(task.priority());
                done.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
    }

    gate_tx.send(()).unwrap();
    drain_until(&manager, &done, 3);

    assert_eq!(
        *order.lock().unwrap(),
        vec![TaskPriority::Low, TaskPriority::Critical, TaskPriority::Normal]
    );
}

// ============================================================================
// SCENARIO: FAILURE ISOLATION
// ============================================================================

#[test]
fn test_integration_failure_isolation() {
    let manager = create_manager(1);
    let done = Arc::new(AtomicUsize::new(0));
    let results = Arc::new(Mutex::new(Vec::new()));

    let submissions = [
        (TaskKind::TextureLoad, TaskPayload::Empty),
        (
            TaskKind::TextureLoad,
            TaskPayload::Texture(TextureData::new(2, 1, PixelFormat::Rg8, vec![1, 2, 3, 4])),
        ),
    ];
    for (kind, payload) in submissions {
        let results = results.clone();
        let done = done.clone();
        manager
            .submit(kind, payload, TaskPriority::Normal, move |task| {
                let texture = task.take_output().and_then(|o| o.into_texture());
                results.lock().unwrap().push((task.status(), task.error(), texture.is_some()));
                done.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
    }
    drain_until(&manager, &done, 2);

    let results = results.lock().unwrap();
    let (status, error, has_output) = &results[0];
    assert_eq!(*status, TaskStatus::Failed);
    assert!(error.as_deref().is_some_and(|e| !e.is_empty()));
    assert!(!has_output);

    let (status, error, has_output) = &results[1];
    assert_eq!(*status, TaskStatus::Completed);
    assert!(error.is_none());
    assert!(*has_output);
}

#[test]
fn test_integration_async_and_sync_converge() {
    let manager = create_manager(2);
    let done = Arc::new(AtomicUsize::new(0));
    let async_handle = Arc::new(Mutex::new(None));

    let sync = manager.load_mesh(&create_triangle(0.0)).unwrap();

    let slot = async_handle.clone();
    let counter = done.clone();
    manager
        .load_mesh_async(create_triangle(0.0), TaskPriority::High, move |task| {
            *slot.lock().unwrap() = task.take_output().and_then(|o| o.into_mesh());
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    drain_until(&manager, &done, 1);

    let loaded = async_handle.lock().unwrap().take().unwrap();
    assert!(loaded.handle.ptr_eq(&sync.handle));
    assert_eq!(manager.registry_stats().created, 1);
}

// ============================================================================
// SHUTDOWN
// ============================================================================

#[test]
fn test_integration_submit_after_shutdown() {
    let mut manager = create_manager(1);
    manager.shutdown();

    let result = manager.load_mesh_async(create_triangle(0.0), TaskPriority::Normal, |_| {});
    assert!(matches!(result, Err(Galaxy3dError::ShutDown)));
    assert_eq!(manager.async_stats().submitted, 0);
}
