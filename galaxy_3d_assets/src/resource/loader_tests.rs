/// Tests for ResourceLoader
///
/// These tests validate the cache -> registry -> create resolution order,
/// deduplication, refcount/destructor behavior and failure handling.

use super::*;
use crate::resource::mesh::Vertex;
use crate::resource::texture::PixelFormat;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

// ============================================================================
// Helper Functions
// ============================================================================

fn create_mesh_loader(capacity: usize) -> (ResourceRegistry, ResourceLoader<MeshData>) {
    let registry = ResourceRegistry::new();
    let loader = ResourceLoader::new(registry.clone(), capacity, IdentityMode::default());
    (registry, loader)
}

/// Triangle offset along X so that each `offset` yields distinct content
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

// ============================================================================
// Tests: Resolution order
// ============================================================================

#[test]
fn test_first_load_creates_and_caches() {
    let (registry, loader) = create_mesh_loader(8);
    let source = create_triangle(0.0);

    let loaded = loader.load(&source).unwrap();

    assert_eq!(loaded.data, source);
    assert_eq!(loaded.handle.identifier(), loader.identifier_for(&source));
    // Caller + cache
    assert_eq!(loaded.handle.ref_count(), 2);
    assert_eq!(registry.live_count(), 1);

    let stats = loader.cache_stats().unwrap();
    assert_eq!(stats.entry_count, 1);
    assert_eq!(stats.max_entries, 8);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 0);
}

#[test]
fn test_second_load_hits_cache_and_dedups() {
    let (registry, loader) = create_mesh_loader(8);

    let first = loader.load(&create_triangle(0.0)).unwrap();
    let second = loader.load(&create_triangle(0.0).with_source("copy.gltf")).unwrap();

    assert!(first.handle.ptr_eq(&second.handle));
    assert_eq!(registry.live_count(), 1);
    assert_eq!(loader.cache_stats().unwrap().hits, 1);
    // The output is the registered payload, not the second source
    assert_eq!(second.data.source, None);
}

#[test]
fn test_registry_hit_after_cache_clear_repopulates_cache() {
    let (registry, loader) = create_mesh_loader(8);

    let first = loader.load(&create_triangle(0.0)).unwrap();
    loader.cache_clear().unwrap();
    assert_eq!(first.handle.ref_count(), 1);

    let second = loader.load(&create_triangle(0.0)).unwrap();
    assert!(first.handle.ptr_eq(&second.handle));
    assert_eq!(registry.stats().created, 1);
    assert_eq!(loader.cache_stats().unwrap().entry_count, 1);
    assert_eq!(first.handle.ref_count(), 3);
}

#[test]
fn test_explicit_cache_initialize_wins_over_default() {
    let (_registry, loader) = create_mesh_loader(128);
    loader.cache_initialize(2).unwrap();
    loader.load(&create_triangle(0.0)).unwrap();
    assert_eq!(loader.cache_stats().unwrap().max_entries, 2);
}

// ============================================================================
// Tests: Load / reuse / evict scenario
// ============================================================================

#[test]
fn test_load_reuse_evict_scenario() {
    let (registry, loader) = create_mesh_loader(128);
    loader.cache_initialize(2).unwrap();

    let destroyed = Arc::new(AtomicUsize::new(0));
    let counter = destroyed.clone();
    loader.set_release_hook(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let a1 = loader.load(&create_triangle(0.0)).unwrap();
    let a2 = loader.load(&create_triangle(0.0)).unwrap();
    assert_eq!(loader.cache_stats().unwrap().hits, 1);
    let a_id = a1.handle.identifier().to_string();

    let b = loader.load(&create_triangle(10.0)).unwrap();
    let c = loader.load(&create_triangle(20.0)).unwrap();

    // Cache now holds B and C; A survives in the registry through the caller
    assert_eq!(loader.cache_stats().unwrap().entry_count, 2);
    assert!(!loader.cache().contains(&a_id));
    assert!(registry.contains(&a_id));

    assert!(!loader.release(a1.handle));
    assert_eq!(destroyed.load(Ordering::SeqCst), 0);
    assert!(loader.release(a2.handle));
    assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    assert!(!registry.contains(&a_id));

    drop((b, c));
}

// ============================================================================
// Tests: Failures
// ============================================================================

#[test]
fn test_invalid_source_creates_nothing() {
    let (registry, loader) = create_mesh_loader(8);

    let result = loader.load(&MeshData::default());
    assert!(matches!(result, Err(Galaxy3dError::InvalidArgument(_))));
    assert_eq!(registry.live_count(), 0);
    assert_eq!(loader.cache_stats().unwrap().entry_count, 0);
}

#[test]
fn test_texture_size_mismatch_fails() {
    let registry = ResourceRegistry::new();
    let loader: ResourceLoader<TextureData> =
        ResourceLoader::new(registry.clone(), 4, IdentityMode::default());

    let bad = TextureData::new(4, 4, PixelFormat::Rgba8, vec![0; 10]);
    assert!(loader.load(&bad).is_err());
    assert_eq!(registry.live_count(), 0);
}

// ============================================================================
// Tests: Kinds share one registry
// ============================================================================

#[test]
fn test_loaders_share_registry_without_collisions() {
    let registry = ResourceRegistry::new();
    let loaders = ResourceLoaders::new(&registry, &AssetConfig::default());

    let mesh = loaders.meshes.load(&create_triangle(0.0)).unwrap();
    let texture = loaders.textures
        .load(&TextureData::new(1, 1, PixelFormat::Rgba8, vec![1, 2, 3, 4]))
        .unwrap();
    let material = loaders.materials.load(&MaterialData::default()).unwrap();

    assert_eq!(registry.live_count(), 3);
    assert!(mesh.handle.identifier().starts_with("mesh:"));
    assert!(texture.handle.identifier().starts_with("texture:"));
    assert!(material.handle.identifier().starts_with("material:"));

    let material_stats = loaders.with_cache(ResourceKind::Material, |cache| cache.stats().unwrap());
    assert_eq!(material_stats.max_entries, 256);
}

// ============================================================================
// Tests: Unmanaged / hooks
// ============================================================================

#[test]
fn test_load_unmanaged_bypasses_registry() {
    let (registry, loader) = create_mesh_loader(8);
    let copy = loader.load_unmanaged(&create_triangle(0.0)).unwrap();

    assert_eq!(copy.vertex_count(), 3);
    assert_eq!(registry.live_count(), 0);
    assert!(!loader.cache().is_initialized().unwrap());
    loader.free_unmanaged(copy);
}

#[test]
fn test_release_hook_sees_identifier_and_payload() {
    let (_registry, loader) = create_mesh_loader(8);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_in_hook = seen.clone();
    loader.set_release_hook(move |id, mesh: &MeshData| {
        seen_in_hook.lock().unwrap().push((id.to_string(), mesh.vertex_count()));
    });

    let loaded = loader.load(&create_triangle(0.0)).unwrap();
    let id = loaded.handle.identifier().to_string();
    drop(loaded);
    assert!(seen.lock().unwrap().is_empty());

    loader.cache_shutdown().unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![(id, 3)]);
}

// ============================================================================
// Tests: Concurrency
// ============================================================================

#[test]
fn test_concurrent_loads_converge_on_one_entry() {
    let (registry, loader) = create_mesh_loader(8);
    let barrier = Arc::new(std::sync::Barrier::new(8));

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let loader = loader.clone();
            let barrier = barrier.clone();
            std::thread::spawn(move || {
                barrier.wait();
                loader.load(&create_triangle(0.0)).unwrap()
            })
        })
        .collect();

    let results: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();

    assert_eq!(registry.stats().created, 1);
    assert!(results.iter().all(|r| r.handle.ptr_eq(&results[0].handle)));
    assert_eq!(results[0].handle.ref_count(), 9);
}
