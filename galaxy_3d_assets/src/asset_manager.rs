/// Galaxy3D asset manager.
///
/// Owns the resource registry, the three per-kind loaders (each with its
/// bounded cache) and the async loader. There is no global instance: create
/// one `AssetManager` and pass it to whoever loads assets.
///
/// `AssetManager` is `Send` but not `Sync` (see `AsyncLoader`). Code that
/// needs synchronous loads from other threads clones `loaders()`.
///
/// # Example
///
/// ```no_run
/// use galaxy_3d_assets::galaxy3d::{AssetManager, AssetConfig};
/// use galaxy_3d_assets::galaxy3d::resource::{MeshData, Vertex};
/// use galaxy_3d_assets::galaxy3d::async_loader::TaskPriority;
///
/// let mut assets = AssetManager::new(AssetConfig::default())?;
///
/// let mesh = MeshData::new(vec![Vertex::default(); 3], vec![0, 1, 2]);
/// let loaded = assets.load_mesh(&mesh)?;
///
/// assets.load_mesh_async(mesh, TaskPriority::High, |task| {
///     println!("mesh task {} -> {:?}", task.id(), task.status());
/// })?;
///
/// // Once per frame, on the render thread
/// assets.process_completed_tasks();
///
/// assets.release(loaded.handle);
/// assets.shutdown();
/// # Ok::<(), galaxy_3d_assets::galaxy3d::Galaxy3dError>(())
/// ```

use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;
use crate::async_loader::{AsyncLoader, AsyncStats, AsyncTask, TaskKind, TaskPayload, TaskPriority};
use crate::cache::CacheStats;
use crate::config::AssetConfig;
use crate::error::Galaxy3dResult;
use crate::registry::{RegistryStats, ResourceHandle, ResourceRegistry};
use crate::resource::{
    LoadableResource, Loaded, MaterialData, MeshData,
    ResourceKind, ResourceLoaders, TextureData,
};

const SOURCE: &str = "galaxy3d::AssetManager";

pub struct AssetManager {
    config: AssetConfig,
    registry: ResourceRegistry,
    loaders: ResourceLoaders,
    async_loader: AsyncLoader,
}

impl AssetManager {
    /// Start the asset subsystem
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `config` fails validation
    /// - `InitializationFailed` if the worker pool cannot start
    pub fn new(config: AssetConfig) -> Galaxy3dResult<Self> {
        config.validate()?;

        let registry = ResourceRegistry::new();
        let loaders = ResourceLoaders::new(&registry, &config);
        let async_loader = AsyncLoader::new(&config.async_loader, loaders.clone())?;

        crate::engine_info!(SOURCE,
            "Asset manager started (caches: mesh {}, texture {}, material {}; {} worker(s))",
            config.mesh_cache_capacity, config.texture_cache_capacity,
            config.material_cache_capacity, async_loader.worker_count());

        Ok(Self { config, registry, loaders, async_loader })
    }

    pub fn config(&self) -> &AssetConfig {
        &self.config
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn loaders(&self) -> &ResourceLoaders {
        &self.loaders
    }

    pub fn async_loader(&self) -> &AsyncLoader {
        &self.async_loader
    }

    // ===== SYNCHRONOUS LOADS =====

    pub fn load_mesh(&self, mesh: &MeshData) -> Galaxy3dResult<Loaded<MeshData>> {
        self.loaders.meshes.load(mesh)
    }

    pub fn load_texture(&self, texture: &TextureData) -> Galaxy3dResult<Loaded<TextureData>> {
        self.loaders.textures.load(texture)
    }

    pub fn load_material(&self, material: &MaterialData) -> Galaxy3dResult<Loaded<MaterialData>> {
        self.loaders.materials.load(material)
    }

    /// Give back a handle from any load; `true` if this destroyed the resource
    pub fn release(&self, handle: ResourceHandle) -> bool {
        self.registry.release(handle)
    }

    /// Validated deep copy that bypasses the registry and the caches
    pub fn load_unmanaged<T: LoadableResource>(&self, source: &T) -> Galaxy3dResult<T> {
        T::loader(&self.loaders).load_unmanaged(source)
    }

    /// Dispose of a copy produced by `load_unmanaged`
    pub fn free_unmanaged<T: LoadableResource>(&self, data: T) {
        T::loader(&self.loaders).free_unmanaged(data);
    }

    // ===== ASYNC LOADS =====

    pub fn load_mesh_async(
        &self,
        mesh: MeshData,
        priority: TaskPriority,
        callback: impl FnOnce(&AsyncTask) + Send + 'static,
    ) -> Galaxy3dResult<Arc<AsyncTask>> {
        self.async_loader.load_mesh_async(mesh, priority, callback)
    }

    pub fn load_texture_async(
        &self,
        texture: TextureData,
        priority: TaskPriority,
        callback: impl FnOnce(&AsyncTask) + Send + 'static,
    ) -> Galaxy3dResult<Arc<AsyncTask>> {
        self.async_loader.load_texture_async(texture, priority, callback)
    }

    pub fn load_material_async(
        &self,
        material: MaterialData,
        priority: TaskPriority,
        callback: impl FnOnce(&AsyncTask) + Send + 'static,
    ) -> Galaxy3dResult<Arc<AsyncTask>> {
        self.async_loader.load_material_async(material, priority, callback)
    }

    pub fn load_scene_async(
        &self,
        path: impl Into<PathBuf>,
        priority: TaskPriority,
        callback: impl FnOnce(&AsyncTask) + Send + 'static,
    ) -> Galaxy3dResult<Arc<AsyncTask>> {
        self.async_loader.load_scene_async(path, priority, callback)
    }

    pub fn submit(
        &self,
        kind: TaskKind,
        payload: TaskPayload,
        priority: TaskPriority,
        callback: impl FnOnce(&AsyncTask) + Send + 'static,
    ) -> Galaxy3dResult<Arc<AsyncTask>> {
        self.async_loader.submit(kind, payload, priority, callback)
    }

    pub fn submit_custom<F, C>(
        &self,
        priority: TaskPriority,
        payload: TaskPayload,
        function: F,
        callback: C,
    ) -> Galaxy3dResult<Arc<AsyncTask>>
    where
        F: FnOnce(TaskPayload) -> Galaxy3dResult<Box<dyn Any + Send>> + Send + 'static,
        C: FnOnce(&AsyncTask) + Send + 'static,
    {
        self.async_loader.submit_custom(priority, payload, function, callback)
    }

    /// Run the callbacks of finished tasks on the calling thread
    pub fn process_completed_tasks(&self) -> usize {
        self.async_loader.process_completed_tasks()
    }

    pub fn cancel(&self, task: &Arc<AsyncTask>) -> bool {
        self.async_loader.cancel(task)
    }

    pub fn free_task(&self, task: Arc<AsyncTask>) {
        self.async_loader.free_task(task)
    }

    // ===== CACHE ADMINISTRATION =====

    /// Initialize the cache of `kind` ahead of the first load
    pub fn cache_initialize(&self, kind: ResourceKind, max_entries: usize) -> Galaxy3dResult<()> {
        self.loaders.with_cache(kind, |cache| cache.initialize(max_entries))
    }

    /// Release every cached count and return the cache to uninitialized
    pub fn cache_shutdown(&self, kind: ResourceKind) -> Galaxy3dResult<()> {
        self.loaders.with_cache(kind, |cache| cache.shutdown())
    }

    pub fn cache_clear(&self, kind: ResourceKind) -> Galaxy3dResult<()> {
        self.loaders.with_cache(kind, |cache| cache.clear())
    }

    pub fn cache_stats(&self, kind: ResourceKind) -> Galaxy3dResult<CacheStats> {
        self.loaders.with_cache(kind, |cache| cache.stats())
    }

    // ===== STATS / LIFECYCLE =====

    pub fn registry_stats(&self) -> RegistryStats {
        self.registry.stats()
    }

    pub fn async_stats(&self) -> AsyncStats {
        self.async_loader.stats()
    }

    /// Stop the workers and empty every cache
    ///
    /// Callbacks of tasks finished or cancelled by the shutdown run in the
    /// final drain performed here. Resources still held by callers stay alive
    /// until their handles are released.
    pub fn shutdown(&mut self) {
        self.async_loader.shutdown();
        self.async_loader.process_completed_tasks();

        for kind in [ResourceKind::Mesh, ResourceKind::Texture, ResourceKind::Material] {
            if let Err(e) = self.cache_shutdown(kind) {
                crate::engine_warn!(SOURCE, "{} cache shutdown failed: {}", kind, e);
            }
        }

        let stats = self.registry.stats();
        if stats.live_entries > 0 {
            crate::engine_warn!(SOURCE, "{} resource(s) ({} bytes) still held at shutdown",
                stats.live_entries, stats.total_bytes);
        } else {
            crate::engine_info!(SOURCE, "Asset manager shut down");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "asset_manager_tests.rs"]
mod tests;
