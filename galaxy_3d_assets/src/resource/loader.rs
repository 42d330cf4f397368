/// Per-kind resource loaders.
///
/// A `ResourceLoader<T>` resolves source data to a shared registry entry:
///
/// 1. lazily initialize the kind's cache
/// 2. validate the source and derive its content identifier
/// 3. cache hit -> done
/// 4. registry hit -> cache it
/// 5. miss -> deep copy the source, create the registry entry, cache it
///
/// and always hands back an owned copy of the resolved payload next to the
/// handle. Any failure yields an error and no handle.

use std::fmt;
use std::sync::{Arc, RwLock};
use crate::cache::{CacheStats, ResourceCache};
use crate::config::{AssetConfig, IdentityMode};
use crate::error::{Galaxy3dError, Galaxy3dResult};
use crate::registry::{Destructor, ResourceHandle, ResourceRegistry};
use super::mesh::MeshData;
use super::texture::TextureData;
use super::material::MaterialData;

/// Attempts at resolving an identifier when racing other creators
const CREATE_ATTEMPTS: usize = 4;

// ===== RESOURCE KIND =====

/// Kinds of resources handled by the loaders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Mesh,
    Texture,
    Material,
}

impl ResourceKind {
    /// Identifier prefix, e.g. "mesh" in "mesh:3f2a9c0d1e4b5a67"
    pub fn prefix(self) -> &'static str {
        match self {
            ResourceKind::Mesh => "mesh",
            ResourceKind::Texture => "texture",
            ResourceKind::Material => "material",
        }
    }

    pub(crate) fn loader_log_source(self) -> &'static str {
        match self {
            ResourceKind::Mesh => "galaxy3d::MeshLoader",
            ResourceKind::Texture => "galaxy3d::TextureLoader",
            ResourceKind::Material => "galaxy3d::MaterialLoader",
        }
    }

    pub(crate) fn cache_log_source(self) -> &'static str {
        match self {
            ResourceKind::Mesh => "galaxy3d::MeshCache",
            ResourceKind::Texture => "galaxy3d::TextureCache",
            ResourceKind::Material => "galaxy3d::MaterialCache",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

// ===== LOADABLE RESOURCE =====

/// Source data that can be deduplicated through the registry
pub trait LoadableResource: Clone + Send + Sync + 'static {
    /// Kind tag, also the identifier prefix
    const KIND: ResourceKind;

    /// This kind's loader within `loaders`
    fn loader(loaders: &ResourceLoaders) -> &ResourceLoader<Self>;

    /// Reject malformed source data before anything is allocated
    fn validate(&self) -> Galaxy3dResult<()>;

    /// Deterministic content identifier
    fn identifier(&self, mode: IdentityMode) -> String;

    /// Payload size accounted in the registry
    fn byte_size(&self) -> usize;

    /// Deep copy with fallible allocation
    ///
    /// # Errors
    ///
    /// `OutOfMemory` if any buffer cannot be allocated; nothing is leaked.
    fn duplicate(&self) -> Galaxy3dResult<Self>;
}

/// Result of a successful load: a counted handle plus an owned payload copy
#[derive(Debug)]
pub struct Loaded<T> {
    pub handle: ResourceHandle,
    pub data: T,
}

/// Hook invoked with the identifier and payload when a resource is destroyed
pub type ReleaseHook<T> = Arc<dyn Fn(&str, &T) + Send + Sync>;

// ===== RESOURCE LOADER =====

/// Cache -> registry -> create loader for one resource kind
pub struct ResourceLoader<T: LoadableResource> {
    registry: ResourceRegistry,
    cache: Arc<ResourceCache>,
    default_capacity: usize,
    identity_mode: IdentityMode,
    release_hook: Arc<RwLock<Option<ReleaseHook<T>>>>,
}

impl<T: LoadableResource> Clone for ResourceLoader<T> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            cache: self.cache.clone(),
            default_capacity: self.default_capacity,
            identity_mode: self.identity_mode,
            release_hook: self.release_hook.clone(),
        }
    }
}

impl<T: LoadableResource> ResourceLoader<T> {
    /// Create a loader sharing `registry`, with its own (uninitialized) cache
    ///
    /// `default_capacity` is used when the cache is lazily initialized by
    /// the first load.
    pub fn new(registry: ResourceRegistry, default_capacity: usize, identity_mode: IdentityMode) -> Self {
        Self {
            registry,
            cache: Arc::new(ResourceCache::new(T::KIND.cache_log_source())),
            default_capacity,
            identity_mode,
            release_hook: Arc::new(RwLock::new(None)),
        }
    }

    /// Load `source`, deduplicating against the cache and the registry
    ///
    /// The returned handle carries one count owned by the caller; give it
    /// back with `release` (or by dropping it).
    ///
    /// # Errors
    ///
    /// - `InvalidResource`/`InvalidArgument` for malformed source data
    /// - `OutOfMemory` if the deep copy fails
    /// - `LockPoisoned`/`InitializationFailed` if the cache or registry is unusable
    pub fn load(&self, source: &T) -> Galaxy3dResult<Loaded<T>> {
        let log_source = T::KIND.loader_log_source();

        self.cache.ensure_initialized(self.default_capacity)?;
        source.validate()?;

        let identifier = source.identifier(self.identity_mode);
        let handle = self.resolve(&identifier, source)?;

        let data = handle
            .downcast::<T>()
            .ok_or_else(|| crate::engine_err!(log_source,
                "Registry entry '{}' does not hold a {} payload", identifier, T::KIND))?
            .duplicate()?;

        Ok(Loaded { handle, data })
    }

    fn resolve(&self, identifier: &str, source: &T) -> Galaxy3dResult<ResourceHandle> {
        let log_source = T::KIND.loader_log_source();

        if let Some(handle) = self.cache.get(identifier)? {
            return Ok(handle);
        }

        for _ in 0..CREATE_ATTEMPTS {
            if let Some(handle) = self.registry.acquire(identifier)? {
                crate::engine_trace!(log_source, "Registry hit '{}'", identifier);
                self.cache.put(&handle)?;
                return Ok(handle);
            }

            let payload = source.duplicate()?;
            let size = payload.byte_size();
            match self.registry.create(identifier, payload, size, Some(self.destructor())) {
                Ok(handle) => {
                    crate::engine_debug!(log_source, "Loaded new {} '{}' ({} bytes)",
                        T::KIND, identifier, size);
                    self.cache.put(&handle)?;
                    return Ok(handle);
                }
                Err(Galaxy3dError::AlreadyExists(_)) => {
                    crate::engine_trace!(log_source, "Lost creation race for '{}', retrying", identifier);
                }
                Err(e) => return Err(e),
            }
        }

        crate::engine_warn!(log_source, "Gave up resolving '{}' after {} attempts",
            identifier, CREATE_ATTEMPTS);
        Err(Galaxy3dError::AlreadyExists(identifier.to_string()))
    }

    fn destructor(&self) -> Destructor {
        let hook = self.release_hook.clone();
        Box::new(move |identifier, payload| {
            crate::engine_debug!(T::KIND.loader_log_source(), "Releasing '{}'", identifier);

            let hook = match hook.read() {
                Ok(guard) => (*guard).clone(),
                Err(poisoned) => (*poisoned.into_inner()).clone(),
            };
            if let (Some(hook), Some(data)) = (hook, payload.downcast_ref::<T>()) {
                hook(identifier, data);
            }
        })
    }

    /// Give back a handle obtained from `load`
    ///
    /// Returns `true` if this call destroyed the resource.
    pub fn release(&self, handle: ResourceHandle) -> bool {
        self.registry.release(handle)
    }

    /// Validate and deep copy `source` without registering it
    pub fn load_unmanaged(&self, source: &T) -> Galaxy3dResult<T> {
        source.validate()?;
        source.duplicate()
    }

    /// Dispose of a copy produced by `load_unmanaged`
    pub fn free_unmanaged(&self, data: T) {
        drop(data);
    }

    /// Identifier `source` resolves to under this loader's identity mode
    pub fn identifier_for(&self, source: &T) -> String {
        source.identifier(self.identity_mode)
    }

    /// Install a hook called whenever a resource of this kind is destroyed
    pub fn set_release_hook(&self, hook: impl Fn(&str, &T) + Send + Sync + 'static) {
        if let Ok(mut slot) = self.release_hook.write() {
            *slot = Some(Arc::new(hook));
        }
    }

    /// Remove the release hook
    pub fn clear_release_hook(&self) {
        if let Ok(mut slot) = self.release_hook.write() {
            *slot = None;
        }
    }

    // ===== CACHE ADMINISTRATION =====

    /// The kind's cache
    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    pub fn cache_initialize(&self, max_entries: usize) -> Galaxy3dResult<()> {
        self.cache.initialize(max_entries)
    }

    pub fn cache_shutdown(&self) -> Galaxy3dResult<()> {
        self.cache.shutdown()
    }

    pub fn cache_clear(&self) -> Galaxy3dResult<()> {
        self.cache.clear()
    }

    pub fn cache_stats(&self) -> Galaxy3dResult<CacheStats> {
        self.cache.stats()
    }
}

// ===== RESOURCE LOADERS =====

/// The three per-kind loaders sharing one registry
#[derive(Clone)]
pub struct ResourceLoaders {
    pub meshes: ResourceLoader<MeshData>,
    pub textures: ResourceLoader<TextureData>,
    pub materials: ResourceLoader<MaterialData>,
}

impl ResourceLoaders {
    pub fn new(registry: &ResourceRegistry, config: &AssetConfig) -> Self {
        Self {
            meshes: ResourceLoader::new(registry.clone(), config.mesh_cache_capacity, config.identity_mode),
            textures: ResourceLoader::new(registry.clone(), config.texture_cache_capacity, config.identity_mode),
            materials: ResourceLoader::new(registry.clone(), config.material_cache_capacity, config.identity_mode),
        }
    }

    /// Run `f` against the cache of `kind`
    pub fn with_cache<R>(&self, kind: ResourceKind, f: impl FnOnce(&ResourceCache) -> R) -> R {
        match kind {
            ResourceKind::Mesh => f(self.meshes.cache()),
            ResourceKind::Texture => f(self.textures.cache()),
            ResourceKind::Material => f(self.materials.cache()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
