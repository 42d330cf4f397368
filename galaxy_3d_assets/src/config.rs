/// Asset subsystem configuration.
///
/// Read once when an `AssetManager` starts; changing a config afterwards has
/// no effect on a running manager.

use crate::error::{Galaxy3dError, Galaxy3dResult};

/// How content identifiers are derived from mesh vertex and index data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityMode {
    /// Hash element counts plus at most `samples` evenly spaced elements.
    ///
    /// Fast on large payloads, but two different payloads agreeing on every
    /// sampled element collapse to the same identifier.
    Sampled { samples: usize },
    /// Hash every element
    Full,
}

impl IdentityMode {
    /// Default sample count for `IdentityMode::Sampled`
    pub const DEFAULT_SAMPLES: usize = 16;
}

impl Default for IdentityMode {
    fn default() -> Self {
        IdentityMode::Sampled { samples: Self::DEFAULT_SAMPLES }
    }
}

/// Worker pool and queue configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsyncConfig {
    /// Number of worker threads (0 = one per logical CPU)
    pub worker_threads: usize,
    /// Maximum number of pending tasks (0 = unbounded)
    pub max_queue_depth: usize,
    /// Order the queue by priority; when false the queue is strict FIFO
    pub priority_ordering: bool,
}

impl AsyncConfig {
    /// Worker count after resolving 0 to the hardware concurrency
    pub fn resolved_worker_threads(&self) -> usize {
        if self.worker_threads == 0 {
            num_cpus::get().max(1)
        } else {
            self.worker_threads
        }
    }
}

impl Default for AsyncConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            max_queue_depth: 1024,
            priority_ordering: true,
        }
    }
}

/// Top-level configuration for an `AssetManager`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetConfig {
    /// Capacity used when the mesh cache is lazily initialized
    pub mesh_cache_capacity: usize,
    /// Capacity used when the texture cache is lazily initialized
    pub texture_cache_capacity: usize,
    /// Capacity used when the material cache is lazily initialized
    pub material_cache_capacity: usize,
    /// Identifier derivation for meshes and textures
    pub identity_mode: IdentityMode,
    /// Worker pool settings
    pub async_loader: AsyncConfig,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            mesh_cache_capacity: 128,
            texture_cache_capacity: 128,
            material_cache_capacity: 256,
            identity_mode: IdentityMode::default(),
            async_loader: AsyncConfig::default(),
        }
    }
}

impl AssetConfig {
    pub fn with_mesh_cache_capacity(mut self, capacity: usize) -> Self {
        self.mesh_cache_capacity = capacity;
        self
    }

    pub fn with_texture_cache_capacity(mut self, capacity: usize) -> Self {
        self.texture_cache_capacity = capacity;
        self
    }

    pub fn with_material_cache_capacity(mut self, capacity: usize) -> Self {
        self.material_cache_capacity = capacity;
        self
    }

    pub fn with_identity_mode(mut self, mode: IdentityMode) -> Self {
        self.identity_mode = mode;
        self
    }

    pub fn with_worker_threads(mut self, count: usize) -> Self {
        self.async_loader.worker_threads = count;
        self
    }

    pub fn with_max_queue_depth(mut self, depth: usize) -> Self {
        self.async_loader.max_queue_depth = depth;
        self
    }

    pub fn with_priority_ordering(mut self, enabled: bool) -> Self {
        self.async_loader.priority_ordering = enabled;
        self
    }

    /// Check the configuration before starting a manager
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if a cache capacity or the sample count is zero.
    pub fn validate(&self) -> Galaxy3dResult<()> {
        let capacities = [
            ("mesh_cache_capacity", self.mesh_cache_capacity),
            ("texture_cache_capacity", self.texture_cache_capacity),
            ("material_cache_capacity", self.material_cache_capacity),
        ];
        for (name, value) in capacities {
            if value == 0 {
                return Err(Galaxy3dError::InvalidArgument(format!("{} must be non-zero", name)));
            }
        }
        if let IdentityMode::Sampled { samples: 0 } = self.identity_mode {
            return Err(Galaxy3dError::InvalidArgument("identity sample count must be non-zero".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
