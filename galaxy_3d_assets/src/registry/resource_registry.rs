/// Reference-counted resource registry.
///
/// Maps a content-derived identifier to a shared cell holding the payload,
/// its byte size, a type-erased destructor and an atomic reference count.
///
/// The table lock is held only for lookup/insert/unlink. Payload boxing
/// happens before the lock is taken and destructors run after it is released.

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use rustc_hash::FxHashMap;
use crate::error::{Galaxy3dError, Galaxy3dResult};
use super::resource_handle::{Destructor, ResourceCell, ResourceHandle};

const SOURCE: &str = "galaxy3d::ResourceRegistry";

/// Snapshot of registry counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryStats {
    /// Entries whose count is above zero
    pub live_entries: usize,
    /// Sum of the declared sizes of live entries
    pub total_bytes: usize,
    /// Entries created since the registry started
    pub created: u64,
    /// Entries destroyed since the registry started
    pub destroyed: u64,
}

/// State shared between the registry and every handle it produced
pub(crate) struct RegistryShared {
    entries: Mutex<FxHashMap<String, Arc<ResourceCell>>>,
    total_bytes: AtomicUsize,
    created: AtomicU64,
    destroyed: AtomicU64,
}

impl RegistryShared {
    fn lock_entries(&self) -> Galaxy3dResult<MutexGuard<'_, FxHashMap<String, Arc<ResourceCell>>>> {
        self.entries.lock().map_err(|_| {
            crate::engine_error!(SOURCE, "Registry table lock poisoned");
            Galaxy3dError::LockPoisoned("resource registry".to_string())
        })
    }

    /// Tear down a cell whose count just reached zero
    pub(crate) fn destroy(&self, cell: &Arc<ResourceCell>) {
        match self.lock_entries() {
            Ok(mut entries) => {
                // A dying entry may already have been replaced by a fresh create()
                let is_current = entries
                    .get(&cell.identifier)
                    .is_some_and(|current| Arc::ptr_eq(current, cell));
                if is_current {
                    entries.remove(&cell.identifier);
                }
            }
            Err(_) => {
                crate::engine_warn!(SOURCE,
                    "Destroying '{}' without unlinking it", cell.identifier);
            }
        }

        if let Some(destructor) = cell.take_destructor() {
            destructor(&cell.identifier, &*cell.payload);
        }

        self.total_bytes.fetch_sub(cell.size, Ordering::Relaxed);
        self.destroyed.fetch_add(1, Ordering::Relaxed);
        crate::engine_trace!(SOURCE, "Destroyed '{}' ({} bytes)", cell.identifier, cell.size);
    }
}

/// Registry of shared resources, one per `AssetManager`
///
/// Cloning a registry is cheap and yields another view on the same table.
#[derive(Clone)]
pub struct ResourceRegistry {
    shared: Arc<RegistryShared>,
}

impl ResourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            shared: Arc::new(RegistryShared {
                entries: Mutex::new(FxHashMap::default()),
                total_bytes: AtomicUsize::new(0),
                created: AtomicU64::new(0),
                destroyed: AtomicU64::new(0),
            }),
        }
    }

    /// Insert a new resource with a count of 1
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` if `identifier` is empty
    /// - `AlreadyExists` if a live entry uses `identifier` (callers check with
    ///   `acquire` first, and retry `acquire` when losing a creation race)
    /// - `LockPoisoned` if the table is unusable
    pub fn create<T: Any + Send + Sync>(
        &self,
        identifier: impl Into<String>,
        payload: T,
        size: usize,
        destructor: Option<Destructor>,
    ) -> Galaxy3dResult<ResourceHandle> {
        let identifier = identifier.into();
        if identifier.is_empty() {
            return Err(Galaxy3dError::InvalidArgument("resource identifier is empty".to_string()));
        }

        let cell = Arc::new(ResourceCell::new(identifier, Box::new(payload), size, destructor));

        {
            let mut entries = self.shared.lock_entries()?;
            if let Some(existing) = entries.get(&cell.identifier) {
                if existing.ref_count.load(Ordering::Acquire) > 0 {
                    return Err(Galaxy3dError::AlreadyExists(cell.identifier.clone()));
                }
            }
            entries.insert(cell.identifier.clone(), cell.clone());
        }

        self.shared.total_bytes.fetch_add(size, Ordering::Relaxed);
        self.shared.created.fetch_add(1, Ordering::Relaxed);
        crate::engine_debug!(SOURCE, "Created '{}' ({} bytes)", cell.identifier, size);

        Ok(ResourceHandle::from_counted(cell, self.shared.clone()))
    }

    /// Acquire an additional count on a live entry
    ///
    /// Returns `Ok(None)` when no live entry uses `identifier`.
    pub fn acquire(&self, identifier: &str) -> Galaxy3dResult<Option<ResourceHandle>> {
        let entries = self.shared.lock_entries()?;
        let Some(cell) = entries.get(identifier) else {
            return Ok(None);
        };
        if !cell.try_acquire() {
            return Ok(None);
        }
        Ok(Some(ResourceHandle::from_counted(cell.clone(), self.shared.clone())))
    }

    /// Give a handle's count back
    ///
    /// Returns `true` if the resource was destroyed by this call.
    pub fn release(&self, handle: ResourceHandle) -> bool {
        handle.release()
    }

    /// Whether a live entry uses `identifier`
    pub fn contains(&self, identifier: &str) -> bool {
        self.ref_count(identifier).is_some_and(|count| count > 0)
    }

    /// Current count of an entry, if present
    pub fn ref_count(&self, identifier: &str) -> Option<usize> {
        let entries = self.shared.lock_entries().ok()?;
        entries
            .get(identifier)
            .map(|cell| cell.ref_count.load(Ordering::Acquire))
    }

    /// Number of live entries
    pub fn live_count(&self) -> usize {
        self.stats().live_entries
    }

    /// Snapshot of the registry counters
    pub fn stats(&self) -> RegistryStats {
        let live_entries = match self.shared.lock_entries() {
            Ok(entries) => entries
                .values()
                .filter(|cell| cell.ref_count.load(Ordering::Acquire) > 0)
                .count(),
            Err(_) => 0,
        };
        RegistryStats {
            live_entries,
            total_bytes: self.shared.total_bytes.load(Ordering::Relaxed),
            created: self.shared.created.load(Ordering::Relaxed),
            destroyed: self.shared.destroyed.load(Ordering::Relaxed),
        }
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "resource_registry_tests.rs"]
mod tests;
