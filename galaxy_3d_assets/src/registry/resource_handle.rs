/// Reference-counted resource handles.
///
/// A `ResourceHandle` owns exactly one count on a registry cell:
/// - `Clone` acquires one more count
/// - `Drop` / `release()` gives the count back
///
/// The destructor attached at creation runs once, on the 1 -> 0 transition,
/// on whichever thread performs that last release.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{fence, AtomicUsize, Ordering};
use super::resource_registry::RegistryShared;

/// Type-erased resource payload
pub type Payload = dyn Any + Send + Sync;

/// Cleanup callback, invoked with the identifier and the payload being destroyed
pub type Destructor = Box<dyn FnOnce(&str, &Payload) + Send>;

// ===== RESOURCE CELL =====

/// Shared storage behind every handle of one resource
pub(crate) struct ResourceCell {
    pub(crate) identifier: String,
    pub(crate) payload: Box<Payload>,
    pub(crate) size: usize,
    pub(crate) ref_count: AtomicUsize,
    pub(crate) destructor: Mutex<Option<Destructor>>,
}

impl ResourceCell {
    pub(crate) fn new(
        identifier: String,
        payload: Box<Payload>,
        size: usize,
        destructor: Option<Destructor>,
    ) -> Self {
        Self {
            identifier,
            payload,
            size,
            ref_count: AtomicUsize::new(1),
            destructor: Mutex::new(destructor),
        }
    }

    /// Increment the count unless it already reached zero (entry is dying)
    pub(crate) fn try_acquire(&self) -> bool {
        let mut count = self.ref_count.load(Ordering::Relaxed);
        loop {
            if count == 0 {
                return false;
            }
            match self.ref_count.compare_exchange_weak(
                count,
                count + 1,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(current) => count = current,
            }
        }
    }

    /// Take the destructor, leaving `None` behind
    pub(crate) fn take_destructor(&self) -> Option<Destructor> {
        match self.destructor.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}

// ===== RESOURCE HANDLE =====

/// Shared, atomically refcounted reference to a registry resource
///
/// # Example
///
/// ```no_run
/// use galaxy_3d_assets::galaxy3d::registry::ResourceRegistry;
///
/// let registry = ResourceRegistry::new();
/// let handle = registry.create("blob:1", vec![1u8, 2, 3], 3, None)?;
/// let second = handle.clone();          // count = 2
/// assert!(!second.release());           // count = 1
/// assert!(handle.release());            // count = 0, destroyed
/// # Ok::<(), galaxy_3d_assets::galaxy3d::Galaxy3dError>(())
/// ```
pub struct ResourceHandle {
    cell: Arc<ResourceCell>,
    registry: Arc<RegistryShared>,
    released: bool,
}

impl ResourceHandle {
    /// Wrap a cell whose count has already been incremented for this handle
    pub(crate) fn from_counted(cell: Arc<ResourceCell>, registry: Arc<RegistryShared>) -> Self {
        Self {
            cell,
            registry,
            released: false,
        }
    }

    /// Content-derived identifier
    pub fn identifier(&self) -> &str {
        &self.cell.identifier
    }

    /// Payload size in bytes, as declared at creation
    pub fn size(&self) -> usize {
        self.cell.size
    }

    /// Current reference count (snapshot, may change concurrently)
    pub fn ref_count(&self) -> usize {
        self.cell.ref_count.load(Ordering::Acquire)
    }

    /// Type-erased payload
    pub fn payload(&self) -> &Payload {
        &*self.cell.payload
    }

    /// Payload downcast to its concrete type
    pub fn downcast<T: Any>(&self) -> Option<&T> {
        self.cell.payload.downcast_ref::<T>()
    }

    /// Whether two handles refer to the same registry cell
    pub fn ptr_eq(&self, other: &ResourceHandle) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    /// Give this handle's count back to the registry
    ///
    /// Returns `true` if this call dropped the count to zero, ran the
    /// destructor and removed the registry entry.
    pub fn release(mut self) -> bool {
        self.release_ref()
    }

    fn release_ref(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;

        if self.cell.ref_count.fetch_sub(1, Ordering::Release) != 1 {
            return false;
        }
        // Synchronize with every other release before tearing down
        fence(Ordering::Acquire);
        self.registry.destroy(&self.cell);
        true
    }
}

impl Clone for ResourceHandle {
    fn clone(&self) -> Self {
        // We hold a count, so the cell cannot be dying
        self.cell.ref_count.fetch_add(1, Ordering::Relaxed);
        Self::from_counted(self.cell.clone(), self.registry.clone())
    }
}

impl Drop for ResourceHandle {
    fn drop(&mut self) {
        self.release_ref();
    }
}

impl fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("identifier", &self.cell.identifier)
            .field("size", &self.cell.size)
            .field("ref_count", &self.ref_count())
            .finish()
    }
}
