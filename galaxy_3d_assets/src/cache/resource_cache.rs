/// Bounded FIFO cache in front of the resource registry.
///
/// One instance per resource kind. Every entry holds its own registry count,
/// so a cached resource stays alive until it is evicted, cleared, or the
/// cache shuts down.
///
/// Eviction is FIFO (oldest insertion first): O(1) eviction, O(n) lookup.
/// Counts given back on eviction/clear are released after the cache lock is
/// dropped, so a destructor never runs under it.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use crate::error::{Galaxy3dError, Galaxy3dResult};
use crate::registry::ResourceHandle;

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entry_count: usize,
    pub max_entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Fraction of lookups that hit, 0.0 when nothing was looked up
    pub fn hit_rate(&self) -> f32 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f32 / lookups as f32
        }
    }
}

struct CacheState {
    entries: VecDeque<ResourceHandle>,
    max_entries: usize,
    hits: u64,
    misses: u64,
    initialized: bool,
}

/// Bounded, thread-safe FIFO cache of resource handles
pub struct ResourceCache {
    /// Log source, e.g. "galaxy3d::MeshCache"
    name: &'static str,
    state: Mutex<CacheState>,
}

impl ResourceCache {
    /// Create an uninitialized cache
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(CacheState {
                entries: VecDeque::new(),
                max_entries: 0,
                hits: 0,
                misses: 0,
                initialized: false,
            }),
        }
    }

    fn lock(&self) -> Galaxy3dResult<MutexGuard<'_, CacheState>> {
        self.state.lock().map_err(|_| {
            crate::engine_error!(self.name, "Cache lock poisoned, cache unusable");
            Galaxy3dError::LockPoisoned(self.name.to_string())
        })
    }

    fn lock_initialized(&self) -> Galaxy3dResult<MutexGuard<'_, CacheState>> {
        let state = self.lock()?;
        if !state.initialized {
            return Err(Galaxy3dError::InitializationFailed(format!("{} is not initialized", self.name)));
        }
        Ok(state)
    }

    /// Initialize with a capacity of `max_entries`
    ///
    /// Calling this on an initialized cache keeps the current capacity and
    /// contents and logs a warning.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `max_entries` is 0.
    pub fn initialize(&self, max_entries: usize) -> Galaxy3dResult<()> {
        if max_entries == 0 {
            crate::engine_warn!(self.name, "Refusing to initialize with max_entries = 0");
            return Err(Galaxy3dError::InvalidArgument("cache max_entries must be non-zero".to_string()));
        }

        let mut state = self.lock()?;
        if state.initialized {
            crate::engine_warn!(self.name,
                "Already initialized with {} entries, ignoring request for {}",
                state.max_entries, max_entries);
            return Ok(());
        }

        state.max_entries = max_entries;
        state.hits = 0;
        state.misses = 0;
        state.initialized = true;
        crate::engine_info!(self.name, "Initialized ({} entries)", max_entries);
        Ok(())
    }

    /// Initialize with `default_max_entries` unless already initialized
    pub fn ensure_initialized(&self, default_max_entries: usize) -> Galaxy3dResult<()> {
        if self.is_initialized()? {
            return Ok(());
        }
        match self.initialize(default_max_entries) {
            Ok(()) => Ok(()),
            // Another thread won the race
            Err(_) if self.is_initialized()? => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Whether `initialize` has been called since creation or the last shutdown
    pub fn is_initialized(&self) -> Galaxy3dResult<bool> {
        Ok(self.lock()?.initialized)
    }

    /// Look up `identifier`
    ///
    /// On a hit the returned handle carries its own count (cache and caller
    /// each hold one).
    pub fn get(&self, identifier: &str) -> Galaxy3dResult<Option<ResourceHandle>> {
        let mut state = self.lock_initialized()?;

        let found = state
            .entries
            .iter()
            .find(|entry| entry.identifier() == identifier)
            .cloned();

        match found {
            Some(handle) => {
                state.hits += 1;
                crate::engine_trace!(self.name, "Hit '{}'", identifier);
                Ok(Some(handle))
            }
            None => {
                state.misses += 1;
                crate::engine_trace!(self.name, "Miss '{}'", identifier);
                Ok(None)
            }
        }
    }

    /// Insert `handle` under its own identifier, evicting the oldest entry at capacity
    ///
    /// The cache acquires its own count on `handle`. Inserting an identifier
    /// that is already cached does nothing.
    pub fn put(&self, handle: &ResourceHandle) -> Galaxy3dResult<()> {
        let evicted = {
            let mut state = self.lock_initialized()?;

            if state.entries.iter().any(|entry| entry.identifier() == handle.identifier()) {
                return Ok(());
            }

            let evicted = if state.entries.len() >= state.max_entries {
                state.entries.pop_front()
            } else {
                None
            };

            state.entries.push_back(handle.clone());
            evicted
        };

        if let Some(entry) = evicted {
            crate::engine_trace!(self.name, "Evicted '{}'", entry.identifier());
            entry.release();
        }
        Ok(())
    }

    /// Release every held count and empty the cache
    ///
    /// The cache stays initialized; hit/miss counters are kept.
    pub fn clear(&self) -> Galaxy3dResult<()> {
        let entries = {
            let mut state = self.lock()?;
            std::mem::take(&mut state.entries)
        };
        let count = entries.len();
        drop(entries);
        crate::engine_debug!(self.name, "Cleared {} entries", count);
        Ok(())
    }

    /// Clear and return to the uninitialized state
    pub fn shutdown(&self) -> Galaxy3dResult<()> {
        let entries = {
            let mut state = self.lock()?;
            state.initialized = false;
            state.max_entries = 0;
            std::mem::take(&mut state.entries)
        };
        drop(entries);
        crate::engine_info!(self.name, "Shut down");
        Ok(())
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> Galaxy3dResult<CacheStats> {
        let state = self.lock()?;
        Ok(CacheStats {
            entry_count: state.entries.len(),
            max_entries: state.max_entries,
            hits: state.hits,
            misses: state.misses,
        })
    }

    /// Whether `identifier` is cached, without touching the counters
    pub fn contains(&self, identifier: &str) -> bool {
        self.lock()
            .map(|state| state.entries.iter().any(|entry| entry.identifier() == identifier))
            .unwrap_or(false)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "resource_cache_tests.rs"]
mod tests;
