//! Bounded per-kind resource caches

mod resource_cache;

pub use resource_cache::{ResourceCache, CacheStats};
