//! Error types for the Galaxy3D asset subsystem
//!
//! This module defines the error types used by the registry, the caches,
//! the per-kind loaders and the async task queue.

use std::fmt;

/// Result type for Galaxy3D asset operations
pub type Galaxy3dResult<T> = std::result::Result<T, Galaxy3dError>;

/// Galaxy3D asset errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Galaxy3dError {
    /// Null-equivalent or zero-sized argument (empty identifier, zero capacity, ...)
    InvalidArgument(String),

    /// Allocation failed while deep-copying a payload
    OutOfMemory,

    /// Source data failed validation (index out of range, size mismatch, ...)
    InvalidResource(String),

    /// Subsystem used before initialization, or failed to start
    InitializationFailed(String),

    /// A live registry entry already exists for this identifier
    AlreadyExists(String),

    /// A lock was poisoned by a panicking thread; the owning object is unusable
    LockPoisoned(String),

    /// The async work queue reached its configured depth
    QueueFull(usize),

    /// The async loader has been shut down
    ShutDown,
}

impl fmt::Display for Galaxy3dError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Galaxy3dError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Galaxy3dError::OutOfMemory => write!(f, "Out of memory"),
            Galaxy3dError::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Galaxy3dError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Galaxy3dError::AlreadyExists(id) => write!(f, "Resource already exists: {}", id),
            Galaxy3dError::LockPoisoned(what) => write!(f, "Lock poisoned: {}", what),
            Galaxy3dError::QueueFull(depth) => write!(f, "Work queue full ({} tasks)", depth),
            Galaxy3dError::ShutDown => write!(f, "Async loader shut down"),
        }
    }
}

impl std::error::Error for Galaxy3dError {}

impl From<std::collections::TryReserveError> for Galaxy3dError {
    fn from(_: std::collections::TryReserveError) -> Self {
        Galaxy3dError::OutOfMemory
    }
}

// ===== ERROR MACROS =====

/// Log an ERROR and build a `Galaxy3dError::InvalidResource` from a format string
///
/// # Example
///
/// ```ignore
/// let err = engine_err!("galaxy3d::MeshData", "index {} out of range", idx);
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        $crate::galaxy3d::Galaxy3dError::InvalidResource(message)
    }};
}

/// Log an ERROR and return `Err(Galaxy3dError::InvalidResource(..))` from the current function
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
