/*!
# Galaxy 3D Assets

Asynchronous asset loading and reference-counted caching for the Galaxy 3D
engine.

Format parsers hand decoded data (vertex/index arrays, pixel buffers,
material parameter blocks) to this crate; it deduplicates identical content
across the scene and hands back refcounted handles. It never talks to the
graphics device.

## Architecture

- **ResourceRegistry**: shared table of live resources keyed by content identifier
- **ResourceHandle**: RAII count on a registry entry, destructor runs exactly once
- **ResourceCache**: bounded FIFO cache per resource kind
- **ResourceLoader**: cache -> registry -> create resolution per kind
- **AsyncLoader**: priority work queue, worker pool and thread-confined drain
- **AssetManager**: owns all of the above
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod config;
pub mod registry;
pub mod cache;
pub mod resource;
pub mod async_loader;
pub mod asset_manager;

// Main galaxy3d namespace module
pub mod galaxy3d {
    // Error types
    pub use crate::error::{Galaxy3dError, Galaxy3dResult};

    // Engine singleton (logging)
    pub use crate::engine::Engine;

    // Configuration
    pub use crate::config::{AssetConfig, AsyncConfig, IdentityMode};

    // Asset manager
    pub use crate::asset_manager::AssetManager;

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Registry sub-module
    pub mod registry {
        pub use crate::registry::*;
    }

    // Cache sub-module
    pub mod cache {
        pub use crate::cache::*;
    }

    // Resource sub-module
    pub mod resource {
        pub use crate::resource::*;
    }

    // Async sub-module
    pub mod async_loader {
        pub use crate::async_loader::*;
    }
}

// Re-export math library at crate root
pub use glam;
