//! Resource kinds and their loaders
//!
//! Decoded mesh, texture and material data, plus the per-kind loaders that
//! deduplicate them through the registry.

mod identity;
mod loader;
pub mod mesh;
pub mod texture;
pub mod material;

pub use loader::{
    LoadableResource, Loaded, ReleaseHook,
    ResourceKind, ResourceLoader, ResourceLoaders,
};
pub use mesh::{MeshData, Vertex, Aabb};
pub use texture::{TextureData, PixelFormat};
pub use material::{MaterialData, MaterialFlags, AlphaMode};
