//! Decoded mesh data.
//!
//! `MeshData` is what a format parser (GLTF, OBJ, ...) hands to the loader:
//! an interleaved vertex array plus an optional `u32` index array.
//! No GPU buffers exist at this level.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use crate::config::IdentityMode;
use crate::error::{Galaxy3dError, Galaxy3dResult};
use crate::engine_bail;
use super::identity::ContentHasher;
use super::loader::{LoadableResource, ResourceKind, ResourceLoader, ResourceLoaders};

const SOURCE: &str = "galaxy3d::MeshData";

// ============================================================================
// VERTEX
// ============================================================================

/// Interleaved vertex (position, normal, texture coordinate)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self { position, normal, uv }
    }
}

// ============================================================================
// AABB
// ============================================================================

/// Axis-aligned bounding box in mesh space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }
}

// ============================================================================
// MESH DATA
// ============================================================================

/// Decoded mesh payload
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    /// Where the mesh came from (file path, node name). Logging only: two
    /// meshes with different sources but identical content deduplicate.
    pub source: Option<String>,
    pub vertices: Vec<Vertex>,
    /// Empty for non-indexed meshes
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            source: None,
            vertices,
            indices,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn is_indexed(&self) -> bool {
        !self.indices.is_empty()
    }

    /// Triangle count assuming a triangle list
    pub fn triangle_count(&self) -> usize {
        if self.is_indexed() {
            self.indices.len() / 3
        } else {
            self.vertices.len() / 3
        }
    }

    /// Bounds of all vertex positions, `None` for an empty mesh
    pub fn bounds(&self) -> Option<Aabb> {
        let first = Vec3::from_array(self.vertices.first()?.position);
        let (min, max) = self.vertices.iter().skip(1).fold((first, first), |(min, max), v| {
            let p = Vec3::from_array(v.position);
            (min.min(p), max.max(p))
        });
        Some(Aabb { min, max })
    }
}

impl LoadableResource for MeshData {
    const KIND: ResourceKind = ResourceKind::Mesh;

    fn loader(loaders: &ResourceLoaders) -> &ResourceLoader<Self> {
        &loaders.meshes
    }

    fn validate(&self) -> Galaxy3dResult<()> {
        if self.vertices.is_empty() {
            return Err(Galaxy3dError::InvalidArgument("mesh has no vertices".to_string()));
        }

        let vertex_count = self.vertices.len();
        if let Some(bad) = self.indices.iter().find(|&&i| i as usize >= vertex_count) {
            engine_bail!(SOURCE,
                "Mesh {:?}: index {} out of range ({} vertices)",
                self.source, bad, vertex_count);
        }

        if let Some(v) = self.vertices.iter().find(|v| !v.position.iter().all(|c| c.is_finite())) {
            engine_bail!(SOURCE,
                "Mesh {:?}: non-finite vertex position {:?}", self.source, v.position);
        }
        Ok(())
    }

    /// Counts plus (sampled or full) vertex and index contents
    fn identifier(&self, mode: IdentityMode) -> String {
        let mut hasher = ContentHasher::new(Self::KIND.prefix());
        hasher.write_slice(&self.vertices, mode);
        hasher.write_slice(&self.indices, mode);
        hasher.finish()
    }

    fn byte_size(&self) -> usize {
        self.vertices.len() * std::mem::size_of::<Vertex>()
            + self.indices.len() * std::mem::size_of::<u32>()
    }

    fn duplicate(&self) -> Galaxy3dResult<Self> {
        // Source buffers may be transient: copy each one independently
        let mut vertices = Vec::new();
        vertices.try_reserve_exact(self.vertices.len())?;
        vertices.extend_from_slice(&self.vertices);

        let mut indices = Vec::new();
        indices.try_reserve_exact(self.indices.len())?;
        indices.extend_from_slice(&self.indices);

        Ok(Self {
            source: self.source.clone(),
            vertices,
            indices,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "mesh_tests.rs"]
mod tests;
