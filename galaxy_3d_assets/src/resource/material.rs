/// Decoded material parameters.
///
/// A metallic-roughness parameter block as produced by a scene parser.
/// Textures are referenced by index into the owning scene's texture list;
/// the material itself owns no texture data.

use bitflags::bitflags;
use glam::{Vec3, Vec4};
use crate::config::IdentityMode;
use crate::error::Galaxy3dResult;
use crate::engine_bail;
use super::identity::ContentHasher;
use super::loader::{LoadableResource, ResourceKind, ResourceLoader, ResourceLoaders};

const SOURCE: &str = "galaxy3d::MaterialData";

bitflags! {
    /// Render-state flags carried by a material
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MaterialFlags: u32 {
        const DOUBLE_SIDED = 1 << 0;
        const UNLIT        = 1 << 1;
    }
}

/// How alpha is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AlphaMode {
    #[default]
    Opaque,
    /// Fragments below `alpha_cutoff` are discarded
    Mask,
    Blend,
}

/// Decoded material payload
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialData {
    /// Material name from the source file, logging only
    pub name: Option<String>,

    pub base_color_factor: Vec4,
    pub metallic_factor: f32,
    pub roughness_factor: f32,
    pub emissive_factor: Vec3,
    pub normal_scale: f32,
    pub occlusion_strength: f32,
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: f32,
    pub flags: MaterialFlags,

    pub base_color_texture: Option<u32>,
    pub metallic_roughness_texture: Option<u32>,
    pub normal_texture: Option<u32>,
    pub occlusion_texture: Option<u32>,
    pub emissive_texture: Option<u32>,
}

impl Default for MaterialData {
    fn default() -> Self {
        Self {
            name: None,
            base_color_factor: Vec4::ONE,
            metallic_factor: 1.0,
            roughness_factor: 1.0,
            emissive_factor: Vec3::ZERO,
            normal_scale: 1.0,
            occlusion_strength: 1.0,
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: 0.5,
            flags: MaterialFlags::empty(),
            base_color_texture: None,
            metallic_roughness_texture: None,
            normal_texture: None,
            occlusion_texture: None,
            emissive_texture: None,
        }
    }
}

impl MaterialData {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn is_double_sided(&self) -> bool {
        self.flags.contains(MaterialFlags::DOUBLE_SIDED)
    }

    /// Texture slots in declaration order
    pub fn texture_indices(&self) -> [Option<u32>; 5] {
        [
            self.base_color_texture,
            self.metallic_roughness_texture,
            self.normal_texture,
            self.occlusion_texture,
            self.emissive_texture,
        ]
    }
}

impl LoadableResource for MaterialData {
    const KIND: ResourceKind = ResourceKind::Material;

    fn loader(loaders: &ResourceLoaders) -> &ResourceLoader<Self> {
        &loaders.materials
    }

    fn validate(&self) -> Galaxy3dResult<()> {
        let finite = self.base_color_factor.is_finite()
            && self.emissive_factor.is_finite()
            && [
                self.metallic_factor,
                self.roughness_factor,
                self.normal_scale,
                self.occlusion_strength,
                self.alpha_cutoff,
            ]
            .iter()
            .all(|f| f.is_finite());
        if !finite {
            engine_bail!(SOURCE, "Material {:?}: non-finite factor", self.name);
        }

        let unit_range = [
            ("metallic_factor", self.metallic_factor),
            ("roughness_factor", self.roughness_factor),
            ("occlusion_strength", self.occlusion_strength),
        ];
        for (field, value) in unit_range {
            if !(0.0..=1.0).contains(&value) {
                engine_bail!(SOURCE, "Material {:?}: {} = {} outside [0, 1]", self.name, field, value);
            }
        }

        if self.alpha_cutoff < 0.0 {
            engine_bail!(SOURCE, "Material {:?}: negative alpha_cutoff {}", self.name, self.alpha_cutoff);
        }
        Ok(())
    }

    /// Every factor, mode, flag and texture index; `mode` is irrelevant for
    /// a fixed-size parameter block
    fn identifier(&self, _mode: IdentityMode) -> String {
        let mut hasher = ContentHasher::new(Self::KIND.prefix());
        hasher.write_pod(&self.base_color_factor);
        hasher.write_f32(self.metallic_factor);
        hasher.write_f32(self.roughness_factor);
        hasher.write_pod(&self.emissive_factor);
        hasher.write_f32(self.normal_scale);
        hasher.write_f32(self.occlusion_strength);
        hasher.write_u32(self.alpha_mode as u32);
        hasher.write_f32(self.alpha_cutoff);
        hasher.write_u32(self.flags.bits());
        for index in self.texture_indices() {
            hasher.write_optional_index(index);
        }
        hasher.finish()
    }

    fn byte_size(&self) -> usize {
        std::mem::size_of::<Self>()
    }

    fn duplicate(&self) -> Galaxy3dResult<Self> {
        Ok(self.clone())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "material_tests.rs"]
mod tests;
