//! Decoded texture data.
//!
//! `TextureData` is a single 2D image already decoded by an image parser.
//! Pixels are tightly packed rows, top row first.

use crate::config::IdentityMode;
use crate::error::{Galaxy3dError, Galaxy3dResult};
use crate::engine_bail;
use super::identity::ContentHasher;
use super::loader::{LoadableResource, ResourceKind, ResourceLoader, ResourceLoaders};

const SOURCE: &str = "galaxy3d::TextureData";

/// Pixel layout of decoded texture data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    R8,
    Rg8,
    Rgb8,
    Rgba8,
    Rgba16F,
    Rgba32F,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::R8 => 1,
            PixelFormat::Rg8 => 2,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
            PixelFormat::Rgba16F => 8,
            PixelFormat::Rgba32F => 16,
        }
    }

    fn tag(self) -> u32 {
        self as u32
    }
}

/// Decoded texture payload
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    /// Image path or URI, logging only
    pub source: Option<String>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixels: Vec<u8>,
}

impl TextureData {
    pub fn new(width: u32, height: u32, format: PixelFormat, pixels: Vec<u8>) -> Self {
        Self {
            source: None,
            width,
            height,
            format,
            pixels,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Byte size implied by width, height and format (`None` on overflow)
    pub fn expected_len(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(self.format.bytes_per_pixel())
    }
}

impl LoadableResource for TextureData {
    const KIND: ResourceKind = ResourceKind::Texture;

    fn loader(loaders: &ResourceLoaders) -> &ResourceLoader<Self> {
        &loaders.textures
    }

    fn validate(&self) -> Galaxy3dResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Galaxy3dError::InvalidArgument(format!(
                "texture {:?} has zero size ({}x{})", self.source, self.width, self.height)));
        }

        let Some(expected) = self.expected_len() else {
            engine_bail!(SOURCE, "Texture {:?}: {}x{} overflows", self.source, self.width, self.height);
        };
        if self.pixels.len() != expected {
            engine_bail!(SOURCE,
                "Texture {:?}: {} bytes of pixel data, expected {} for {}x{} {:?}",
                self.source, self.pixels.len(), expected, self.width, self.height, self.format);
        }
        Ok(())
    }

    /// Dimensions, format and every pixel byte; `mode` does not apply
    fn identifier(&self, _mode: IdentityMode) -> String {
        let mut hasher = ContentHasher::new(Self::KIND.prefix());
        hasher.write_u32(self.width);
        hasher.write_u32(self.height);
        hasher.write_u32(self.format.tag());
        hasher.write_slice(&self.pixels, IdentityMode::Full);
        hasher.finish()
    }

    fn byte_size(&self) -> usize {
        self.pixels.len()
    }

    fn duplicate(&self) -> Galaxy3dResult<Self> {
        let mut pixels = Vec::new();
        pixels.try_reserve_exact(self.pixels.len())?;
        pixels.extend_from_slice(&self.pixels);

        Ok(Self {
            source: self.source.clone(),
            width: self.width,
            height: self.height,
            format: self.format,
            pixels,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
