/// Content identity hashing.
///
/// Identifiers look like `mesh:3f2a9c0d1e4b5a67`: a kind prefix followed by a
/// 64-bit FxHash digest. FxHash is deterministic across runs and platforms
/// of the same endianness, which is all deduplication needs. It is not a
/// cryptographic digest.

use std::hash::Hasher;
use bytemuck::Pod;
use rustc_hash::FxHasher;
use crate::config::IdentityMode;

/// Incremental identifier builder
pub(crate) struct ContentHasher {
    prefix: &'static str,
    hasher: FxHasher,
}

impl ContentHasher {
    pub(crate) fn new(prefix: &'static str) -> Self {
        let mut hasher = FxHasher::default();
        hasher.write(prefix.as_bytes());
        Self { prefix, hasher }
    }

    pub(crate) fn write_u32(&mut self, value: u32) {
        self.hasher.write_u32(value);
    }

    pub(crate) fn write_u64(&mut self, value: u64) {
        self.hasher.write_u64(value);
    }

    /// Floats hash by bit pattern (0.0 and -0.0 differ)
    pub(crate) fn write_f32(&mut self, value: f32) {
        self.hasher.write_u32(value.to_bits());
    }

    pub(crate) fn write_pod<T: Pod>(&mut self, value: &T) {
        self.hasher.write(bytemuck::bytes_of(value));
    }

    pub(crate) fn write_optional_index(&mut self, index: Option<u32>) {
        match index {
            Some(i) => {
                self.hasher.write_u8(1);
                self.hasher.write_u32(i);
            }
            None => self.hasher.write_u8(0),
        }
    }

    /// Hash the element count and the elements selected by `mode`
    pub(crate) fn write_slice<T: Pod>(&mut self, elements: &[T], mode: IdentityMode) {
        self.write_u64(elements.len() as u64);
        match mode {
            IdentityMode::Full => {
                self.hasher.write(bytemuck::cast_slice(elements));
            }
            IdentityMode::Sampled { samples } => {
                for index in sample_indices(elements.len(), samples) {
                    self.write_pod(&elements[index]);
                }
            }
        }
    }

    pub(crate) fn finish(self) -> String {
        format!("{}:{:016x}", self.prefix, self.hasher.finish())
    }
}

/// Indices of up to `samples` evenly spaced elements, always including the last
pub(crate) fn sample_indices(len: usize, samples: usize) -> Vec<usize> {
    if len == 0 || samples == 0 {
        return Vec::new();
    }
    if len <= samples {
        return (0..len).collect();
    }

    let stride = len / samples;
    let mut indices: Vec<usize> = (0..samples).map(|i| i * stride).collect();
    if indices.last() != Some(&(len - 1)) {
        indices.push(len - 1);
    }
    indices
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[path = "identity_tests.rs"]
mod tests;
