//! Background compute effects.
//!
//! The first pass of every frame fills the draw image with a compute
//! shader. Several effects are compiled at startup; all share one
//! pipeline layout (the draw-image storage descriptor plus a push
//! constant block), so switching effects is just binding a different
//! pipeline.

use bytemuck::{Pod, Zeroable};
use glam::Vec4;

use ember_rhi::pipeline::Pipeline;

/// Push constant block handed to every background effect.
///
/// Four generic vectors; each effect interprets them its own way (the
/// gradient uses data1/data2 as its two colors, the sky uses data1 as
/// color and star threshold).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct ComputePushConstants {
    pub data1: Vec4,
    pub data2: Vec4,
    pub data3: Vec4,
    pub data4: Vec4,
}

impl ComputePushConstants {
    /// Size of the push constant block in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();
}

/// One background effect: a compute pipeline plus its push data.
pub struct ComputeEffect {
    /// Display name of the effect.
    pub name: &'static str,
    /// The effect's compute pipeline (layout is shared across effects).
    pub pipeline: Pipeline,
    /// Push constant data fed to the shader each dispatch.
    pub data: ComputePushConstants,
}

/// The list of compiled background effects and the active selection.
pub struct BackgroundEffects {
    effects: Vec<ComputeEffect>,
    current: usize,
}

impl BackgroundEffects {
    /// Wraps a non-empty list of compiled effects; the first one starts
    /// active.
    pub fn new(effects: Vec<ComputeEffect>) -> Self {
        assert!(!effects.is_empty(), "at least one background effect is required");
        Self {
            effects,
            current: 0,
        }
    }

    /// Returns the active effect.
    #[inline]
    pub fn current_effect(&self) -> &ComputeEffect {
        &self.effects[self.current]
    }

    /// Returns the active effect mutably (for editing its push data).
    #[inline]
    pub fn current_effect_mut(&mut self) -> &mut ComputeEffect {
        &mut self.effects[self.current]
    }

    /// Returns the index of the active effect.
    #[inline]
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Returns the number of effects.
    #[inline]
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// Returns true if no effects are loaded. Always false after
    /// construction.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Selects an effect by index.
    ///
    /// Out-of-range indices are clamped to the last effect: the index is
    /// user-facing state, so a stale value degrades instead of crashing.
    pub fn set_current(&mut self, index: usize) {
        self.current = clamp_index(index, self.effects.len());
    }

    /// Advances to the next effect, wrapping at the end of the list.
    pub fn cycle(&mut self) {
        self.current = next_index(self.current, self.effects.len());
    }
}

/// Clamps a requested effect index into `0..len`.
fn clamp_index(index: usize, len: usize) -> usize {
    index.min(len - 1)
}

/// Next index with wraparound.
fn next_index(index: usize, len: usize) -> usize {
    (index + 1) % len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_constants_size() {
        // Four Vec4s, tightly packed
        assert_eq!(ComputePushConstants::SIZE, 64);
    }

    #[test]
    fn test_push_constants_are_pod() {
        let data = ComputePushConstants {
            data1: Vec4::new(1.0, 0.0, 0.0, 1.0),
            data2: Vec4::new(0.0, 0.0, 1.0, 1.0),
            ..Default::default()
        };

        let bytes = bytemuck::bytes_of(&data);
        assert_eq!(bytes.len(), 64);
    }

    #[test]
    fn test_clamp_index_clamps_out_of_range() {
        assert_eq!(clamp_index(5, 2), 1);
        assert_eq!(clamp_index(1, 2), 1);
        assert_eq!(clamp_index(0, 2), 0);
    }

    #[test]
    fn test_next_index_wraps() {
        assert_eq!(next_index(0, 2), 1);
        assert_eq!(next_index(1, 2), 0);
        assert_eq!(next_index(0, 1), 0);
    }
}
