//! Vertex data structures.
//!
//! This module defines the vertex format shared by the CPU-side loaders
//! and the GPU-side shaders. Vertices are not consumed through
//! fixed-function vertex input; the mesh vertex shader reads them from a
//! storage buffer through its device address, so only the memory layout
//! matters.

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

/// Standard vertex format for mesh rendering.
///
/// # Memory Layout
///
/// The UV coordinates are interleaved after each Vec3 so the struct packs
/// to GLSL std430 rules without padding:
/// - Offset 0: position (12 bytes)
/// - Offset 12: uv_x (4 bytes)
/// - Offset 16: normal (12 bytes)
/// - Offset 28: uv_y (4 bytes)
/// - Offset 32: color (16 bytes)
/// - Total size: 48 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct Vertex {
    /// 3D position in object space.
    pub position: Vec3,
    /// First texture coordinate.
    pub uv_x: f32,
    /// Surface normal vector.
    pub normal: Vec3,
    /// Second texture coordinate.
    pub uv_y: f32,
    /// Vertex color (RGBA).
    pub color: Vec4,
}

impl Vertex {
    /// Size of one vertex in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Creates a new vertex.
    #[inline]
    pub const fn new(position: Vec3, normal: Vec3, uv: [f32; 2], color: Vec4) -> Self {
        Self {
            position,
            uv_x: uv[0],
            normal,
            uv_y: uv[1],
            color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::offset_of;

    #[test]
    fn test_vertex_size() {
        assert_eq!(Vertex::SIZE, 48);
    }

    #[test]
    fn test_vertex_field_offsets() {
        assert_eq!(offset_of!(Vertex, position), 0);
        assert_eq!(offset_of!(Vertex, uv_x), 12);
        assert_eq!(offset_of!(Vertex, normal), 16);
        assert_eq!(offset_of!(Vertex, uv_y), 28);
        assert_eq!(offset_of!(Vertex, color), 32);
    }

    #[test]
    fn test_vertex_is_pod() {
        // A Pod round trip through bytes must preserve the vertex
        let vertex = Vertex::new(
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(0.0, 1.0, 0.0),
            [0.5, 0.25],
            Vec4::new(1.0, 0.0, 0.0, 1.0),
        );

        let bytes = bytemuck::bytes_of(&vertex);
        assert_eq!(bytes.len(), Vertex::SIZE);

        let restored: Vertex = *bytemuck::from_bytes(bytes);
        assert_eq!(restored.position, vertex.position);
        assert_eq!(restored.uv_x, vertex.uv_x);
        assert_eq!(restored.uv_y, vertex.uv_y);
        assert_eq!(restored.color, vertex.color);
    }
}
