//! GPU-resident mesh data.
//!
//! [`GpuMeshBuffers`] is what the engine's upload path produces from a
//! CPU-side vertex/index stream: a device-local index buffer, a
//! device-local vertex buffer, and the vertex buffer's device address for
//! shader-side vertex pulling. [`MeshAsset`] pairs those buffers with the
//! draw ranges extracted by the asset loader and is shared via `Arc`,
//! since multiple draw calls may reference the same uploaded mesh.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use ash::vk;
use ember_assets::GeoSurface;
use ember_rhi::buffer::Buffer;
use ember_rhi::vertex::Vertex;

/// GPU buffers backing one uploaded mesh.
pub struct GpuMeshBuffers {
    /// Device-local index buffer.
    pub index_buffer: Buffer,
    /// Device-local vertex buffer (storage buffer with a device address).
    pub vertex_buffer: Buffer,
    /// Device address of the vertex buffer, pushed to the mesh shader.
    pub vertex_buffer_address: vk::DeviceAddress,
}

/// An uploaded mesh shared across draw calls.
///
/// Destroyed when the last `Arc` reference drops, at or after shutdown.
pub struct MeshAsset {
    /// Mesh name from the source file.
    pub name: String,
    /// Draw ranges into the index buffer.
    pub surfaces: Vec<GeoSurface>,
    /// GPU-resident buffers.
    pub buffers: GpuMeshBuffers,
}

/// Push constants for the mesh pipeline.
///
/// The trailing padding keeps the struct free of implicit padding so it
/// can be byte-cast; the shader only reads the first 72 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GpuDrawPushConstants {
    /// World-view-projection matrix.
    pub world_matrix: Mat4,
    /// Device address of the vertex buffer to pull from.
    pub vertex_buffer: vk::DeviceAddress,
    pub _padding: u64,
}

impl GpuDrawPushConstants {
    /// Size of the push constant block in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Creates push constants for one draw.
    pub fn new(world_matrix: Mat4, vertex_buffer: vk::DeviceAddress) -> Self {
        Self {
            world_matrix,
            vertex_buffer,
            _padding: 0,
        }
    }
}

/// Byte sizes of the vertex and index buffers for a mesh of the given
/// dimensions.
pub fn mesh_buffer_sizes(vertex_count: usize, index_count: usize) -> (u64, u64) {
    (
        (vertex_count * Vertex::SIZE) as u64,
        (index_count * std::mem::size_of::<u32>()) as u64,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_buffer_sizes() {
        // 4 vertices of 48 bytes, 6 indices of 4 bytes
        let (vertex_bytes, index_bytes) = mesh_buffer_sizes(4, 6);
        assert_eq!(vertex_bytes, 192);
        assert_eq!(index_bytes, 24);
    }

    #[test]
    fn test_draw_push_constants_layout() {
        // mat4 + device address + padding, no implicit holes
        assert_eq!(GpuDrawPushConstants::SIZE, 80);

        let constants = GpuDrawPushConstants::new(Mat4::IDENTITY, 0xdead_beef);
        let bytes = bytemuck::bytes_of(&constants);
        assert_eq!(bytes.len(), 80);
    }
}
