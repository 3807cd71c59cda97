//! Mesh extraction from glTF files.
//!
//! Each glTF mesh becomes one [`MeshData`] with a single interleaved
//! vertex/index stream; every primitive of the mesh contributes one
//! [`GeoSurface`] draw range into that stream.

use std::path::Path;

use glam::{Vec3, Vec4};
use tracing::{debug, info};

use ember_rhi::vertex::Vertex;

use crate::error::{AssetError, AssetResult};

/// A draw range within a mesh's index stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoSurface {
    /// First index of this surface in the mesh's index stream.
    pub start_index: u32,
    /// Number of indices in this surface.
    pub count: u32,
}

/// CPU-side mesh data extracted from a glTF file.
///
/// The vertex and index streams cover all surfaces; each surface's
/// `start_index`/`count` selects its slice of the index stream.
#[derive(Debug, Default)]
pub struct MeshData {
    /// Mesh name from the glTF document.
    pub name: String,
    /// Draw ranges, one per glTF primitive.
    pub surfaces: Vec<GeoSurface>,
    /// Index stream (rebased across primitives).
    pub indices: Vec<u32>,
    /// Interleaved vertex stream.
    pub vertices: Vec<Vertex>,
}

impl MeshData {
    /// Returns the number of vertices in the mesh.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Returns the number of triangles in the mesh.
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Loads all meshes from a glTF (or GLB) file.
///
/// Extraction follows the same rules for every primitive:
/// - indices are rebased by the vertex count accumulated so far, so all
///   primitives share one vertex stream
/// - missing normals fall back to +X; missing UVs fall back to (0, 0)
/// - vertex colors are overridden with the normal, which makes shading
///   problems visible without any lighting code
///
/// # Arguments
///
/// * `path` - Path to the .gltf or .glb file
///
/// # Errors
///
/// Returns an error if the file cannot be parsed, contains no meshes, or
/// a primitive lacks position data.
pub fn load_gltf_meshes(path: &Path) -> AssetResult<Vec<MeshData>> {
    info!("Loading glTF: {}", path.display());

    let (document, buffers, _images) = gltf::import(path).map_err(|e| AssetError::GltfLoad {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut meshes = Vec::new();

    for mesh in document.meshes() {
        let mut mesh_data = MeshData {
            name: mesh.name().unwrap_or("unnamed").to_string(),
            ..Default::default()
        };

        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|b| &b.0[..]));

            let positions: Vec<[f32; 3]> = reader
                .read_positions()
                .ok_or(AssetError::NoPositionData)?
                .collect();

            let initial_vertex = mesh_data.vertices.len() as u32;

            // Indices, rebased into the shared vertex stream
            let start_index = mesh_data.indices.len() as u32;
            match reader.read_indices() {
                Some(indices) => {
                    mesh_data
                        .indices
                        .extend(indices.into_u32().map(|i| i + initial_vertex));
                }
                None => {
                    // Non-indexed primitive: synthesize a trivial index stream
                    mesh_data
                        .indices
                        .extend((0..positions.len() as u32).map(|i| i + initial_vertex));
                }
            }
            let count = mesh_data.indices.len() as u32 - start_index;

            mesh_data.surfaces.push(GeoSurface { start_index, count });

            // Vertices, with fallbacks for missing attributes
            mesh_data.vertices.extend(positions.iter().map(|&p| {
                Vertex::new(Vec3::from(p), Vec3::X, [0.0, 0.0], Vec4::ONE)
            }));

            if let Some(normals) = reader.read_normals() {
                for (i, n) in normals.enumerate() {
                    mesh_data.vertices[initial_vertex as usize + i].normal = Vec3::from(n);
                }
            }

            if let Some(tex_coords) = reader.read_tex_coords(0) {
                for (i, uv) in tex_coords.into_f32().enumerate() {
                    let vertex = &mut mesh_data.vertices[initial_vertex as usize + i];
                    vertex.uv_x = uv[0];
                    vertex.uv_y = uv[1];
                }
            }
        }

        override_colors_with_normal(&mut mesh_data.vertices);

        debug!(
            "Mesh '{}': {} surfaces, {} vertices, {} triangles",
            mesh_data.name,
            mesh_data.surfaces.len(),
            mesh_data.vertex_count(),
            mesh_data.triangle_count()
        );

        meshes.push(mesh_data);
    }

    if meshes.is_empty() {
        return Err(AssetError::NoMeshes(path.to_path_buf()));
    }

    info!("Loaded {} mesh(es) from {}", meshes.len(), path.display());

    Ok(meshes)
}

/// Replaces every vertex color with its normal for debug display.
fn override_colors_with_normal(vertices: &mut [Vertex]) {
    for vertex in vertices {
        vertex.color = Vec4::new(vertex.normal.x, vertex.normal.y, vertex.normal.z, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_data_counts() {
        let mesh = MeshData {
            name: "quad".to_string(),
            surfaces: vec![GeoSurface {
                start_index: 0,
                count: 6,
            }],
            indices: vec![0, 1, 2, 2, 1, 3],
            vertices: vec![Vertex::default(); 4],
        };

        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn test_override_colors_with_normal() {
        let mut vertices = vec![Vertex::new(
            Vec3::ZERO,
            Vec3::new(0.0, 1.0, 0.0),
            [0.0, 0.0],
            Vec4::ONE,
        )];

        override_colors_with_normal(&mut vertices);

        assert_eq!(vertices[0].color, Vec4::new(0.0, 1.0, 0.0, 1.0));
    }

    #[test]
    fn test_surface_ranges_are_disjoint() {
        // Two primitives of 6 indices each should produce back-to-back ranges
        let surfaces = [
            GeoSurface {
                start_index: 0,
                count: 6,
            },
            GeoSurface {
                start_index: 6,
                count: 6,
            },
        ];

        assert_eq!(surfaces[0].start_index + surfaces[0].count, surfaces[1].start_index);
    }
}
