//! Integration tests for glTF mesh loading.

use std::path::Path;

use ember_assets::load_gltf_meshes;

#[test]
fn test_load_gltf_meshes() {
    // Path to the test glTF file
    let mesh_path = Path::new("../../assets/basicmesh.glb");

    // Skip test if file doesn't exist (CI environment may not have assets)
    if !mesh_path.exists() {
        println!("Skipping test: mesh file not found at {:?}", mesh_path);
        return;
    }

    let meshes = load_gltf_meshes(mesh_path).expect("Failed to load glTF meshes");

    assert!(!meshes.is_empty(), "File should contain at least one mesh");

    for (i, mesh) in meshes.iter().enumerate() {
        assert!(!mesh.vertices.is_empty(), "Mesh {} should have vertices", i);
        assert!(!mesh.indices.is_empty(), "Mesh {} should have indices", i);
        assert!(!mesh.surfaces.is_empty(), "Mesh {} should have surfaces", i);

        // Every index must fall inside the vertex stream
        let vertex_count = mesh.vertices.len() as u32;
        assert!(
            mesh.indices.iter().all(|&idx| idx < vertex_count),
            "Mesh {} has out-of-range indices",
            i
        );

        // Surface ranges must cover a prefix-free partition of the indices
        for surface in &mesh.surfaces {
            assert!(
                (surface.start_index + surface.count) as usize <= mesh.indices.len(),
                "Mesh {} has a surface range past the index stream",
                i
            );
        }
    }

    println!("Loaded {} mesh(es)", meshes.len());
    for mesh in &meshes {
        println!(
            "  '{}': {} vertices, {} triangles, {} surfaces",
            mesh.name,
            mesh.vertex_count(),
            mesh.triangle_count(),
            mesh.surfaces.len()
        );
    }
}
