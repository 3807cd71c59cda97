//! Asset loading for the ember engine.
//!
//! This crate extracts CPU-side mesh data from glTF files. It knows
//! nothing about the GPU: the engine takes the extracted data and realizes
//! device-resident copies through its own upload path.

mod error;
mod mesh;

pub use error::{AssetError, AssetResult};
pub use mesh::{GeoSurface, MeshData, load_gltf_meshes};
