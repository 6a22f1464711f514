//! Asset loading/parsers (meshes, materials, textures).
//! OBJ meshes are flattened into triangle lists grouped by material,
//! MTL libraries supply the material table, textures decode to RGBA8.

pub mod error;
pub mod mesh;
pub mod mtl;
pub mod obj;
pub mod texture;

pub use error::{ImportError, ImportResult};
pub use mesh::{Material, ObjModel, ObjVertex, Submesh, VertexAttribute, VertexLayout};
