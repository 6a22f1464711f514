//! CPU-side mesh representation produced by the OBJ importer.

use std::ops::Range;

use bytemuck::{Pod, Zeroable};

/// Interleaved vertex: position, normal, uv and the owning material's
/// diffuse colour (white when the face has no material).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ObjVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tint: [f32; 3],
}

impl ObjVertex {
    pub const FLOATS: usize = 11;

    pub const LAYOUT: VertexLayout = VertexLayout {
        stride: Self::FLOATS * std::mem::size_of::<f32>(),
        attributes: &[
            VertexAttribute { location: 0, components: 3, offset: 0 },
            VertexAttribute { location: 1, components: 3, offset: 3 * 4 },
            VertexAttribute { location: 2, components: 2, offset: 6 * 4 },
            VertexAttribute { location: 3, components: 3, offset: 8 * 4 },
        ],
    };

    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2], tint: [f32; 3]) -> Self {
        Self {
            position,
            normal,
            uv,
            tint,
        }
    }
}

/// One float attribute inside an interleaved vertex.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub components: u32,
    /// Byte offset from the start of the vertex.
    pub offset: usize,
}

/// Describes how a flat float buffer is interleaved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexLayout {
    /// Bytes per vertex.
    pub stride: usize,
    pub attributes: &'static [VertexAttribute],
}

/// Surface description copied from an MTL library.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub name: String,
    /// `map_Kd`, relative to the OBJ file's directory.
    pub texture: Option<String>,
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub shininess: f32,
    /// Opacity, 1.0 is fully opaque.
    pub dissolve: f32,
    pub illum: i32,
}

impl Material {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            texture: None,
            ambient: [0.0; 3],
            diffuse: [1.0; 3],
            specular: [0.0; 3],
            shininess: 1.0,
            dissolve: 1.0,
            illum: 0,
        }
    }
}

/// Contiguous vertex range drawn with a single material.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Submesh {
    pub first_vertex: u32,
    pub vertex_count: u32,
    /// Index into [`ObjModel::materials`].
    pub material: usize,
}

impl Submesh {
    pub fn range(&self) -> Range<u32> {
        self.first_vertex..self.first_vertex + self.vertex_count
    }
}

/// Non-indexed triangle list with its material table.
///
/// Vertices are laid out material by material in increasing material
/// index, followed by the faces that reference no material.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjModel {
    pub vertices: Vec<ObjVertex>,
    pub materials: Vec<Material>,
    pub submeshes: Vec<Submesh>,
}

impl ObjModel {
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// A model without faces is valid, just nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Vertices reinterpreted as the flat interleaved float buffer.
    pub fn as_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Size of the vertex buffer in bytes.
    pub fn byte_size(&self) -> usize {
        self.vertices.len() * ObjVertex::LAYOUT.stride
    }

    /// Trailing range of faces that belong to no submesh.
    pub fn untagged_range(&self) -> Range<u32> {
        let tagged: u32 = self.submeshes.iter().map(|s| s.vertex_count).sum();
        tagged..self.vertices.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_is_eleven_tightly_packed_floats() {
        assert_eq!(std::mem::size_of::<ObjVertex>(), ObjVertex::LAYOUT.stride);
        assert_eq!(ObjVertex::LAYOUT.stride, 44);

        let model = ObjModel {
            vertices: vec![ObjVertex::default(); 3],
            ..ObjModel::default()
        };
        assert_eq!(model.as_floats().len(), 3 * ObjVertex::FLOATS);
        assert_eq!(model.byte_size(), 132);
    }

    #[test]
    fn untagged_range_covers_what_submeshes_leave() {
        let model = ObjModel {
            vertices: vec![ObjVertex::default(); 9],
            materials: vec![Material::named("a")],
            submeshes: vec![Submesh {
                first_vertex: 0,
                vertex_count: 6,
                material: 0,
            }],
        };
        assert_eq!(model.untagged_range(), 6..9);
        assert_eq!(model.submeshes[0].range(), 0..6);
    }
}
