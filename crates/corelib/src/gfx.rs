//! Graphics-device seam. The core only ever talks to the GPU through
//! [`GraphicsDevice`]; the wgpu implementation lives in the renderer crate.

use asset::VertexLayout;
use asset::texture::TextureData;

use crate::{Mat4, Vec3};

/// Uploaded vertex buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GpuMeshId(pub u32);

/// Uploaded texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Draw-call sink plus one-time resource creation.
///
/// Binding state persists between calls until overwritten, the way a
/// GL context does.
pub trait GraphicsDevice {
    /// Upload an interleaved float buffer laid out as `layout` describes.
    fn upload_vertices(&mut self, label: &str, vertices: &[f32], layout: &VertexLayout) -> GpuMeshId;

    fn create_texture(&mut self, label: &str, texture: &TextureData) -> TextureId;

    fn bind_mesh(&mut self, mesh: GpuMeshId);

    /// `None` binds the default opaque white texture.
    fn bind_texture(&mut self, texture: Option<TextureId>);

    fn set_transform(&mut self, model: Mat4);

    fn set_material(&mut self, color: Vec3, alpha: f32);

    /// Draw `vertex_count` vertices of the bound mesh as triangles.
    fn draw_triangles(&mut self, first_vertex: u32, vertex_count: u32);
}

/// Everything a [`RecordingDevice`] was asked to do.
#[derive(Clone, Debug, PartialEq)]
pub enum GfxCommand {
    Upload {
        label: String,
        floats: usize,
        stride: usize,
    },
    CreateTexture {
        label: String,
        width: u32,
        height: u32,
    },
    BindMesh(GpuMeshId),
    BindTexture(Option<TextureId>),
    SetTransform(Mat4),
    SetMaterial {
        color: Vec3,
        alpha: f32,
    },
    Draw {
        first_vertex: u32,
        vertex_count: u32,
    },
}

/// Headless device that records commands instead of touching a GPU.
/// Used by tests and by tools that only need the CPU side.
#[derive(Debug, Default)]
pub struct RecordingDevice {
    pub commands: Vec<GfxCommand>,
    next_mesh: u32,
    next_texture: u32,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upload_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, GfxCommand::Upload { .. }))
            .count()
    }

    pub fn texture_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, GfxCommand::CreateTexture { .. }))
            .count()
    }

    /// `(first_vertex, vertex_count)` of every draw, in order.
    pub fn draws(&self) -> Vec<(u32, u32)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                GfxCommand::Draw {
                    first_vertex,
                    vertex_count,
                } => Some((*first_vertex, *vertex_count)),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl GraphicsDevice for RecordingDevice {
    fn upload_vertices(&mut self, label: &str, vertices: &[f32], layout: &VertexLayout) -> GpuMeshId {
        self.commands.push(GfxCommand::Upload {
            label: label.to_string(),
            floats: vertices.len(),
            stride: layout.stride,
        });
        self.next_mesh += 1;
        GpuMeshId(self.next_mesh)
    }

    fn create_texture(&mut self, label: &str, texture: &TextureData) -> TextureId {
        self.commands.push(GfxCommand::CreateTexture {
            label: label.to_string(),
            width: texture.width,
            height: texture.height,
        });
        self.next_texture += 1;
        TextureId(self.next_texture)
    }

    fn bind_mesh(&mut self, mesh: GpuMeshId) {
        self.commands.push(GfxCommand::BindMesh(mesh));
    }

    fn bind_texture(&mut self, texture: Option<TextureId>) {
        self.commands.push(GfxCommand::BindTexture(texture));
    }

    fn set_transform(&mut self, model: Mat4) {
        self.commands.push(GfxCommand::SetTransform(model));
    }

    fn set_material(&mut self, color: Vec3, alpha: f32) {
        self.commands.push(GfxCommand::SetMaterial { color, alpha });
    }

    fn draw_triangles(&mut self, first_vertex: u32, vertex_count: u32) {
        self.commands.push(GfxCommand::Draw {
            first_vertex,
            vertex_count,
        });
    }
}
