//! GPU-side uniform blocks and vertex layout translation.

use asset::VertexLayout;
use bytemuck::{Pod, Zeroable};
use corelib::{Mat4, RenderView, Vec3};
use wgpu::{VertexAttribute, VertexFormat};

/// Fixed point light.
pub const LIGHT_POS: Vec3 = Vec3::new(1.0, 1.0, 1.0);
pub const LIGHT_COLOR: Vec3 = Vec3::ONE;

/// Per-frame block, group 0.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GlobalsUniform {
    pub proj_view: [[f32; 4]; 4],
    pub view_pos: [f32; 4],
    pub light_pos: [f32; 4],
    pub light_color: [f32; 4],
}

impl GlobalsUniform {
    pub fn new(view: &RenderView) -> Self {
        Self {
            proj_view: view.proj_view().to_cols_array_2d(),
            view_pos: view.origin.extend(1.0).to_array(),
            light_pos: LIGHT_POS.extend(1.0).to_array(),
            light_color: LIGHT_COLOR.extend(1.0).to_array(),
        }
    }
}

/// Per-draw block, group 1, addressed with a dynamic offset.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct DrawUniform {
    pub model: [[f32; 4]; 4],
    /// rgb tint, a = alpha.
    pub color: [f32; 4],
}

impl DrawUniform {
    pub fn new(model: Mat4, color: Vec3, alpha: f32) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            color: color.extend(alpha).to_array(),
        }
    }
}

/// Dynamic offsets must be multiples of the device's uniform alignment;
/// 256 is the largest value wgpu allows for it.
pub const DRAW_UNIFORM_STRIDE: u64 = 256;

const _: () = assert!(size_of::<DrawUniform>() as u64 <= DRAW_UNIFORM_STRIDE);

/// Round `size` up to a multiple of `align` (a power of two).
pub fn align_to(size: u64, align: u64) -> u64 {
    (size + align - 1) & !(align - 1)
}

fn vertex_format(components: u32) -> Option<VertexFormat> {
    match components {
        1 => Some(VertexFormat::Float32),
        2 => Some(VertexFormat::Float32x2),
        3 => Some(VertexFormat::Float32x3),
        4 => Some(VertexFormat::Float32x4),
        _ => None,
    }
}

/// Translate an importer layout into wgpu attributes. Attributes with an
/// unsupported component count are skipped with a warning.
pub fn vertex_attributes(layout: &VertexLayout) -> Vec<VertexAttribute> {
    layout
        .attributes
        .iter()
        .filter_map(|a| match vertex_format(a.components) {
            Some(format) => Some(VertexAttribute {
                format,
                offset: a.offset as u64,
                shader_location: a.location,
            }),
            None => {
                log::warn!(
                    "Skipping vertex attribute {} with {} components",
                    a.location,
                    a.components
                );
                None
            }
        })
        .collect()
}
