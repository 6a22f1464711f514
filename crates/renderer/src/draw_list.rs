//! CPU side of a frame: binding state plus the draws issued against it.

use corelib::{GpuMeshId, Mat4, TextureId, Vec3};

/// One triangle range with the state that was bound when it was issued.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawCall {
    pub mesh: GpuMeshId,
    pub texture: Option<TextureId>,
    pub model: Mat4,
    pub color: Vec3,
    pub alpha: f32,
    pub first_vertex: u32,
    pub vertex_count: u32,
}

#[derive(Debug)]
pub struct DrawList {
    mesh: Option<GpuMeshId>,
    texture: Option<TextureId>,
    model: Mat4,
    color: Vec3,
    alpha: f32,
    calls: Vec<DrawCall>,
}

impl DrawList {
    pub fn new() -> Self {
        Self {
            mesh: None,
            texture: None,
            model: Mat4::IDENTITY,
            color: Vec3::ONE,
            alpha: 1.0,
            calls: Vec::new(),
        }
    }

    /// Forget recorded draws and reset bindings.
    pub fn reset(&mut self) {
        let mut calls = std::mem::take(&mut self.calls);
        calls.clear();
        *self = Self { calls, ..Self::new() };
    }

    pub fn bind_mesh(&mut self, mesh: GpuMeshId) {
        self.mesh = Some(mesh);
    }

    pub fn bind_texture(&mut self, texture: Option<TextureId>) {
        self.texture = texture;
    }

    pub fn set_transform(&mut self, model: Mat4) {
        self.model = model;
    }

    pub fn set_material(&mut self, color: Vec3, alpha: f32) {
        self.color = color;
        self.alpha = alpha;
    }

    /// Record a draw. Without a bound mesh or with an empty range this is
    /// dropped.
    pub fn draw(&mut self, first_vertex: u32, vertex_count: u32) {
        let Some(mesh) = self.mesh else {
            log::warn!("Draw of {} vertices with no mesh bound", vertex_count);
            return;
        };
        if vertex_count == 0 {
            return;
        }
        self.calls.push(DrawCall {
            mesh,
            texture: self.texture,
            model: self.model,
            color: self.color,
            alpha: self.alpha,
            first_vertex,
            vertex_count,
        });
    }

    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

impl Default for DrawList {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_capture_current_bindings() {
        let mut list = DrawList::new();
        list.bind_mesh(GpuMeshId(3));
        list.set_transform(Mat4::from_translation(Vec3::X));
        list.set_material(Vec3::new(1.0, 0.0, 0.0), 0.5);
        list.bind_texture(Some(TextureId(9)));
        list.draw(0, 6);

        list.bind_texture(None);
        list.draw(6, 3);

        let calls = list.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].texture, Some(TextureId(9)));
        assert_eq!(calls[1].texture, None);
        assert_eq!(calls[1].alpha, 0.5);
        assert_eq!(calls[1].model, Mat4::from_translation(Vec3::X));
        assert_eq!((calls[1].first_vertex, calls[1].vertex_count), (6, 3));
    }

    #[test]
    fn unbound_or_empty_draws_are_dropped() {
        let mut list = DrawList::new();
        list.draw(0, 3);
        list.bind_mesh(GpuMeshId(1));
        list.draw(0, 0);
        assert!(list.is_empty());
    }

    #[test]
    fn reset_clears_state() {
        let mut list = DrawList::new();
        list.bind_mesh(GpuMeshId(1));
        list.set_material(Vec3::ZERO, 0.1);
        list.draw(0, 3);
        list.reset();

        assert!(list.is_empty());
        list.draw(0, 3);
        assert!(list.is_empty());
        list.bind_mesh(GpuMeshId(1));
        list.draw(0, 3);
        assert_eq!(list.calls()[0].color, Vec3::ONE);
    }
}
