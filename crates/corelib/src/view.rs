use crate::{Mat4, Vec3};

/// Perspective view looking along `forward` (right-handed, Y up).
#[derive(Clone, Copy, Debug)]
pub struct RenderView {
    pub origin: Vec3,
    pub forward: Vec3,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Width / height. Zero means "take it from the surface".
    pub aspect: f32,
}

impl RenderView {
    pub fn new(origin: Vec3, forward: Vec3, fov: f32, near: f32, far: f32) -> Self {
        Self {
            origin,
            forward: forward.normalize_or(Vec3::NEG_Z),
            fov,
            near,
            far,
            aspect: 0.0,
        }
    }

    #[inline]
    pub fn view(&self) -> Mat4 {
        // Looking straight up or down would make Y a degenerate up vector.
        let up = if self.forward.cross(Vec3::Y).length_squared() < 1e-6 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        Mat4::look_to_rh(self.origin, self.forward, up)
    }

    /// Projection with depth in [0,1], as wgpu expects.
    #[inline]
    pub fn proj(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov.to_radians(),
            self.aspect.max(1e-6),
            self.near,
            self.far,
        )
    }

    #[inline]
    pub fn proj_view(&self) -> Mat4 {
        self.proj() * self.view()
    }

    #[inline]
    pub fn with_aspect(mut self, aspect: f32) -> Self {
        self.aspect = aspect;
        self
    }
}
