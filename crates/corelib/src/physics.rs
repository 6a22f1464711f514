//! Physics-engine seam. Entities hold opaque handles only; stepping and
//! collision live behind [`PhysicsWorld`] (see the `physics` crate).

use crate::{Quat, Vec3};

/// Angular velocity retained per `think_all` call for synced bodies.
pub const ANGULAR_DAMPING: f32 = 0.98;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GeomHandle(pub u64);

/// Collision shape, centred on its body (or the world origin).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    /// Full edge lengths.
    Box { size: Vec3 },
    Sphere { radius: f32 },
}

impl Shape {
    pub fn cube(edge: f32) -> Self {
        Self::Box {
            size: Vec3::splat(edge),
        }
    }
}

pub trait PhysicsWorld {
    /// Create a dynamic body of `mass` at the given pose.
    fn create_body(&mut self, position: Vec3, orientation: Quat, mass: f32) -> BodyHandle;

    /// Attach collision geometry to `body`, centred on it, or place static
    /// geometry at `position` when `body` is `None`.
    fn create_geometry(&mut self, shape: Shape, body: Option<BodyHandle>, position: Vec3) -> GeomHandle;

    fn remove_body(&mut self, body: BodyHandle);

    fn remove_geometry(&mut self, geometry: GeomHandle);

    fn body_position(&self, body: BodyHandle) -> Option<Vec3>;

    fn body_orientation(&self, body: BodyHandle) -> Option<Quat>;

    /// Scale the body's angular velocity by `factor`.
    fn damp_angular_velocity(&mut self, body: BodyHandle, factor: f32);

    fn step(&mut self, dt: f32);

    fn read_transform(&self, body: BodyHandle) -> Option<(Vec3, Quat)> {
        Some((self.body_position(body)?, self.body_orientation(body)?))
    }
}
