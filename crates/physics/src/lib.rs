//! Rigid-body simulation on rapier3d behind [`corelib::PhysicsWorld`].
//!
//! Bodies get their mass from the first geometry attached to them, so a
//! body without geometry does not respond to gravity.

use std::collections::HashMap;

use corelib::{BodyHandle, GeomHandle, PhysicsWorld, Quat, Shape, Vec3};
use rapier3d::na::{Isometry3, Quaternion, Translation3, UnitQuaternion};
use rapier3d::prelude::*;

pub const GRAVITY: f32 = -9.81;

/// Contact surface: high friction, no bounce.
const FRICTION: f32 = 1.0;
const RESTITUTION: f32 = 0.0;

pub struct RapierWorld {
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    gravity: Vector<Real>,

    bodies: HashMap<BodyHandle, RigidBodyHandle>,
    colliders: HashMap<GeomHandle, ColliderHandle>,
    /// Mass waiting for the body's first collider.
    pending_mass: HashMap<BodyHandle, f32>,
    next_handle: u64,
}

impl RapierWorld {
    pub fn new() -> Self {
        Self::with_gravity(Vec3::new(0.0, GRAVITY, 0.0))
    }

    pub fn with_gravity(gravity: Vec3) -> Self {
        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            gravity: vector![gravity.x, gravity.y, gravity.z],
            bodies: HashMap::new(),
            colliders: HashMap::new(),
            pending_mass: HashMap::new(),
            next_handle: 1,
        }
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn geometry_count(&self) -> usize {
        self.colliders.len()
    }

    pub fn body_mass(&self, body: BodyHandle) -> Option<f32> {
        self.body(body).map(|b| b.mass())
    }

    pub fn angular_velocity(&self, body: BodyHandle) -> Option<Vec3> {
        self.body(body).map(|b| {
            let w = b.angvel();
            Vec3::new(w.x, w.y, w.z)
        })
    }

    pub fn set_angular_velocity(&mut self, body: BodyHandle, velocity: Vec3) {
        if let Some(b) = self.body_mut(body) {
            b.set_angvel(vector![velocity.x, velocity.y, velocity.z], true);
        }
    }

    fn next(&mut self) -> u64 {
        let id = self.next_handle;
        self.next_handle += 1;
        id
    }

    fn body(&self, body: BodyHandle) -> Option<&RigidBody> {
        self.bodies
            .get(&body)
            .and_then(|h| self.rigid_body_set.get(*h))
    }

    fn body_mut(&mut self, body: BodyHandle) -> Option<&mut RigidBody> {
        let handle = *self.bodies.get(&body)?;
        self.rigid_body_set.get_mut(handle)
    }
}

impl Default for RapierWorld {
    fn default() -> Self {
        Self::new()
    }
}

fn shared_shape(shape: Shape) -> SharedShape {
    match shape {
        Shape::Box { size } => {
            let half = size * 0.5;
            SharedShape::cuboid(half.x, half.y, half.z)
        }
        Shape::Sphere { radius } => SharedShape::ball(radius),
    }
}

impl PhysicsWorld for RapierWorld {
    fn create_body(&mut self, position: Vec3, orientation: Quat, mass: f32) -> BodyHandle {
        let rotation = UnitQuaternion::new_normalize(Quaternion::new(
            orientation.w,
            orientation.x,
            orientation.y,
            orientation.z,
        ));
        let pose = Isometry3::from_parts(Translation3::new(position.x, position.y, position.z), rotation);
        let rb = RigidBodyBuilder::dynamic()
            .position(pose)
            .linvel(vector![0.0, 0.0, 0.0])
            .angvel(vector![0.0, 0.0, 0.0])
            .build();

        let rapier_handle = self.rigid_body_set.insert(rb);
        let handle = BodyHandle(self.next());
        self.bodies.insert(handle, rapier_handle);
        self.pending_mass.insert(handle, mass.max(0.0));

        log::debug!("Created body {:?} at {:?} (mass {})", handle, position, mass);
        handle
    }

    fn create_geometry(&mut self, shape: Shape, body: Option<BodyHandle>, position: Vec3) -> GeomHandle {
        let mut builder = ColliderBuilder::new(shared_shape(shape))
            .friction(FRICTION)
            .restitution(RESTITUTION);

        let parent = body.and_then(|b| self.bodies.get(&b).copied().map(|h| (b, h)));
        let rapier_handle = match parent {
            Some((body, rapier_body)) => {
                builder = match self.pending_mass.remove(&body) {
                    Some(mass) => builder.mass(mass),
                    None => builder.density(0.0),
                };
                self.collider_set
                    .insert_with_parent(builder.build(), rapier_body, &mut self.rigid_body_set)
            }
            None => {
                if body.is_some() {
                    log::warn!("Geometry for unknown body {:?}; creating it static", body);
                }
                builder = builder.translation(vector![position.x, position.y, position.z]);
                self.collider_set.insert(builder.build())
            }
        };

        let handle = GeomHandle(self.next());
        self.colliders.insert(handle, rapier_handle);
        handle
    }

    fn remove_body(&mut self, body: BodyHandle) {
        self.pending_mass.remove(&body);
        if let Some(rapier_handle) = self.bodies.remove(&body) {
            self.rigid_body_set.remove(
                rapier_handle,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            );
            // Attached colliders went with the body.
            let collider_set = &self.collider_set;
            self.colliders.retain(|_, h| collider_set.get(*h).is_some());
        }
    }

    fn remove_geometry(&mut self, geometry: GeomHandle) {
        if let Some(rapier_handle) = self.colliders.remove(&geometry) {
            self.collider_set.remove(
                rapier_handle,
                &mut self.island_manager,
                &mut self.rigid_body_set,
                true,
            );
        }
    }

    fn body_position(&self, body: BodyHandle) -> Option<Vec3> {
        self.body(body).map(|b| {
            let p = b.translation();
            Vec3::new(p.x, p.y, p.z)
        })
    }

    fn body_orientation(&self, body: BodyHandle) -> Option<Quat> {
        self.body(body).map(|b| {
            let q = b.rotation().coords;
            Quat::from_xyzw(q.x, q.y, q.z, q.w)
        })
    }

    fn damp_angular_velocity(&mut self, body: BodyHandle, factor: f32) {
        if let Some(b) = self.body_mut(body) {
            let damped = *b.angvel() * factor;
            b.set_angvel(damped, false);
        }
    }

    fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        self.integration_parameters.dt = dt;

        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn drop_cube(world: &mut RapierWorld, height: f32) -> BodyHandle {
        let body = world.create_body(Vec3::new(0.0, height, 0.0), Quat::IDENTITY, 1.0);
        world.create_geometry(Shape::cube(1.0), Some(body), Vec3::ZERO);
        body
    }

    #[test]
    fn cube_falls_under_gravity() {
        let mut world = RapierWorld::new();
        let body = drop_cube(&mut world, 10.0);

        for _ in 0..60 {
            world.step(DT);
        }
        let y = world.body_position(body).unwrap().y;
        assert!((4.5..5.5).contains(&y), "fell to {y}");
        assert!((world.body_mass(body).unwrap() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn cube_rests_on_static_floor() {
        let mut world = RapierWorld::new();
        world.create_geometry(
            Shape::Box {
                size: Vec3::new(15.0, 1.0, 15.0),
            },
            None,
            Vec3::ZERO,
        );
        let body = drop_cube(&mut world, 3.0);

        for _ in 0..240 {
            world.step(DT);
        }
        let y = world.body_position(body).unwrap().y;
        assert!((0.9..1.1).contains(&y), "settled at {y}");
    }

    #[test]
    fn pose_round_trips_through_rapier() {
        let mut world = RapierWorld::new();
        let rotation = Quat::from_rotation_y(0.7);
        let body = world.create_body(Vec3::new(1.0, 2.0, 3.0), rotation, 1.0);

        let (position, orientation) = world.read_transform(body).unwrap();
        assert_eq!(position, Vec3::new(1.0, 2.0, 3.0));
        assert!(orientation.abs_diff_eq(rotation, 1e-6));
    }

    #[test]
    fn damping_scales_angular_velocity() {
        let mut world = RapierWorld::new();
        let body = drop_cube(&mut world, 0.0);
        world.set_angular_velocity(body, Vec3::new(0.0, 2.0, 0.0));

        world.damp_angular_velocity(body, 0.5);
        let w = world.angular_velocity(body).unwrap();
        assert!((w.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn removed_body_takes_its_geometry() {
        let mut world = RapierWorld::new();
        let body = drop_cube(&mut world, 1.0);
        assert_eq!((world.body_count(), world.geometry_count()), (1, 1));

        world.remove_body(body);
        assert_eq!((world.body_count(), world.geometry_count()), (0, 0));
        assert_eq!(world.body_position(body), None);

        // Removing again is harmless.
        world.remove_body(body);
        world.step(DT);
    }

    #[test]
    fn geometry_then_body_removal() {
        let mut world = RapierWorld::new();
        let body = world.create_body(Vec3::ZERO, Quat::IDENTITY, 1.0);
        let geometry = world.create_geometry(Shape::Sphere { radius: 0.5 }, Some(body), Vec3::ZERO);

        world.remove_geometry(geometry);
        world.remove_body(body);
        assert_eq!((world.body_count(), world.geometry_count()), (0, 0));
    }
}
