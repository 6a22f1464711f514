//! One simulation instance: classes, entities, loaded meshes and an
//! optional physics world, passed explicitly to whoever drives it.

use std::path::Path;

use crate::cache::{MeshCache, MeshHandle};
use crate::class::{ClassHandle, ClassRegistry, EntityCallbacks, SpawnContext};
use crate::entity::{Entity, EntityId, EntityInit, EntityRegistry, MAX_ENTITIES};
use crate::error::{CoreError, CoreResult};
use crate::gfx::GraphicsDevice;
use crate::physics::PhysicsWorld;

pub struct World {
    classes: ClassRegistry,
    entities: EntityRegistry,
    meshes: MeshCache,
    physics: Option<Box<dyn PhysicsWorld>>,
}

fn physics_of(physics: &mut Option<Box<dyn PhysicsWorld>>) -> Option<&mut dyn PhysicsWorld> {
    match physics {
        Some(p) => Some(&mut **p),
        None => None,
    }
}

impl World {
    pub fn new() -> Self {
        Self::with_capacity(MAX_ENTITIES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            classes: ClassRegistry::new(),
            entities: EntityRegistry::with_capacity(capacity),
            meshes: MeshCache::new(),
            physics: None,
        }
    }

    /// Attach a physics world. Classes with an `init_physics` hook get a
    /// body from then on.
    pub fn with_physics(mut self, physics: Box<dyn PhysicsWorld>) -> Self {
        self.physics = Some(physics);
        self
    }

    pub fn register_class(
        &mut self,
        name: impl Into<String>,
        callbacks: EntityCallbacks,
    ) -> CoreResult<ClassHandle> {
        self.classes.register(name, callbacks)
    }

    pub fn find_class(&self, name: &str) -> CoreResult<ClassHandle> {
        self.classes.find(name)
    }

    /// Create an entity of the class registered as `name` at the origin.
    pub fn create_entity(&mut self, name: &str, gfx: &mut dyn GraphicsDevice) -> CoreResult<EntityId> {
        self.spawn_named(name, EntityInit::default(), gfx)
    }

    pub fn spawn_named(
        &mut self,
        name: &str,
        init: EntityInit,
        gfx: &mut dyn GraphicsDevice,
    ) -> CoreResult<EntityId> {
        let class = self.classes.find(name).inspect_err(|_| {
            log::warn!("Cannot create entity: no class named '{}'", name);
        })?;
        self.spawn(&class, init, gfx)
    }

    pub fn spawn(
        &mut self,
        class: &ClassHandle,
        init: EntityInit,
        gfx: &mut dyn GraphicsDevice,
    ) -> CoreResult<EntityId> {
        let mut ctx = SpawnContext {
            meshes: &mut self.meshes,
            gfx,
        };
        self.entities
            .create(class, init, &mut ctx, physics_of(&mut self.physics))
    }

    /// See [`EntityRegistry::destroy`].
    pub fn destroy_entity(&mut self, id: EntityId) -> bool {
        self.entities.destroy(id, physics_of(&mut self.physics))
    }

    /// Replace a live entity's mesh with the cached mesh for `path`.
    pub fn set_entity_model(
        &mut self,
        id: EntityId,
        path: impl AsRef<Path>,
        gfx: &mut dyn GraphicsDevice,
    ) -> CoreResult<MeshHandle> {
        if !self.entities.contains(id) {
            log::warn!("Cannot set model of dead entity {}", id);
            return Err(CoreError::EntityNotFound(id));
        }
        let mesh = self.meshes.get_or_load(path, gfx)?;
        self.entities.expect_live(id)?.mesh = Some(mesh.clone());
        Ok(mesh)
    }

    /// Give every future instance of class `name` the mesh at `path`.
    /// Existing instances keep whatever mesh they have.
    pub fn set_class_model(
        &mut self,
        name: &str,
        path: impl AsRef<Path>,
        gfx: &mut dyn GraphicsDevice,
    ) -> CoreResult<MeshHandle> {
        let class = self.classes.find(name)?;
        let mesh = self.meshes.get_or_load(path, gfx)?;
        class.set_shared_mesh(Some(mesh.clone()));
        Ok(mesh)
    }

    /// Advance the physics world, if any.
    pub fn step_physics(&mut self, dt: f32) {
        if let Some(physics) = self.physics.as_mut() {
            physics.step(dt);
        }
    }

    pub fn think_all(&mut self, dt: f32) {
        self.entities.think_all(physics_of(&mut self.physics), dt);
    }

    pub fn render_all(&self, gfx: &mut dyn GraphicsDevice, dt: f32) {
        self.entities.render_all(gfx, dt);
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    pub fn meshes(&self) -> &MeshCache {
        &self.meshes
    }

    pub fn has_physics(&self) -> bool {
        self.physics.is_some()
    }

    pub fn physics(&self) -> Option<&dyn PhysicsWorld> {
        self.physics.as_deref()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
