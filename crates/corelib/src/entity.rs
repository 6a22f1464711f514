//! Entity pool: a bounded slot array with LIFO index recycling.
//!
//! # Invariants
//! - A slot is either live (`Some`) or its index sits in `free` exactly once.
//! - `high_water` never decreases; slots at or above it were never used.
//! - A slot's generation bumps on every destroy, so stale ids miss.

use std::fmt;
use std::rc::Rc;

use crate::cache::MeshHandle;
use crate::class::{ClassHandle, SpawnContext};
use crate::error::{CoreError, CoreResult};
use crate::gfx::GraphicsDevice;
use crate::physics::{ANGULAR_DAMPING, BodyHandle, GeomHandle, PhysicsWorld};
use crate::transform::{Transform, angles_from_quat};
use crate::{Mat4, Vec3};

pub const MAX_ENTITIES: usize = 255;

/// Slot index plus the generation it was allocated in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    pub index: u32,
    pub generation: u32,
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {} (gen {})", self.index, self.generation)
    }
}

/// Initial placement for a new entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EntityInit {
    pub origin: Vec3,
    pub angles: Vec3,
    pub color: Vec3,
}

impl EntityInit {
    pub fn at(origin: Vec3) -> Self {
        Self {
            origin,
            ..Self::default()
        }
    }

    pub fn with_angles(mut self, angles: Vec3) -> Self {
        self.angles = angles;
        self
    }

    pub fn with_color(mut self, color: Vec3) -> Self {
        self.color = color;
        self
    }
}

impl Default for EntityInit {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            angles: Vec3::ZERO,
            color: Vec3::ONE,
        }
    }
}

#[derive(Debug)]
pub struct Entity {
    id: EntityId,
    class: ClassHandle,
    pub mesh: Option<MeshHandle>,
    pub origin: Vec3,
    /// Euler degrees (XYZ).
    pub angles: Vec3,
    pub color: Vec3,
    pub body: Option<BodyHandle>,
    pub geometry: Option<GeomHandle>,
}

impl Entity {
    fn new(id: EntityId, class: ClassHandle, init: EntityInit) -> Self {
        let mesh = class.shared_mesh();
        Self {
            id,
            class,
            mesh,
            origin: init.origin,
            angles: init.angles,
            color: init.color,
            body: None,
            geometry: None,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn class(&self) -> &ClassHandle {
        &self.class
    }

    pub fn transform(&self) -> Transform {
        Transform::new(self.origin, self.angles)
    }

    pub fn model_matrix(&self) -> Mat4 {
        self.transform().matrix()
    }

    /// Pull pose from the physics body: position, then damp spin, then
    /// orientation as normalized Euler degrees.
    fn sync_from_physics(&mut self, physics: &mut dyn PhysicsWorld) {
        let Some(body) = self.body else {
            return;
        };
        let Some(position) = physics.body_position(body) else {
            log::debug!("Entity {} lost its physics body", self.id);
            return;
        };
        self.origin = position;

        physics.damp_angular_velocity(body, ANGULAR_DAMPING);

        if let Some(orientation) = physics.body_orientation(body) {
            self.angles = angles_from_quat(orientation);
        }
    }
}

pub struct EntityRegistry {
    slots: Vec<Option<Entity>>,
    generations: Vec<u32>,
    free: Vec<u32>,
    high_water: u32,
    capacity: usize,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::with_capacity(MAX_ENTITIES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            generations: Vec::new(),
            free: Vec::new(),
            high_water: 0,
            capacity: capacity.min(u32::MAX as usize),
        }
    }

    /// Allocate a slot and run the class's creation hooks.
    ///
    /// The most recently freed index is reused first. Nothing is committed
    /// until `on_create` succeeds, so a failed creation leaves the pool as
    /// it was. `init_physics` runs after `on_create` when `physics` is given.
    pub fn create(
        &mut self,
        class: &ClassHandle,
        init: EntityInit,
        ctx: &mut SpawnContext<'_>,
        physics: Option<&mut dyn PhysicsWorld>,
    ) -> CoreResult<EntityId> {
        let (index, reused) = match self.free.last() {
            Some(&index) => (index, true),
            None if (self.high_water as usize) < self.capacity => (self.high_water, false),
            None => {
                log::warn!(
                    "Too many entities! Cannot create '{}' ({} live)",
                    class.name(),
                    self.capacity
                );
                return Err(CoreError::Capacity {
                    capacity: self.capacity,
                });
            }
        };

        let generation = self.generations.get(index as usize).copied().unwrap_or(0);
        let id = EntityId { index, generation };
        let mut entity = Entity::new(id, Rc::clone(class), init);

        if let Some(on_create) = &class.callbacks().on_create {
            if let Err(e) = on_create(&mut entity, ctx) {
                log::error!("Creating '{}' in {} failed: {}", class.name(), id, e);
                return Err(e);
            }
        }

        if let (Some(init_physics), Some(physics)) = (&class.callbacks().init_physics, physics) {
            init_physics(&mut entity, physics);
        }

        if reused {
            self.free.pop();
        } else {
            self.high_water += 1;
            self.slots.push(None);
            self.generations.push(0);
        }
        self.slots[index as usize] = Some(entity);

        log::debug!("Created '{}' in {}", class.name(), id);
        Ok(id)
    }

    /// Destroy a live entity. Returns `false` (and does nothing) for a
    /// stale or never-allocated id, so double destroy is harmless.
    pub fn destroy(&mut self, id: EntityId, physics: Option<&mut dyn PhysicsWorld>) -> bool {
        if !self.contains(id) {
            log::debug!("Ignoring destroy of dead entity {}", id);
            return false;
        }
        let index = id.index as usize;
        let Some(mut entity) = self.slots[index].take() else {
            return false;
        };

        let class = Rc::clone(&entity.class);
        if let Some(on_destroy) = &class.callbacks().on_destroy {
            on_destroy(&mut entity);
        }

        match physics {
            Some(physics) => {
                if let Some(geometry) = entity.geometry.take() {
                    physics.remove_geometry(geometry);
                }
                if let Some(body) = entity.body.take() {
                    physics.remove_body(body);
                }
            }
            None if entity.body.is_some() || entity.geometry.is_some() => {
                log::warn!(
                    "Destroying {} without a physics world; its body and geometry stay behind",
                    id
                );
            }
            None => {}
        }

        self.generations[index] = self.generations[index].wrapping_add(1);
        self.free.push(id.index);
        log::debug!("Destroyed '{}' in {}", class.name(), id);
        true
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.slots
            .get(id.index as usize)?
            .as_ref()
            .filter(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.slots
            .get_mut(id.index as usize)?
            .as_mut()
            .filter(|e| e.id == id)
    }

    /// Like [`get_mut`](Self::get_mut) but reports a stale id.
    pub fn expect_live(&mut self, id: EntityId) -> CoreResult<&mut Entity> {
        self.get_mut(id).ok_or(CoreError::EntityNotFound(id))
    }

    /// Live entities in ascending slot order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    pub fn live_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn high_water(&self) -> u32 {
        self.high_water
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Freed indices, most recent last.
    pub fn free_indices(&self) -> &[u32] {
        &self.free
    }

    /// Copy physics poses onto every body-backed entity.
    pub fn sync_physics(&mut self, physics: &mut dyn PhysicsWorld) {
        for entity in self.slots.iter_mut().flatten() {
            entity.sync_from_physics(physics);
        }
    }

    /// Sync every entity from physics, then run every think callback.
    /// The passes never interleave. While an entity thinks it is lifted out
    /// of its slot, so the registry it is handed shows only its peers.
    pub fn think_all(&mut self, physics: Option<&mut dyn PhysicsWorld>, dt: f32) {
        if let Some(physics) = physics {
            self.sync_physics(physics);
        }

        for index in 0..self.slots.len() {
            let Some(mut entity) = self.slots[index].take() else {
                continue;
            };
            let class = Rc::clone(&entity.class);
            if let Some(think) = &class.callbacks().think {
                think(&mut entity, self, dt);
            }
            self.slots[index] = Some(entity);
        }
    }

    pub fn render_all(&self, gfx: &mut dyn GraphicsDevice, dt: f32) {
        for entity in self.iter() {
            if let Some(render) = &entity.class.callbacks().render {
                render(entity, gfx, dt);
            }
        }
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
