//! Entity classes: named bundles of lifecycle callbacks, registered once
//! at startup and shared by every instance.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

use crate::cache::{MeshCache, MeshHandle};
use crate::entity::{Entity, EntityRegistry};
use crate::error::{CoreError, CoreResult};
use crate::gfx::GraphicsDevice;
use crate::physics::PhysicsWorld;

pub type CreateFn = Box<dyn Fn(&mut Entity, &mut SpawnContext<'_>) -> CoreResult<()>>;
pub type PhysicsInitFn = Box<dyn Fn(&mut Entity, &mut dyn PhysicsWorld)>;
pub type DestroyFn = Box<dyn Fn(&mut Entity)>;
/// Receives the thinking entity and a read view of every other live one.
pub type ThinkFn = Box<dyn Fn(&mut Entity, &EntityRegistry, f32)>;
pub type RenderFn = Box<dyn Fn(&Entity, &mut dyn GraphicsDevice, f32)>;

/// Resources a creation callback may touch.
pub struct SpawnContext<'a> {
    pub meshes: &'a mut MeshCache,
    pub gfx: &'a mut dyn GraphicsDevice,
}

impl SpawnContext<'_> {
    pub fn load_model(&mut self, path: impl AsRef<Path>) -> CoreResult<MeshHandle> {
        self.meshes.get_or_load(path, &mut *self.gfx)
    }

    /// Load `path` through the cache and make it the entity's mesh.
    pub fn set_model(&mut self, entity: &mut Entity, path: impl AsRef<Path>) -> CoreResult<()> {
        let mesh = self.load_model(path)?;
        entity.mesh = Some(mesh);
        Ok(())
    }
}

/// Optional lifecycle hooks. Missing hooks are skipped.
#[derive(Default)]
pub struct EntityCallbacks {
    pub(crate) on_create: Option<CreateFn>,
    pub(crate) init_physics: Option<PhysicsInitFn>,
    pub(crate) on_destroy: Option<DestroyFn>,
    pub(crate) think: Option<ThinkFn>,
    pub(crate) render: Option<RenderFn>,
}

impl EntityCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_create(
        mut self,
        f: impl Fn(&mut Entity, &mut SpawnContext<'_>) -> CoreResult<()> + 'static,
    ) -> Self {
        self.on_create = Some(Box::new(f));
        self
    }

    /// Runs right after `on_create`, only when the world has physics.
    pub fn init_physics(mut self, f: impl Fn(&mut Entity, &mut dyn PhysicsWorld) + 'static) -> Self {
        self.init_physics = Some(Box::new(f));
        self
    }

    pub fn on_destroy(mut self, f: impl Fn(&mut Entity) + 'static) -> Self {
        self.on_destroy = Some(Box::new(f));
        self
    }

    pub fn think(mut self, f: impl Fn(&mut Entity, &EntityRegistry, f32) + 'static) -> Self {
        self.think = Some(Box::new(f));
        self
    }

    pub fn render(mut self, f: impl Fn(&Entity, &mut dyn GraphicsDevice, f32) + 'static) -> Self {
        self.render = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for EntityCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityCallbacks")
            .field("on_create", &self.on_create.is_some())
            .field("init_physics", &self.init_physics.is_some())
            .field("on_destroy", &self.on_destroy.is_some())
            .field("think", &self.think.is_some())
            .field("render", &self.render.is_some())
            .finish()
    }
}

#[derive(Debug)]
pub struct EntityClass {
    name: String,
    callbacks: EntityCallbacks,
    mesh: RefCell<Option<MeshHandle>>,
}

impl EntityClass {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn callbacks(&self) -> &EntityCallbacks {
        &self.callbacks
    }

    pub fn wants_physics(&self) -> bool {
        self.callbacks.init_physics.is_some()
    }

    /// Mesh new instances start with.
    pub fn shared_mesh(&self) -> Option<MeshHandle> {
        self.mesh.borrow().clone()
    }

    pub fn set_shared_mesh(&self, mesh: Option<MeshHandle>) {
        *self.mesh.borrow_mut() = mesh;
    }
}

pub type ClassHandle = Rc<EntityClass>;

/// Name -> class table. Classes are never removed.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: HashMap<String, ClassHandle>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name`. A duplicate is rejected and the existing class kept.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        callbacks: EntityCallbacks,
    ) -> CoreResult<ClassHandle> {
        let name = name.into();
        if self.classes.contains_key(&name) {
            log::warn!("Entity class '{}' is already registered", name);
            return Err(CoreError::DuplicateName(name));
        }

        let class = Rc::new(EntityClass {
            name: name.clone(),
            callbacks,
            mesh: RefCell::new(None),
        });
        self.classes.insert(name, Rc::clone(&class));
        log::debug!("Registered entity class '{}'", class.name());
        Ok(class)
    }

    pub fn find(&self, name: &str) -> CoreResult<ClassHandle> {
        self.classes
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::ClassNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn duplicate_registration_keeps_first() {
        let hits = Rc::new(Cell::new(0u32));
        let mut registry = ClassRegistry::new();

        let first = {
            let hits = Rc::clone(&hits);
            registry
                .register("monkey", EntityCallbacks::new().think(move |_, _, _| hits.set(hits.get() + 1)))
                .unwrap()
        };

        let err = registry
            .register("monkey", EntityCallbacks::new().render(|_, _, _| {}))
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateName(ref n) if n == "monkey"));

        let found = registry.find("monkey").unwrap();
        assert!(Rc::ptr_eq(&first, &found));
        assert!(found.callbacks().think.is_some());
        assert!(found.callbacks().render.is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unknown_name_is_not_found() {
        let registry = ClassRegistry::new();
        assert!(matches!(
            registry.find("ghost"),
            Err(CoreError::ClassNotFound(ref n)) if n == "ghost"
        ));
    }

    #[test]
    fn physics_request_follows_callback() {
        let mut registry = ClassRegistry::new();
        let plain = registry.register("plain", EntityCallbacks::new()).unwrap();
        let body = registry
            .register("body", EntityCallbacks::new().init_physics(|_, _| {}))
            .unwrap();
        assert!(!plain.wants_physics());
        assert!(body.wants_physics());
        assert!(plain.shared_mesh().is_none());
    }
}
