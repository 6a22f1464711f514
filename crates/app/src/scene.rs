//! Demo entity classes and the initial scene.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use corelib::draw::draw_entity_basic;
use corelib::{EntityCallbacks, EntityId, EntityInit, GraphicsDevice, RenderView, Shape, Vec3, World, vec3};

pub const MONKEY_MODEL: &str = "spongekey.obj";
pub const WORLD_MODEL: &str = "playne.obj";

/// Static floor collision box.
const FLOOR_SIZE: Vec3 = Vec3::new(15.0, 1.0, 15.0);

/// A dynamic 1x1x1 box of mass 1 wearing the monkey mesh.
fn monkey_class(model: PathBuf) -> EntityCallbacks {
    EntityCallbacks::new()
        .on_create(move |e, ctx| ctx.set_model(e, &model))
        .init_physics(|e, physics| {
            let body = physics.create_body(e.origin, e.transform().rotation(), 1.0);
            e.geometry = Some(physics.create_geometry(Shape::cube(1.0), Some(body), e.origin));
            e.body = Some(body);
        })
        .render(|e, gfx, _| draw_entity_basic(e, gfx))
}

/// The ground plane: static geometry, no body.
fn world_class(model: PathBuf) -> EntityCallbacks {
    EntityCallbacks::new()
        .on_create(move |e, ctx| ctx.set_model(e, &model))
        .init_physics(|e, physics| {
            e.geometry = Some(physics.create_geometry(Shape::Box { size: FLOOR_SIZE }, None, e.origin));
        })
        .render(|e, gfx, _| draw_entity_basic(e, gfx))
}

pub fn register_classes(world: &mut World, assets: &Path) -> Result<()> {
    world.register_class("world", world_class(assets.join(WORLD_MODEL)))?;
    world.register_class("monkey", monkey_class(assets.join(MONKEY_MODEL)))?;
    Ok(())
}

/// Where the `i`th monkey drops from: a sunflower spiral above the floor,
/// each one a little higher than the last.
fn drop_point(i: usize) -> EntityInit {
    let t = i as f32;
    let (s, c) = (t * 2.4).sin_cos();
    let r = 2.0 * t.sqrt();
    EntityInit::at(vec3(c * r, 3.0 + 0.5 * t, s * r)).with_angles(vec3(t * 37.0, t * 53.0, 20.0))
}

/// Spawn the floor and `monkeys` monkeys.
pub fn spawn(world: &mut World, gfx: &mut dyn GraphicsDevice, monkeys: usize) -> Result<Vec<EntityId>> {
    let mut ids = Vec::with_capacity(monkeys + 1);
    ids.push(
        world
            .spawn_named("world", EntityInit::at(vec3(0.0, -1.0, 0.0)), gfx)
            .context("failed to create the world entity")?,
    );
    for i in 0..monkeys {
        match world.spawn_named("monkey", drop_point(i), gfx) {
            Ok(id) => ids.push(id),
            Err(e) => {
                log::warn!("Stopped spawning at monkey {}: {}", i, e);
                break;
            }
        }
    }
    Ok(ids)
}

pub fn default_view() -> RenderView {
    RenderView::new(vec3(0.0, 4.0, 12.0), vec3(0.0, -0.3, -1.0), 60.0, 0.1, 100.0)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use corelib::MAX_ENTITIES;
    use corelib::gfx::RecordingDevice;
    use physics::RapierWorld;

    use super::*;

    const CUBE: &str = "\
mtllib cube.mtl
v -0.5 -0.5 -0.5
v 0.5 -0.5 -0.5
v 0.5 0.5 -0.5
v -0.5 0.5 -0.5
usemtl skin
f 1 2 3 4
";
    const MTL: &str = "newmtl skin\nKd 0.8 0.6 0.4\n";

    fn assets() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(MONKEY_MODEL), CUBE).unwrap();
        fs::write(dir.path().join(WORLD_MODEL), CUBE).unwrap();
        fs::write(dir.path().join("cube.mtl"), MTL).unwrap();
        dir
    }

    #[test]
    fn monkeys_fall_onto_the_floor() {
        let dir = assets();
        let mut gfx = RecordingDevice::new();
        let mut world = World::new().with_physics(Box::new(RapierWorld::new()));
        register_classes(&mut world, dir.path()).unwrap();

        let ids = spawn(&mut world, &mut gfx, 3).unwrap();
        assert_eq!(ids.len(), 4);
        // One upload per model file, however many monkeys share it.
        assert_eq!(gfx.upload_count(), 2);

        for _ in 0..600 {
            world.step_physics(1.0 / 60.0);
            world.think_all(1.0 / 60.0);
        }
        for &id in &ids[1..] {
            let monkey = world.entity(id).unwrap();
            assert!(monkey.body.is_some());
            assert!(monkey.origin.y > -1.0 && monkey.origin.y < 1.0, "{:?}", monkey.origin);
        }
        let floor = world.entity(ids[0]).unwrap();
        assert!(floor.body.is_none() && floor.geometry.is_some());
    }

    #[test]
    fn render_draws_every_entity() {
        let dir = assets();
        let mut gfx = RecordingDevice::new();
        let mut world = World::new();
        register_classes(&mut world, dir.path()).unwrap();
        spawn(&mut world, &mut gfx, 2).unwrap();

        gfx.clear();
        world.render_all(&mut gfx, 0.016);
        assert_eq!(gfx.draws(), [(0, 6); 3]);
    }

    #[test]
    fn missing_assets_fail_setup() {
        let dir = tempfile::tempdir().unwrap();
        let mut gfx = RecordingDevice::new();
        let mut world = World::new();
        register_classes(&mut world, dir.path()).unwrap();

        assert!(spawn(&mut world, &mut gfx, 1).is_err());
        assert_eq!(world.entities().live_count(), 0);
    }

    #[test]
    fn shipped_assets_load() {
        let assets = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets");
        let mut gfx = RecordingDevice::new();
        let mut world = World::new();
        register_classes(&mut world, &assets).unwrap();

        let ids = spawn(&mut world, &mut gfx, 1).unwrap();
        let floor = world.entity(ids[0]).unwrap().mesh.clone().unwrap();
        let monkey = world.entity(ids[1]).unwrap().mesh.clone().unwrap();
        assert_eq!(floor.vertex_count(), 6);
        assert_eq!(monkey.vertex_count(), 36);
        assert_eq!(monkey.submeshes().len(), 2);
        assert_eq!(monkey.submeshes()[1].range(), 30..36);
    }

    #[test]
    fn spawning_stops_at_capacity() {
        let dir = assets();
        let mut gfx = RecordingDevice::new();
        let mut world = World::new();
        register_classes(&mut world, dir.path()).unwrap();

        let ids = spawn(&mut world, &mut gfx, MAX_ENTITIES + 10).unwrap();
        assert_eq!(ids.len(), MAX_ENTITIES);
    }
}
