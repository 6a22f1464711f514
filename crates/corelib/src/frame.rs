//! Per-frame driver: physics step, then think, then render.

use std::time::Instant;

use crate::gfx::GraphicsDevice;
use crate::world::World;

pub struct FrameDispatcher {
    last: Option<Instant>,
    max_dt: f32,
}

impl FrameDispatcher {
    /// Longest step handed to the simulation, in seconds.
    pub const DEFAULT_MAX_DT: f32 = 0.1;

    pub fn new() -> Self {
        Self::with_max_dt(Self::DEFAULT_MAX_DT)
    }

    pub fn with_max_dt(max_dt: f32) -> Self {
        Self {
            last: None,
            max_dt: max_dt.max(0.0),
        }
    }

    /// Seconds since the previous tick, clamped to `max_dt`. The first
    /// tick returns 0.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let dt = match self.last.replace(now) {
            Some(prev) => now.duration_since(prev).as_secs_f32(),
            None => 0.0,
        };
        self.clamp(dt)
    }

    /// Measure dt and run one frame with it.
    pub fn frame(&mut self, world: &mut World, gfx: &mut dyn GraphicsDevice) -> f32 {
        let dt = self.tick();
        self.run_frame(world, gfx, dt);
        dt
    }

    /// Step physics, sync and think, then render. The caller has already
    /// bound the view for this frame.
    pub fn run_frame(&self, world: &mut World, gfx: &mut dyn GraphicsDevice, dt: f32) {
        let dt = self.clamp(dt);
        world.step_physics(dt);
        world.think_all(dt);
        world.render_all(gfx, dt);
    }

    fn clamp(&self, dt: f32) -> f32 {
        if dt.is_finite() { dt.clamp(0.0, self.max_dt) } else { 0.0 }
    }
}

impl Default for FrameDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::class::EntityCallbacks;
    use crate::entity::EntityInit;
    use crate::gfx::RecordingDevice;
    use crate::physics::{BodyHandle, GeomHandle, PhysicsWorld, Shape};
    use crate::{Quat, Vec3};

    type Log = Rc<RefCell<Vec<String>>>;

    struct LoggingPhysics {
        log: Log,
        position: Vec3,
    }

    impl PhysicsWorld for LoggingPhysics {
        fn create_body(&mut self, position: Vec3, _orientation: Quat, _mass: f32) -> BodyHandle {
            self.position = position;
            BodyHandle(7)
        }

        fn create_geometry(&mut self, _shape: Shape, _body: Option<BodyHandle>, _at: Vec3) -> GeomHandle {
            GeomHandle(8)
        }

        fn remove_body(&mut self, _body: BodyHandle) {}

        fn remove_geometry(&mut self, _geometry: GeomHandle) {}

        fn body_position(&self, _body: BodyHandle) -> Option<Vec3> {
            self.log.borrow_mut().push("sync".into());
            Some(self.position)
        }

        fn body_orientation(&self, _body: BodyHandle) -> Option<Quat> {
            Some(Quat::IDENTITY)
        }

        fn damp_angular_velocity(&mut self, _body: BodyHandle, _factor: f32) {}

        fn step(&mut self, dt: f32) {
            self.log.borrow_mut().push(format!("step {dt}"));
            self.position.x += 1.0;
        }
    }

    fn logging_world(log: &Log) -> World {
        let physics = LoggingPhysics {
            log: Rc::clone(log),
            position: Vec3::ZERO,
        };
        let mut world = World::new().with_physics(Box::new(physics));

        let (think_log, render_log) = (Rc::clone(log), Rc::clone(log));
        world
            .register_class(
                "ticker",
                EntityCallbacks::new()
                    .init_physics(|e, physics| {
                        e.body = Some(physics.create_body(e.origin, Quat::IDENTITY, 1.0));
                    })
                    .think(move |e, _, _| think_log.borrow_mut().push(format!("think {}", e.origin.x)))
                    .render(move |e, _, _| {
                        render_log.borrow_mut().push(format!("render {}", e.id().index))
                    }),
            )
            .unwrap();
        world
    }

    #[test]
    fn phases_run_in_fixed_order() {
        let log = Log::default();
        let mut world = logging_world(&log);
        let mut gfx = RecordingDevice::new();
        world.spawn_named("ticker", EntityInit::default(), &mut gfx).unwrap();
        world.spawn_named("ticker", EntityInit::default(), &mut gfx).unwrap();

        let dispatcher = FrameDispatcher::new();
        dispatcher.run_frame(&mut world, &mut gfx, 0.05);

        assert_eq!(
            *log.borrow(),
            ["step 0.05", "sync", "sync", "think 1", "think 1", "render 0", "render 1"]
        );
    }

    #[test]
    fn long_frames_are_clamped() {
        let log = Log::default();
        let mut world = logging_world(&log);
        let mut gfx = RecordingDevice::new();

        let dispatcher = FrameDispatcher::with_max_dt(0.25);
        dispatcher.run_frame(&mut world, &mut gfx, 3.0);
        dispatcher.run_frame(&mut world, &mut gfx, f32::NAN);
        dispatcher.run_frame(&mut world, &mut gfx, -1.0);

        assert_eq!(*log.borrow(), ["step 0.25", "step 0", "step 0"]);
    }

    #[test]
    fn first_tick_is_zero() {
        let mut dispatcher = FrameDispatcher::new();
        assert_eq!(dispatcher.tick(), 0.0);
        let dt = dispatcher.tick();
        assert!((0.0..=FrameDispatcher::DEFAULT_MAX_DT).contains(&dt));
    }
}
