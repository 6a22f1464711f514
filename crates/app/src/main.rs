//! Entry point for Ogt3D: a floor and a handful of physics-driven monkeys.

mod config;
mod scene;

use anyhow::Result;
use corelib::World;
use physics::RapierWorld;
use platform::WindowConfig;

use config::AppConfig;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_args(std::env::args().skip(1));
    log::info!(
        "Starting Ogt3D. Backend: {:?}, window_size={}x{}, physics={}, monkeys={}, assets={}",
        config.backends,
        config.width,
        config.height,
        config.physics,
        config.monkeys,
        config.assets.display()
    );

    let mut world = World::new();
    if config.physics {
        world = world.with_physics(Box::new(RapierWorld::new()));
    }
    scene::register_classes(&mut world, &config.assets)?;

    let window = WindowConfig {
        title: "Ogt3D".into(),
        width: config.width,
        height: config.height,
        backends: config.backends,
    };
    let monkeys = config.monkeys;
    platform::run(window, world, scene::default_view(), move |world, gfx| {
        scene::spawn(world, gfx, monkeys).map(|_| ())
    })?;

    log::info!("Graceful shutdown. Bye!");
    Ok(())
}
