//! Platform layer: window, event loop and the per-frame drive of a
//! [`World`].
//!
//! The GPU only exists once the event loop has resumed, so world setup
//! (class models, initial entities) runs from a callback at that point.

use std::sync::Arc;

use anyhow::{Context, Result};
use corelib::{FrameDispatcher, GraphicsDevice, RenderView, World};
use renderer::GpuState;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

/// Runs once the graphics device is ready, before the first frame.
pub type SetupFn = Box<dyn FnOnce(&mut World, &mut dyn GraphicsDevice) -> Result<()>>;

#[derive(Clone, Debug)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub backends: wgpu::Backends,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Ogt3D".into(),
            width: 1280,
            height: 720,
            backends: wgpu::Backends::all(),
        }
    }
}

struct Viewer {
    config: WindowConfig,
    world: World,
    view: RenderView,
    dispatcher: FrameDispatcher,
    frames: u64,
    setup: Option<SetupFn>,

    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    error: Option<anyhow::Error>,
}

impl Viewer {
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{:#}", err);
        self.error = Some(err);
        event_loop.exit();
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = Arc::new(event_loop.create_window(attrs).context("failed to create window")?);
        log::info!(
            "Window created: {}x{}",
            window.inner_size().width,
            window.inner_size().height
        );

        let mut gpu = pollster::block_on(GpuState::new(window.clone(), self.config.backends))
            .context("failed to initialise renderer")?;

        if let Some(setup) = self.setup.take() {
            setup(&mut self.world, &mut gpu).context("world setup failed")?;
        }
        log::info!(
            "World ready: {} entities, {} meshes",
            self.world.entities().live_count(),
            self.world.meshes().len()
        );

        window.request_redraw();
        self.window = Some(window);
        self.gpu = Some(gpu);
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };

        gpu.begin_frame(&self.view);
        self.dispatcher.frame(&mut self.world, gpu);
        self.frames += 1;

        match gpu.present() {
            Ok(()) => {}
            Err(e) if GpuState::is_surface_lost(&e) => {
                log::warn!("Surface lost/outdated: {e:?}. Recreating.");
                gpu.recreate_surface();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                self.fail(event_loop, anyhow::anyhow!("GPU out of memory"));
                return;
            }
            Err(e) => log::warn!("Frame skipped: {e:?}"),
        }

        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            self.fail(event_loop, e);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested. Exiting event loop.");
                event_loop.exit();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                log::info!("Escape pressed. Exiting event loop.");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                log::debug!("Resized: {}x{}", new_size.width, new_size.height);
                if let Some(gpu) = self.gpu.as_mut() {
                    gpu.resize(new_size.width, new_size.height);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}

/// Open a window and drive `world` through `view` until it is closed.
pub fn run(
    config: WindowConfig,
    world: World,
    view: RenderView,
    setup: impl FnOnce(&mut World, &mut dyn GraphicsDevice) -> Result<()> + 'static,
) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut viewer = Viewer {
        config,
        world,
        view,
        dispatcher: FrameDispatcher::new(),
        frames: 0,
        setup: Some(Box::new(setup)),
        window: None,
        gpu: None,
        error: None,
    };
    event_loop
        .run_app(&mut viewer)
        .map_err(|e| anyhow::anyhow!("Event loop error: {e:?}"))?;

    log::info!("Rendered {} frames", viewer.frames);
    match viewer.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
