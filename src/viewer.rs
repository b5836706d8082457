//! The application host and event loop.
//!
//! [`Viewer`] implements winit's [`ApplicationHandler`]. It owns the GPU
//! [`Context`], the ground and the imported models, and turns window and device
//! events into camera input. Each redraw follows the same order: pointer samples
//! that arrived since the last frame have already been applied, then the camera
//! ticks once, then its uniform is written, then the frame is drawn.
//!
//! # Key bindings
//!
//! | Key            | Action                      |
//! |----------------|-----------------------------|
//! | W / S          | forward / back              |
//! | A / D          | left / right                |
//! | Space / C      | up / down                   |
//! | Mouse          | look around                 |
//! | Left / Right   | previous / next model       |
//! | B              | toggle alpha blending       |
//! | Escape         | quit                        |

use std::sync::Arc;

use cgmath::Vector3;
use instant::Instant;
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Window},
};

use crate::{
    config::ViewerConfig,
    context::Context,
    data_structures::{grid::build_ground, model::Model},
    error::ViewerError,
    resources::{self, mesh::upload_model},
};

const KEY_BINDINGS: &str = "\
W/S: forward/back, A/D: left/right, Space/C: up/down, mouse: look around, \
Left/Right: switch model, B: toggle alpha blending, Escape: quit";

/// Everything that exists once the window is up.
pub struct ViewerState {
    pub ctx: Context,
    pub ground: Model,
    pub models: Vec<Model>,
    current: usize,
    blend: bool,
    pointer: (f64, f64),
}

impl ViewerState {
    /// Create the GPU context for `window` and load the ground and every configured model.
    ///
    /// Models that fail to import are logged and left out.
    pub async fn new(window: Arc<Window>, config: &ViewerConfig) -> Result<Self, ViewerError> {
        let mut ctx = Context::new(window, config).await?;

        let ground = upload_model(
            &ctx.device,
            &build_ground(&config.ground),
            &ctx.textures,
            &ctx.layouts,
        );

        let mut models = Vec::with_capacity(config.models.len());
        for entry in &config.models {
            match resources::load_model(
                &entry.path,
                &ctx.device,
                &ctx.queue,
                &mut ctx.textures,
                &ctx.layouts,
            ) {
                Ok(mut model) => {
                    if !entry.instances.is_empty() {
                        let positions: Vec<Vector3<f32>> =
                            entry.instances.iter().copied().map(Vector3::from).collect();
                        model.set_instances(&ctx.device, &ctx.queue, &positions);
                    }
                    models.push(model);
                }
                Err(e) => log::error!("Skipping {}: {e}", entry.path.display()),
            }
        }
        log::info!(
            "Loaded {} of {} models, {} textures cached",
            models.len(),
            config.models.len(),
            ctx.textures.len()
        );

        Ok(Self {
            ctx,
            ground,
            models,
            current: 0,
            blend: false,
            pointer: (0.0, 0.0),
        })
    }

    /// Feed an absolute pointer position to the camera.
    pub fn on_pointer_move(&mut self, x: f64, y: f64) {
        self.ctx.camera.controller.process_pointer(x, y);
    }

    /// Advance the camera to `now` with the currently held movement keys.
    pub fn on_tick(&mut self, now: Instant) {
        let camera = &mut self.ctx.camera;
        camera.controller.tick(now, &camera.intent);
    }

    pub fn on_resize(&mut self, width: u32, height: u32) {
        self.ctx.resize(width, height);
    }

    /// Upload the camera and draw the ground plus the selected model.
    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        self.ctx.update_camera();
        let selected: Vec<&Model> = self.models.get(self.current).into_iter().collect();
        self.ctx.render(&self.ground, &selected, self.blend)
    }

    /// Step through the loaded models, wrapping around at both ends.
    pub fn cycle_model(&mut self, forward: bool) {
        let count = self.models.len();
        if count == 0 {
            return;
        }
        self.current = if forward {
            (self.current + 1) % count
        } else {
            (self.current + count - 1) % count
        };
        log::info!("Showing {}", self.models[self.current].name);
    }

    pub fn toggle_blend(&mut self) {
        self.blend = !self.blend;
        log::info!("Alpha blending {}", if self.blend { "on" } else { "off" });
    }

    /// Drop every held movement key. Key releases that happen while the
    /// window is unfocused are never delivered.
    pub fn on_focus_lost(&mut self) {
        self.ctx.camera.intent.release_all();
    }
}

pub struct Viewer {
    config: ViewerConfig,
    state: Option<ViewerState>,
    error: Option<ViewerError>,
}

impl Viewer {
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            config,
            state: None,
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: ViewerError) {
        log::error!("{error}");
        self.error = Some(error);
        event_loop.exit();
    }
}

fn grab_cursor(window: &Window) {
    let grabbed = window
        .set_cursor_grab(CursorGrabMode::Locked)
        .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
    if let Err(e) = grabbed {
        log::warn!("Could not grab the cursor: {e}");
    }
    window.set_cursor_visible(false);
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let settings = &self.config.window;
        let window_attributes = Window::default_attributes()
            .with_title(settings.title.clone())
            .with_inner_size(winit::dpi::PhysicalSize::new(
                settings.width,
                settings.height,
            ));
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };
        grab_cursor(&window);

        match futures::executor::block_on(ViewerState::new(window, &self.config)) {
            Ok(mut state) => {
                let size = state.ctx.window().inner_size();
                state.on_resize(size.width, size.height);
                log::info!("Controls: {KEY_BINDINGS}");
                state.ctx.window().request_redraw();
                self.state = Some(state);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            state.pointer.0 += dx;
            state.pointer.1 += dy;
            let (x, y) = state.pointer;
            state.on_pointer_move(x, y);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.on_resize(size.width, size.height),
            WindowEvent::Focused(false) => state.on_focus_lost(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: key_state,
                        repeat,
                        ..
                    },
                ..
            } => {
                let pressed = key_state == ElementState::Pressed;
                match code {
                    KeyCode::Escape if pressed => event_loop.exit(),
                    KeyCode::ArrowLeft if pressed => state.cycle_model(false),
                    KeyCode::ArrowRight if pressed => state.cycle_model(true),
                    KeyCode::KeyB if pressed && !repeat => state.toggle_blend(),
                    _ => {
                        state.ctx.camera.intent.handle_key(code, pressed);
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                state.on_tick(Instant::now());
                match state.render() {
                    Ok(()) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.ctx.window().inner_size();
                        state.on_resize(size.width, size.height);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Out of GPU memory, quitting");
                        event_loop.exit();
                    }
                    Err(e) => log::warn!("Unable to render {e}"),
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.ctx.window().request_redraw();
        }
    }
}

/// Open the window and run until it is closed.
pub fn run(config: ViewerConfig) -> Result<(), ViewerError> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    }

    let event_loop = EventLoop::new()?;
    let mut viewer = Viewer::new(config);
    event_loop.run_app(&mut viewer)?;

    match viewer.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
