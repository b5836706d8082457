//! First-person camera: pointer look, keyboard movement inside a fixed box.
//!
//! [`CameraController`] owns the camera state. Pointer samples turn it, [`tick`]
//! moves it along the keys currently held. The view matrix is only rebuilt when it
//! is read after a change; the projection only when the aspect ratio changes.
//!
//! [`tick`]: CameraController::tick

use cgmath::{
    InnerSpace, Matrix4, Point3, Rad, SquareMatrix, Vector3, Vector4, perspective,
};
use instant::Instant;
use wgpu::util::DeviceExt;
use winit::keyboard::KeyCode;

use crate::data_structures::bounds::Aabb;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Pitch stays this far away from straight up or down.
const PITCH_MARGIN: f32 = 0.01;
pub const MAX_PITCH: f32 = std::f32::consts::FRAC_PI_2 - PITCH_MARGIN;
/// Movement intents shorter than this are ignored.
const MIN_INTENT: f32 = 0.1;

/// Start values of the camera, read from the viewer configuration.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub position: [f32; 3],
    /// Radians per pixel of pointer movement.
    pub sensitivity: f32,
    /// Units per second.
    pub move_speed: f32,
    /// Vertical field of view in degrees.
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
    pub bounds_min: [f32; 3],
    pub bounds_max: [f32; 3],
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            position: [0.0, 5.0, 10.0],
            sensitivity: 0.001 * std::f32::consts::FRAC_PI_2,
            move_speed: 10.0,
            fovy: 45.0,
            znear: 0.1,
            zfar: 100.0,
            bounds_min: [-20.0, -10.0, -20.0],
            bounds_max: [20.0, 10.0, 20.0],
        }
    }
}

/// Keys held down right now, as a direction in camera space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MoveIntent {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl MoveIntent {
    /// Record a key press or release. Returns whether the key is a movement key.
    pub fn handle_key(&mut self, key: KeyCode, pressed: bool) -> bool {
        let flag = match key {
            KeyCode::KeyW => &mut self.forward,
            KeyCode::KeyS => &mut self.back,
            KeyCode::KeyA => &mut self.left,
            KeyCode::KeyD => &mut self.right,
            KeyCode::Space => &mut self.up,
            KeyCode::KeyC => &mut self.down,
            _ => return false,
        };
        *flag = pressed;
        true
    }

    /// Release every key, as when the window loses focus.
    pub fn release_all(&mut self) {
        *self = Self::default();
    }

    /// Camera-space direction: -z is forward, +x right, +y up.
    pub fn direction(&self) -> Vector3<f32> {
        let axis = |positive: bool, negative: bool| positive as i8 as f32 - negative as i8 as f32;
        Vector3::new(
            axis(self.right, self.left),
            axis(self.up, self.down),
            axis(self.back, self.forward),
        )
    }
}

#[derive(Debug)]
pub struct CameraController {
    position: Point3<f32>,
    heading: f32,
    pitch: f32,
    forward: Vector3<f32>,
    sensitivity: f32,
    move_speed: f32,
    bounds: Aabb,
    view: Matrix4<f32>,
    view_dirty: bool,
    view_rebuilds: u64,
    last_pointer: Option<(f64, f64)>,
    last_tick: Option<Instant>,
}

impl CameraController {
    pub fn new(settings: &CameraSettings) -> Self {
        Self {
            position: settings.position.into(),
            heading: 0.0,
            pitch: 0.0,
            forward: forward_from(0.0, 0.0),
            sensitivity: settings.sensitivity,
            move_speed: settings.move_speed,
            bounds: Aabb::new(settings.bounds_min, settings.bounds_max),
            view: Matrix4::identity(),
            view_dirty: true,
            view_rebuilds: 0,
            last_pointer: None,
            last_tick: None,
        }
    }

    /// Turn the camera towards a new pointer position.
    ///
    /// The first sample only sets the reference point, so the camera does not jump
    /// to wherever the pointer happens to start.
    pub fn process_pointer(&mut self, x: f64, y: f64) {
        let Some((last_x, last_y)) = self.last_pointer.replace((x, y)) else {
            return;
        };
        let dx = (x - last_x) as f32;
        let dy = (y - last_y) as f32;
        self.heading -= dx * self.sensitivity;
        self.pitch = (self.pitch - dy * self.sensitivity).clamp(-MAX_PITCH, MAX_PITCH);
        self.forward = forward_from(self.heading, self.pitch);
        self.view_dirty = true;
    }

    /// Move for the time passed since the previous tick. The first tick only starts
    /// the clock.
    pub fn tick(&mut self, now: Instant, intent: &MoveIntent) {
        let Some(last) = self.last_tick.replace(now) else {
            return;
        };
        let dt = now.saturating_duration_since(last).as_secs_f32();
        self.advance(dt, intent.direction());
    }

    /// Move `dt` seconds along the camera-space `direction`.
    ///
    /// Per axis, movement further out is refused once the camera is already outside
    /// the bounds; movement back in is always allowed. The camera can therefore end
    /// up at most one step beyond a bound.
    pub fn advance(&mut self, dt: f32, direction: Vector3<f32>) {
        if direction.magnitude() <= MIN_INTENT {
            return;
        }
        let Some(camera_to_world) = self.view_matrix().invert() else {
            return;
        };
        let world = camera_to_world * direction.normalize().extend(0.0);
        let delta = self.constrain(world.truncate() * self.move_speed * dt);
        if delta != Vector3::new(0.0, 0.0, 0.0) {
            self.position += delta;
            self.view_dirty = true;
        }
    }

    fn constrain(&self, mut delta: Vector3<f32>) -> Vector3<f32> {
        for axis in 0..3 {
            let p = self.position[axis];
            let leaving_max = p > self.bounds.max[axis] && delta[axis] > 0.0;
            let leaving_min = p < self.bounds.min[axis] && delta[axis] < 0.0;
            if leaving_max || leaving_min {
                delta[axis] = 0.0;
            }
        }
        delta
    }

    /// The world-to-camera matrix, rebuilt first if the camera moved or turned.
    pub fn view_matrix(&mut self) -> Matrix4<f32> {
        if self.view_dirty {
            self.view = Matrix4::look_at_rh(
                self.position,
                self.position + self.forward,
                Vector3::unit_y(),
            );
            self.view_dirty = false;
            self.view_rebuilds += 1;
        }
        self.view
    }

    /// How often the view matrix has been rebuilt.
    pub fn view_rebuilds(&self) -> u64 {
        self.view_rebuilds
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn forward(&self) -> Vector3<f32> {
        self.forward
    }

    pub fn heading(&self) -> f32 {
        self.heading
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }
}

fn forward_from(heading: f32, pitch: f32) -> Vector3<f32> {
    Vector3::new(
        -pitch.cos() * heading.sin(),
        pitch.sin(),
        -pitch.cos() * heading.cos(),
    )
}

/// Perspective projection, cached until the aspect ratio changes.
#[derive(Debug)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
    matrix: Matrix4<f32>,
    rebuilds: u64,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        let fovy = fovy.into();
        Self {
            aspect,
            fovy,
            znear,
            zfar,
            matrix: perspective(fovy, aspect, znear, zfar),
            rebuilds: 1,
        }
    }

    /// Adapt to a new surface size. Zero sizes (minimized windows) are ignored.
    /// Returns whether the matrix was rebuilt.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        let aspect = width as f32 / height as f32;
        if aspect == self.aspect {
            return false;
        }
        self.aspect = aspect;
        self.matrix = perspective(self.fovy, self.aspect, self.znear, self.zfar);
        self.rebuilds += 1;
        true
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        self.matrix
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }
}

// We need this for Rust to store our data correctly for the shaders
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view: [[f32; 4]; 4],
    proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_position: [0.0; 4],
            view: Matrix4::identity().into(),
            proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &mut CameraController, projection: &Projection) {
        let position: Vector4<f32> = camera.position().to_homogeneous();
        self.view_position = position.into();
        self.view = camera.view_matrix().into();
        self.proj = (OPENGL_TO_WGPU_MATRIX * projection.matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct CameraResources {
    pub controller: CameraController,
    pub intent: MoveIntent,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(
        device: &wgpu::Device,
        mut controller: CameraController,
        projection: &Projection,
    ) -> Self {
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&mut controller, projection);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("camera_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            controller,
            intent: MoveIntent::default(),
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    /// Refresh the uniform from the controller and upload it.
    pub fn write(&mut self, queue: &wgpu::Queue, projection: &Projection) {
        self.uniform
            .update_view_proj(&mut self.controller, projection);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}
