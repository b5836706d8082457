use cgmath::{Deg, InnerSpace, Vector3};
use serde::Deserialize;
use wgpu::util::DeviceExt;

/// Lights the shader evaluates at most.
pub const MAX_LIGHTS: usize = 4;

/// Extra cone angle over which a spotlight fades out, in degrees.
const SPOT_FALLOFF: f32 = 5.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightKind {
    Point,
    Spot,
}

impl LightKind {
    fn shader_id(self) -> u32 {
        match self {
            LightKind::Point => 0,
            LightKind::Spot => 1,
        }
    }
}

/// One light as it is written in the configuration.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct LightConfig {
    pub kind: LightKind,
    pub position: [f32; 3],
    /// Where a spotlight points. Ignored for point lights.
    #[serde(default = "down")]
    pub direction: [f32; 3],
    /// Full cone angle of a spotlight in degrees.
    #[serde(default = "default_angle")]
    pub angle: f32,
    #[serde(default = "white")]
    pub color: [f32; 3],
}

fn down() -> [f32; 3] {
    [0.0, -1.0, 0.0]
}

fn default_angle() -> f32 {
    45.0
}

fn white() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LightSettings {
    pub ambient: [f32; 3],
    /// How quickly geometry fades into the background with distance.
    pub fog_density: f32,
    pub lights: Vec<LightConfig>,
}

impl Default for LightSettings {
    fn default() -> Self {
        Self {
            ambient: [0.1, 0.1, 0.1],
            fog_density: 0.02,
            lights: vec![
                LightConfig {
                    kind: LightKind::Spot,
                    position: [0.0, 25.0, 15.0],
                    direction: [0.0, -25.0, -15.0],
                    angle: 60.0,
                    color: white(),
                },
                LightConfig {
                    kind: LightKind::Point,
                    position: [-15.0, 20.0, -10.0],
                    direction: down(),
                    angle: default_angle(),
                    color: [0.6, 0.6, 0.6],
                },
            ],
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Light {
    pub position: [f32; 3],
    pub kind: u32,
    pub direction: [f32; 3],
    /// Cosine of the angle beyond which a spotlight contributes nothing.
    pub cutoff_cos: f32,
    pub color: [f32; 3],
    /// Cosine of the angle within which a spotlight shines at full strength.
    pub cutoff_start_cos: f32,
}

impl Light {
    pub fn point(position: [f32; 3], color: [f32; 3]) -> Self {
        Self {
            position,
            kind: LightKind::Point.shader_id(),
            direction: down(),
            cutoff_cos: -1.0,
            color,
            cutoff_start_cos: -1.0,
        }
    }

    /// A spotlight with a cone of `angle` that softens over a few more degrees.
    pub fn spot(position: [f32; 3], direction: [f32; 3], angle: Deg<f32>, color: [f32; 3]) -> Self {
        let direction = Vector3::from(direction);
        let direction = if direction.magnitude2() > 0.0 {
            direction.normalize()
        } else {
            Vector3::from(down())
        };
        let half = angle.0 / 2.0;
        Self {
            position,
            kind: LightKind::Spot.shader_id(),
            direction: direction.into(),
            cutoff_cos: (half + SPOT_FALLOFF).to_radians().cos(),
            color,
            cutoff_start_cos: half.to_radians().cos(),
        }
    }
}

impl From<&LightConfig> for Light {
    fn from(config: &LightConfig) -> Self {
        match config.kind {
            LightKind::Point => Light::point(config.position, config.color),
            LightKind::Spot => {
                Light::spot(config.position, config.direction, Deg(config.angle), config.color)
            }
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    pub ambient: [f32; 3],
    pub count: u32,
    pub fog_color: [f32; 3],
    pub fog_density: f32,
    pub lights: [Light; MAX_LIGHTS],
}

impl LightUniform {
    /// Pack the configured lights. Lights beyond [`MAX_LIGHTS`] are dropped with a warning.
    pub fn new(settings: &LightSettings, fog_color: [f32; 3]) -> Self {
        if settings.lights.len() > MAX_LIGHTS {
            log::warn!(
                "{} lights configured, only the first {MAX_LIGHTS} are used",
                settings.lights.len()
            );
        }
        let mut lights = [Light::default(); MAX_LIGHTS];
        let mut count = 0;
        for (slot, config) in lights.iter_mut().zip(&settings.lights) {
            *slot = Light::from(config);
            count += 1;
        }
        Self {
            ambient: settings.ambient,
            count,
            fog_color,
            fog_density: settings.fog_density,
            lights,
        }
    }
}

#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl LightResources {
    pub fn new(
        device: &wgpu::Device,
        bind_group_layout: &wgpu::BindGroupLayout,
        uniform: LightUniform,
    ) -> Self {
        let buffer = mk_buffer(device, uniform);
        let bind_group = mk_bind_group(device, bind_group_layout, &buffer);
        Self {
            uniform,
            buffer,
            bind_group,
        }
    }
}

pub fn mk_buffer(device: &wgpu::Device, light_uniform: LightUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Light Buffer"),
        contents: bytemuck::cast_slice(&[light_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
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
        label: Some("light_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    light_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: light_buffer.as_entire_binding(),
        }],
        label: Some("light_bind_group"),
    })
}
