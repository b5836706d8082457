use std::{iter, sync::Arc};

use winit::window::Window;

use crate::{
    camera::{CameraController, CameraResources, Projection},
    config::ViewerConfig,
    data_structures::{model::Model, texture},
    error::ViewerError,
    pipelines::{
        BindGroupLayouts, Pipelines,
        light::{LightResources, LightUniform},
    },
    render::{self, SceneBindings},
    resources::texture::TextureCache,
};

/// The GPU objects every other part of the viewer is created from.
#[derive(Debug)]
pub struct Gpu {
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl Gpu {
    /// Pick an adapter (compatible with `surface` when given) and open a device on it.
    pub async fn request(
        instance: &wgpu::Instance,
        surface: Option<&wgpu::Surface<'_>>,
    ) -> Result<Self, ViewerError> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: surface,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| ViewerError::ResourceCreation(format!("no suitable adapter: {e}")))?;
        log::info!("Using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| ViewerError::ResourceCreation(format!("no device: {e}")))?;
        Ok(Self {
            adapter,
            device,
            queue,
        })
    }
}

pub fn new_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        ..Default::default()
    })
}

/// Everything needed to draw into the window.
#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: texture::Texture,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub projection: Projection,
    pub light: LightResources,
    pub layouts: BindGroupLayouts,
    pub pipelines: Pipelines,
    pub textures: TextureCache,
    pub clear_colour: wgpu::Color,
    is_surface_configured: bool,
}

impl Context {
    pub async fn new(window: Arc<Window>, viewer: &ViewerConfig) -> Result<Self, ViewerError> {
        let size = window.inner_size();

        let instance = new_instance();
        let surface = instance.create_surface(window.clone())?;
        let Gpu {
            adapter,
            device,
            queue,
        } = Gpu::request(&instance, Some(&surface)).await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shader writes linear colour, so prefer an sRGB surface
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| {
                ViewerError::ResourceCreation("surface supports no format".to_string())
            })?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let settings = &viewer.camera;
        let projection = Projection::new(
            config.width,
            config.height,
            cgmath::Deg(settings.fovy),
            settings.znear,
            settings.zfar,
        );
        let camera = CameraResources::new(&device, CameraController::new(settings), &projection);

        let layouts = BindGroupLayouts::new(&device, camera.bind_group_layout.clone());
        let pipelines = Pipelines::new(&device, config.format, &layouts);

        let [r, g, b, _] = viewer.background.0;
        let light = LightResources::new(
            &device,
            &layouts.light,
            LightUniform::new(&viewer.lights, [r, g, b]),
        );

        let depth_texture = texture::Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            "depth_texture",
        );
        let textures = TextureCache::for_device(&device, &queue);

        Ok(Self {
            window,
            depth_texture,
            surface,
            device,
            queue,
            config,
            camera,
            projection,
            light,
            layouts,
            pipelines,
            textures,
            clear_colour: viewer.background.to_wgpu(),
            is_surface_configured: false,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Reconfigure the surface and depth buffer for a new window size. Zero sizes
    /// (minimized windows) leave everything as it is.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.is_surface_configured = true;
            self.projection.resize(width, height);
            self.surface.configure(&self.device, &self.config);
            self.depth_texture = texture::Texture::create_depth_texture(
                &self.device,
                [self.config.width, self.config.height],
                "depth_texture",
            );
        }
    }

    /// Upload the camera uniform for this frame.
    pub fn update_camera(&mut self) {
        self.camera.write(&self.queue, &self.projection);
    }

    /// Draw one frame to the window.
    pub fn render(
        &self,
        ground: &Model,
        models: &[&Model],
        blend: bool,
    ) -> Result<(), wgpu::SurfaceError> {
        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = render::begin_scene_pass(
                &mut encoder,
                &view,
                &self.depth_texture.view,
                self.clear_colour,
            );
            render::draw_scene(
                &mut render_pass,
                &self.pipelines,
                ground,
                models,
                blend,
                SceneBindings {
                    camera: &self.camera.bind_group,
                    light: &self.light.bind_group,
                },
            );
        }

        self.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}
