//! Render pipelines and the bind group layouts they share.
//!
//! All pipelines run the same shader and the same four bind groups (material,
//! camera, lights, model transform). They differ in blending, depth handling and
//! whether the vertex stage reads per-instance offsets.

use crate::{
    data_structures::model::Mesh,
    pipelines::light::mk_bind_group_layout as light_layout,
    resources::texture::diffuse_specular_layout,
};

pub mod basic;
pub mod light;
pub mod transparent;

/// Layouts of the four bind groups, in slot order.
#[derive(Debug, Clone)]
pub struct BindGroupLayouts {
    pub material: wgpu::BindGroupLayout,
    pub camera: wgpu::BindGroupLayout,
    pub light: wgpu::BindGroupLayout,
    pub transform: wgpu::BindGroupLayout,
}

impl BindGroupLayouts {
    pub fn new(device: &wgpu::Device, camera: wgpu::BindGroupLayout) -> Self {
        Self {
            material: diffuse_specular_layout(device),
            camera,
            light: light_layout(device),
            transform: transform_layout(device),
        }
    }

    pub fn pipeline_layout(&self, device: &wgpu::Device, label: &str) -> wgpu::PipelineLayout {
        device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &[&self.material, &self.camera, &self.light, &self.transform],
            push_constant_ranges: &[],
        })
    }
}

pub fn transform_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("transform_bind_group_layout"),
    })
}

/// A pipeline for plain meshes and its twin for instanced ones.
#[derive(Debug)]
pub struct PipelineVariants {
    pub plain: wgpu::RenderPipeline,
    pub instanced: wgpu::RenderPipeline,
}

impl PipelineVariants {
    pub fn for_mesh(&self, mesh: &Mesh) -> &wgpu::RenderPipeline {
        if mesh.is_instanced() {
            &self.instanced
        } else {
            &self.plain
        }
    }
}

#[derive(Debug)]
pub struct Pipelines {
    /// Draws the ground behind everything else.
    pub ground: wgpu::RenderPipeline,
    pub opaque: PipelineVariants,
    /// Blends fragments by their diffuse alpha.
    pub blended: PipelineVariants,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        layouts: &BindGroupLayouts,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Model Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("model.wgsl").into()),
        });
        let layout = layouts.pipeline_layout(device, "Model Pipeline Layout");
        Self {
            ground: basic::mk_ground_pipeline(device, &layout, color_format, &shader),
            opaque: basic::mk_basic_pipelines(device, &layout, color_format, &shader),
            blended: transparent::mk_transparent_pipelines(device, &layout, color_format, &shader),
        }
    }

    /// The pipelines models are drawn with, depending on whether blending is on.
    pub fn models(&self, blend: bool) -> &PipelineVariants {
        if blend { &self.blended } else { &self.opaque }
    }
}
