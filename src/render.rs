//! Frame composition and pipeline batching.
//!
//! Meshes are sorted into [`Batch`]es by the pipeline they need, so each pipeline
//! is set once per frame. The ground always goes first with its own pipeline.
//!
//! # Key types
//!
//! - [`Draw`] is one mesh with the transform bind group of its model
//! - [`Batch`] is a pipeline together with the draws that use it
//! - [`SceneBindings`] holds the per-frame camera and light bind groups

use wgpu::RenderPass;

use crate::{
    data_structures::model::{DrawModel, Mesh, Model},
    pipelines::{PipelineVariants, Pipelines},
};

/// Bind groups that are the same for every draw of a frame.
#[derive(Clone, Copy)]
pub struct SceneBindings<'a> {
    pub camera: &'a wgpu::BindGroup,
    pub light: &'a wgpu::BindGroup,
}

pub struct Draw<'a> {
    pub mesh: &'a Mesh,
    pub transform: &'a wgpu::BindGroup,
}

pub struct Batch<'a> {
    pub pipeline: &'a wgpu::RenderPipeline,
    pub draws: Vec<Draw<'a>>,
}

/// Group the meshes of `models` by the pipeline [`PipelineVariants::for_mesh`] picks,
/// keeping their order within each batch. Batches appear in the order their first
/// mesh does.
pub fn batch_models<'a>(variants: &'a PipelineVariants, models: &[&'a Model]) -> Vec<Batch<'a>> {
    let mut batches: Vec<Batch<'a>> = Vec::new();
    for &model in models {
        for mesh in &model.meshes {
            if mesh.is_instanced() && mesh.instance_count() == 0 {
                log::warn!("Mesh {} is instanced with zero instances, skipping it", mesh.name);
                continue;
            }
            let draw = Draw {
                mesh,
                transform: model.transform_bind_group(),
            };
            let pipeline = variants.for_mesh(mesh);
            match batches.iter_mut().find(|b| std::ptr::eq(b.pipeline, pipeline)) {
                Some(batch) => batch.draws.push(draw),
                None => batches.push(Batch {
                    pipeline,
                    draws: vec![draw],
                }),
            }
        }
    }
    batches
}

pub fn draw_batches(render_pass: &mut RenderPass<'_>, batches: &[Batch<'_>], bindings: SceneBindings<'_>) {
    for batch in batches {
        render_pass.set_pipeline(batch.pipeline);
        for draw in &batch.draws {
            render_pass.draw_mesh(draw.mesh, bindings.camera, bindings.light, draw.transform);
        }
    }
}

/// Record the ground and then `models` into `render_pass`.
pub fn draw_scene(
    render_pass: &mut RenderPass<'_>,
    pipelines: &Pipelines,
    ground: &Model,
    models: &[&Model],
    blend: bool,
    bindings: SceneBindings<'_>,
) {
    render_pass.set_pipeline(&pipelines.ground);
    for mesh in &ground.meshes {
        render_pass.draw_mesh(
            mesh,
            bindings.camera,
            bindings.light,
            ground.transform_bind_group(),
        );
    }

    let batches = batch_models(pipelines.models(blend), models);
    draw_batches(render_pass, &batches, bindings);
}

/// Start the pass every frame renders into: clears colour to `clear` and depth to 1.
pub fn begin_scene_pass<'e>(
    encoder: &'e mut wgpu::CommandEncoder,
    color: &wgpu::TextureView,
    depth: &wgpu::TextureView,
    clear: wgpu::Color,
) -> RenderPass<'e> {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("Render Pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: color,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(clear),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: depth,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        occlusion_query_set: None,
        timestamp_writes: None,
    })
}
