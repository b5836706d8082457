use crate::pipelines::{
    PipelineVariants,
    basic::{RenderState, mk_variants},
};

/**
 * Pipelines that blend each fragment over what is already drawn, weighted by the
 * alpha of the diffuse texture.
 *
 * Depth is still written, so blended surfaces only show what was drawn before
 * them. Meshes are drawn in import order.
 */
pub fn mk_transparent_pipelines(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    shader: &wgpu::ShaderModule,
) -> PipelineVariants {
    mk_variants(
        device,
        layout,
        color_format,
        shader,
        RenderState {
            blend: Some(wgpu::BlendState::ALPHA_BLENDING),
            ..RenderState::OPAQUE
        },
        "Blended",
    )
}
