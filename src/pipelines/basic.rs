use crate::{
    data_structures::{
        instance::InstanceRaw,
        model::{ModelVertex, Vertex},
        texture::Texture,
    },
    pipelines::PipelineVariants,
};

/// Fixed-function state that differs between the viewer's pipelines.
#[derive(Debug, Clone, Copy)]
pub struct RenderState {
    pub blend: Option<wgpu::BlendState>,
    pub cull_mode: Option<wgpu::Face>,
    pub depth_write_enabled: bool,
    pub depth_compare: wgpu::CompareFunction,
}

impl RenderState {
    pub const OPAQUE: Self = Self {
        blend: Some(wgpu::BlendState {
            alpha: wgpu::BlendComponent::REPLACE,
            color: wgpu::BlendComponent::REPLACE,
        }),
        cull_mode: Some(wgpu::Face::Back),
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::Less,
    };
}

pub fn mk_basic_pipelines(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    shader: &wgpu::ShaderModule,
) -> PipelineVariants {
    mk_variants(device, layout, color_format, shader, RenderState::OPAQUE, "Opaque")
}

/**
 * The ground is drawn first and never tested against depth, so whatever is drawn
 * afterwards covers it. It writes no depth either: models below y = 0 still show.
 * Both faces are drawn so the grid is visible from underneath.
 */
pub fn mk_ground_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    shader: &wgpu::ShaderModule,
) -> wgpu::RenderPipeline {
    mk_render_pipeline(
        device,
        layout,
        color_format,
        RenderState {
            cull_mode: None,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::Always,
            ..RenderState::OPAQUE
        },
        Some(Texture::DEPTH_FORMAT),
        &[ModelVertex::desc()],
        shader,
        "vs_main",
        "Ground Pipeline",
    )
}

/// Build the plain and the instanced pipeline for the same render state.
pub fn mk_variants(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    shader: &wgpu::ShaderModule,
    state: RenderState,
    label: &str,
) -> PipelineVariants {
    PipelineVariants {
        plain: mk_render_pipeline(
            device,
            layout,
            color_format,
            state,
            Some(Texture::DEPTH_FORMAT),
            &[ModelVertex::desc()],
            shader,
            "vs_main",
            &format!("{label} Pipeline"),
        ),
        instanced: mk_render_pipeline(
            device,
            layout,
            color_format,
            state,
            Some(Texture::DEPTH_FORMAT),
            &[ModelVertex::desc(), InstanceRaw::desc()],
            shader,
            "vs_instanced",
            &format!("{label} Instanced Pipeline"),
        ),
    }
}

#[allow(clippy::too_many_arguments)]
pub fn mk_render_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    color_format: wgpu::TextureFormat,
    state: RenderState,
    depth_format: Option<wgpu::TextureFormat>,
    vertex_layouts: &[wgpu::VertexBufferLayout],
    shader: &wgpu::ShaderModule,
    vertex_entry: &str,
    label: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        cache: None,
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some(vertex_entry),
            buffers: vertex_layouts,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: state.blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: state.cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: depth_format.map(|format| wgpu::DepthStencilState {
            format,
            depth_write_enabled: state.depth_write_enabled,
            depth_compare: state.depth_compare,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
    })
}
