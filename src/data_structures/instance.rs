//! Per-instance data for instanced mesh drawing.
//!
//! An instanced mesh is drawn once per entry of its instance buffer, each copy
//! shifted by that entry's offset in world space, after the model transform.

use cgmath::Vector3;

use crate::data_structures::model;

/**
 * The raw instance is the data stored on the GPU: one offset per copy.
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    pub offset: [f32; 3],
}

impl From<Vector3<f32>> for InstanceRaw {
    fn from(position: Vector3<f32>) -> Self {
        Self {
            offset: position.into(),
        }
    }
}

impl model::Vertex for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            // Advance once per instance rather than once per vertex
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[wgpu::VertexAttribute {
                offset: 0,
                // Locations 0..=2 are taken by ModelVertex
                shader_location: 3,
                format: wgpu::VertexFormat::Float32x3,
            }],
        }
    }
}
