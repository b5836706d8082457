//! Meshes, materials and models, on the CPU and on the GPU.
//!
//! The importer produces [`ModelData`] (plain vectors, no GPU involvement), which
//! [`crate::resources::mesh::upload_model`] turns into a [`Model`] whose [`Mesh`]es
//! own their buffers.

use std::ops::Range;

use cgmath::{InnerSpace, Matrix4, SquareMatrix, Vector3};
use wgpu::util::DeviceExt;

use crate::data_structures::{bounds::Aabb, instance::InstanceRaw, texture::TextureId};

/// Describes how a vertex type is laid out in a vertex buffer.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Surface properties of a mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub diffuse_texture: Option<TextureId>,
    pub diffuse_color: Vector3<f32>,
    pub specular_texture: Option<TextureId>,
    pub specular_color: Vector3<f32>,
    pub shininess: f32,
    /// Scales the specular term.
    pub shininess_strength: f32,
}

impl Material {
    pub const DEFAULT_SHININESS: f32 = 25.0;
    pub const DEFAULT_SHININESS_STRENGTH: f32 = 1.0;

    /// Diffuse colours shorter than this count as black.
    const BLACK_THRESHOLD: f32 = 0.01;

    /// A textured material must not have a black diffuse colour: the texture is
    /// multiplied by it and would vanish. Such colours are reset to white.
    pub fn correct_black_diffuse(&mut self) {
        if self.diffuse_texture.is_some() && self.diffuse_color.magnitude() < Self::BLACK_THRESHOLD
        {
            self.diffuse_color = Vector3::new(1.0, 1.0, 1.0);
        }
    }

    pub fn to_uniform(&self) -> MaterialUniform {
        MaterialUniform {
            diffuse_color: self.diffuse_color.into(),
            shininess: self.shininess,
            specular_color: self.specular_color.into(),
            shininess_strength: self.shininess_strength,
            has_diffuse_texture: self.diffuse_texture.is_some() as u32,
            has_specular_texture: self.specular_texture.is_some() as u32,
            _padding: [0; 2],
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            diffuse_texture: None,
            diffuse_color: Vector3::new(1.0, 1.0, 1.0),
            specular_texture: None,
            specular_color: Vector3::new(1.0, 1.0, 1.0),
            shininess: Self::DEFAULT_SHININESS,
            shininess_strength: Self::DEFAULT_SHININESS_STRENGTH,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub diffuse_color: [f32; 3],
    pub shininess: f32,
    pub specular_color: [f32; 3],
    pub shininess_strength: f32,
    pub has_diffuse_texture: u32,
    pub has_specular_texture: u32,
    // Uniforms are sized in multiples of 16 bytes
    _padding: [u32; 2],
}

/// One renderable surface before upload.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    /// Triangle list, always a multiple of three long.
    pub indices: Vec<u32>,
    pub material: Material,
}

/// An imported model before upload.
#[derive(Clone, Debug)]
pub struct ModelData {
    pub name: String,
    /// Meshes in pre-order of the source hierarchy.
    pub meshes: Vec<MeshData>,
    pub bounds: Aabb,
    /// Moves the model onto the ground and scales it into a 10 unit cube.
    pub transform: Matrix4<f32>,
}

/// A mesh living on the GPU. Its buffers are released when it is dropped.
#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
    pub material: Material,
    #[allow(unused)]
    pub(crate) material_buffer: wgpu::Buffer,
    pub(crate) material_bind_group: wgpu::BindGroup,
    pub(crate) instance_buffer: Option<wgpu::Buffer>,
    pub(crate) num_instances: u32,
}

impl Mesh {
    /// Place copies of this mesh at `positions`; from now on it is drawn instanced.
    ///
    /// The first call creates the instance buffer. Later calls overwrite it, or grow
    /// it when more positions are passed than it can hold.
    pub fn set_instances(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        positions: &[Vector3<f32>],
    ) {
        let raw: Vec<InstanceRaw> = positions.iter().copied().map(InstanceRaw::from).collect();
        let bytes: &[u8] = bytemuck::cast_slice(&raw);
        match &self.instance_buffer {
            Some(buffer) if buffer.size() >= bytes.len() as wgpu::BufferAddress => {
                queue.write_buffer(buffer, 0, bytes);
            }
            _ => {
                self.instance_buffer = Some(device.create_buffer_init(
                    &wgpu::util::BufferInitDescriptor {
                        label: Some(&format!("{} Instance Buffer", self.name)),
                        contents: bytes,
                        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                    },
                ));
            }
        }
        self.num_instances = positions.len() as u32;
    }

    pub fn is_instanced(&self) -> bool {
        self.instance_buffer.is_some()
    }

    pub fn instance_count(&self) -> u32 {
        self.num_instances
    }

    /// Instances the draw call covers: a single one until instances are set.
    pub fn instance_range(&self) -> Range<u32> {
        if self.is_instanced() {
            0..self.num_instances
        } else {
            0..1
        }
    }
}

/// The model transform as it is stored in the GPU buffer.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TransformUniform {
    pub model: [[f32; 4]; 4],
}

impl From<Matrix4<f32>> for TransformUniform {
    fn from(model: Matrix4<f32>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

impl Default for TransformUniform {
    fn default() -> Self {
        Matrix4::identity().into()
    }
}

/// An uploaded model: its meshes plus the bind group of its normalization transform.
#[derive(Debug)]
pub struct Model {
    pub name: String,
    pub meshes: Vec<Mesh>,
    pub bounds: Aabb,
    pub transform: Matrix4<f32>,
    #[allow(unused)]
    pub(crate) transform_buffer: wgpu::Buffer,
    pub(crate) transform_bind_group: wgpu::BindGroup,
}

impl Model {
    /// Instance every mesh of the model at the same `positions`.
    pub fn set_instances(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        positions: &[Vector3<f32>],
    ) {
        for mesh in &mut self.meshes {
            mesh.set_instances(device, queue, positions);
        }
    }

    pub fn transform_bind_group(&self) -> &wgpu::BindGroup {
        &self.transform_bind_group
    }
}

/// Bind group slots shared by every pipeline in the viewer.
pub mod groups {
    pub const MATERIAL: u32 = 0;
    pub const CAMERA: u32 = 1;
    pub const LIGHT: u32 = 2;
    pub const TRANSFORM: u32 = 3;
}

/// Draw helpers on top of a render pass.
///
/// The caller sets the pipeline: instanced meshes need the instanced variant.
pub trait DrawModel {
    fn draw_mesh(
        &mut self,
        mesh: &Mesh,
        camera_bind_group: &wgpu::BindGroup,
        light_bind_group: &wgpu::BindGroup,
        transform_bind_group: &wgpu::BindGroup,
    );
}

impl DrawModel for wgpu::RenderPass<'_> {
    fn draw_mesh(
        &mut self,
        mesh: &Mesh,
        camera_bind_group: &wgpu::BindGroup,
        light_bind_group: &wgpu::BindGroup,
        transform_bind_group: &wgpu::BindGroup,
    ) {
        self.set_bind_group(groups::MATERIAL, &mesh.material_bind_group, &[]);
        self.set_bind_group(groups::CAMERA, camera_bind_group, &[]);
        self.set_bind_group(groups::LIGHT, light_bind_group, &[]);
        self.set_bind_group(groups::TRANSFORM, transform_bind_group, &[]);
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        if let Some(instances) = &mesh.instance_buffer {
            self.set_vertex_buffer(1, instances.slice(..));
        }
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(0..mesh.num_elements, 0, mesh.instance_range());
    }
}
