use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        model::{Mesh, MeshData, Model, ModelData, TransformUniform},
        texture::Texture,
    },
    pipelines::BindGroupLayouts,
    resources::texture::TextureCache,
};

/**
 * Creates the GPU side of one mesh: vertex and index buffers plus the material
 * bind group. Empty texture slots are bound to the cache's white fallback.
 */
pub fn upload_mesh(
    device: &wgpu::Device,
    data: &MeshData,
    textures: &TextureCache<Texture>,
    layouts: &BindGroupLayouts,
) -> Mesh {
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{:?} Vertex Buffer", data.name)),
        contents: bytemuck::cast_slice(&data.vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });

    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{:?} Index Buffer", data.name)),
        contents: bytemuck::cast_slice(&data.indices),
        usage: wgpu::BufferUsages::INDEX,
    });

    let material_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{:?} Material Buffer", data.name)),
        contents: bytemuck::cast_slice(&[data.material.to_uniform()]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });

    let diffuse = textures.resolve(data.material.diffuse_texture);
    let specular = textures.resolve(data.material.specular_texture);
    let material_bind_group = material_bind_group(
        device,
        &data.name,
        layouts,
        diffuse,
        specular,
        &material_buffer,
    );

    Mesh {
        name: data.name.clone(),
        vertex_buffer,
        index_buffer,
        num_elements: data.indices.len() as u32,
        material: data.material.clone(),
        material_buffer,
        material_bind_group,
        instance_buffer: None,
        num_instances: 0,
    }
}

fn material_bind_group(
    device: &wgpu::Device,
    name: &str,
    layouts: &BindGroupLayouts,
    diffuse: &Texture,
    specular: &Texture,
    material_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: &layouts.material,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&diffuse.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&diffuse.sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(&specular.view),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::Sampler(&specular.sampler),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: material_buffer.as_entire_binding(),
            },
        ],
        label: Some(&format!("{name} material bind group")),
    })
}

/// Upload every mesh of `data` and the buffer holding its normalization transform.
pub fn upload_model(
    device: &wgpu::Device,
    data: &ModelData,
    textures: &TextureCache<Texture>,
    layouts: &BindGroupLayouts,
) -> Model {
    let meshes = data
        .meshes
        .iter()
        .map(|mesh| upload_mesh(device, mesh, textures, layouts))
        .collect();

    let transform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{:?} Transform Buffer", data.name)),
        contents: bytemuck::cast_slice(&[TransformUniform::from(data.transform)]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });
    let transform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: &layouts.transform,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: transform_buffer.as_entire_binding(),
        }],
        label: Some(&format!("{} transform bind group", data.name)),
    });

    Model {
        name: data.name.clone(),
        meshes,
        bounds: data.bounds,
        transform: data.transform,
        transform_buffer,
        transform_bind_group,
    }
}
