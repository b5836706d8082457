use std::path::Path;

use crate::{
    data_structures::{model::{Model, ModelData}, texture::Texture},
    error::ImportError,
    pipelines::BindGroupLayouts,
    resources::{
        scene::SourceScene,
        texture::{GpuTextureLoader, TextureCache, TextureResolver},
    },
};

/**
 * This module contains all logic for loading meshes and textures from external files
 * and turning them into GPU resources.
 */
pub mod importer;
pub mod mesh;
pub mod scene;
pub mod texture;

/// Read a scene file and build its model data, resolving textures through `textures`.
pub fn import_scene(
    path: impl AsRef<Path>,
    textures: &mut dyn TextureResolver,
) -> Result<ModelData, ImportError> {
    let path = path.as_ref();
    log::info!("Importing {}", path.display());
    let scene = SourceScene::open(path)?;
    importer::extract_model(&scene, textures)
}

/// Import a scene file and upload it, sharing textures through `cache`.
pub fn load_model(
    path: impl AsRef<Path>,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    cache: &mut TextureCache<Texture>,
    layouts: &BindGroupLayouts,
) -> Result<Model, ImportError> {
    let data = import_scene(
        path,
        &mut GpuTextureLoader {
            cache: &mut *cache,
            device,
            queue,
        },
    )?;
    Ok(mesh::upload_model(device, &data, cache, layouts))
}
