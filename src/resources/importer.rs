//! Turns a [`SourceScene`] into a [`ModelData`].
//!
//! The importer walks the node hierarchy depth first, copies every mesh it meets
//! into a [`MeshData`], resolves materials and their textures, and finally derives
//! the transform that scales the whole model into a cube of [`NORMALIZED_SIZE`]
//! resting on the ground.

use std::collections::HashMap;

use cgmath::{Matrix4, Vector3};

use crate::{
    data_structures::{
        bounds::Aabb,
        model::{Material, MeshData, ModelData, ModelVertex},
    },
    error::ImportError,
    resources::{
        scene::{SourceMaterial, SourceMesh, SourceScene},
        texture::{ChannelHint, TextureResolver},
    },
};

/// Side length of the cube an imported model is scaled into.
pub const NORMALIZED_SIZE: f32 = 10.0;
/// Axes whose extent is at or below this fraction of the longest one count as flat.
pub const FLAT_RATIO: f32 = 1e-6;

/// Build the model described by `scene`, resolving textures through `textures`.
pub fn extract_model(
    scene: &SourceScene,
    textures: &mut dyn TextureResolver,
) -> Result<ModelData, ImportError> {
    if scene.incomplete {
        return Err(ImportError::IncompleteScene(scene.name.clone()));
    }
    let root = scene
        .root
        .filter(|&root| root < scene.nodes.len())
        .ok_or_else(|| ImportError::MissingRoot(scene.name.clone()))?;

    let mut materials: HashMap<usize, Material> = HashMap::new();
    let mut meshes = Vec::new();
    for mesh_index in mesh_order(scene, root) {
        let Some(source) = scene.meshes.get(mesh_index) else {
            log::warn!("{}: node refers to missing mesh {mesh_index}", scene.name);
            continue;
        };
        let material = match source.material {
            Some(index) => materials
                .entry(index)
                .or_insert_with(|| match scene.materials.get(index) {
                    Some(material) => resolve_material(material, textures),
                    None => {
                        log::warn!(
                            "{}: mesh {} uses missing material {index}",
                            scene.name,
                            source.name
                        );
                        Material::default()
                    }
                })
                .clone(),
            None => Material::default(),
        };
        if let Some(mesh) = extract_mesh(source, material) {
            meshes.push(mesh);
        }
    }

    let bounds = Aabb::from_points(
        meshes
            .iter()
            .flat_map(|mesh| mesh.vertices.iter().map(|v| v.position)),
    )
    .ok_or_else(|| ImportError::DegenerateGeometry {
        name: scene.name.clone(),
        extent: [0.0; 3],
    })?;
    let transform = normalization_transform(&bounds, &scene.name)?;

    log::info!(
        "Imported {} ({} meshes, {} distinct materials)",
        scene.name,
        meshes.len(),
        materials.len()
    );
    Ok(ModelData {
        name: scene.name.clone(),
        meshes,
        bounds,
        transform,
    })
}

/// Mesh indices in pre-order: a node's own meshes, then each child subtree in
/// declaration order.
///
/// Walks with an explicit stack, so arbitrarily deep hierarchies do not grow the
/// call stack. A node reached a second time is skipped.
pub fn mesh_order(scene: &SourceScene, root: usize) -> Vec<usize> {
    let mut order = Vec::new();
    let mut visited = vec![false; scene.nodes.len()];
    let mut stack = vec![root];
    while let Some(index) = stack.pop() {
        let Some(node) = scene.nodes.get(index) else {
            log::warn!("{}: reference to missing node {index}", scene.name);
            continue;
        };
        if std::mem::replace(&mut visited[index], true) {
            log::warn!(
                "{}: node {} is reachable more than once, skipping it",
                scene.name,
                node.name
            );
            continue;
        }
        order.extend_from_slice(&node.meshes);
        // Reversed so the first child is popped first
        stack.extend(node.children.iter().rev());
    }
    order
}

/// Resolve the textures of a source material and fill in the defaults it leaves out.
pub fn resolve_material(source: &SourceMaterial, textures: &mut dyn TextureResolver) -> Material {
    let defaults = Material::default();
    let mut material = Material {
        diffuse_texture: source
            .diffuse_texture
            .as_ref()
            .and_then(|t| textures.resolve(t, ChannelHint::Rgba)),
        diffuse_color: source
            .diffuse_color
            .map(Vector3::from)
            .unwrap_or(defaults.diffuse_color),
        specular_texture: source
            .specular_texture
            .as_ref()
            .and_then(|t| textures.resolve(t, ChannelHint::Rgb)),
        specular_color: source
            .specular_color
            .map(Vector3::from)
            .unwrap_or(defaults.specular_color),
        shininess: source.shininess.unwrap_or(defaults.shininess),
        shininess_strength: source
            .shininess_strength
            .unwrap_or(defaults.shininess_strength),
    };
    material.correct_black_diffuse();
    material
}

/// Copy one source mesh. Returns `None` for meshes with nothing to draw.
pub fn extract_mesh(source: &SourceMesh, material: Material) -> Option<MeshData> {
    if source.positions.is_empty() || source.indices.is_empty() {
        log::warn!("Skipping mesh {}: it has no vertices or no indices", source.name);
        return None;
    }

    let vertices: Vec<ModelVertex> = source
        .positions
        .iter()
        .enumerate()
        .map(|(i, &position)| ModelVertex {
            position,
            normal: source.normals.get(i).copied().unwrap_or_default(),
            tex_coords: source
                .tex_coords
                .as_ref()
                .and_then(|coords| coords.get(i))
                .copied()
                .unwrap_or_default(),
        })
        .collect();

    let whole_triangles = source.indices.len() - source.indices.len() % 3;
    if whole_triangles != source.indices.len() {
        log::warn!(
            "Mesh {} has {} indices, dropping the trailing partial triangle",
            source.name,
            source.indices.len()
        );
    }
    let vertex_count = vertices.len() as u32;
    let mut indices = Vec::with_capacity(whole_triangles);
    let mut out_of_range = 0;
    for triangle in source.indices[..whole_triangles].chunks_exact(3) {
        if triangle.iter().all(|&i| i < vertex_count) {
            indices.extend_from_slice(triangle);
        } else {
            out_of_range += 1;
        }
    }
    if out_of_range > 0 {
        log::warn!(
            "Mesh {}: dropped {out_of_range} triangles referring to missing vertices",
            source.name
        );
    }
    if indices.is_empty() {
        log::warn!("Skipping mesh {}: no complete triangle left", source.name);
        return None;
    }

    Some(MeshData {
        name: source.name.clone(),
        vertices,
        indices,
        material,
    })
}

/// The transform that centres `bounds` on the origin in X and Z, puts its lowest
/// point on `y = 0` and scales it uniformly so its longest side is [`NORMALIZED_SIZE`].
///
/// Flatness is judged relative to the longest side (see [`FLAT_RATIO`]), so models
/// authored in very small units still normalise. A box without a positive finite
/// extent has no usable scale and is rejected.
pub fn normalization_transform(bounds: &Aabb, name: &str) -> Result<Matrix4<f32>, ImportError> {
    let extent = bounds.extents();
    let axes = [extent.x, extent.y, extent.z];
    let largest = axes.into_iter().fold(0.0, f32::max);
    if !(largest.is_finite() && largest > 0.0) {
        return Err(ImportError::DegenerateGeometry {
            name: name.to_string(),
            extent: extent.into(),
        });
    }
    let flat = axes.into_iter().filter(|&e| e <= largest * FLAT_RATIO).count();
    if flat > 0 {
        log::warn!("{name} is flat (extent {extent:?}), scaling by its remaining axes");
    }
    let scale = NORMALIZED_SIZE / largest;

    let center = bounds.center();
    Ok(Matrix4::from_scale(scale)
        * Matrix4::from_translation(Vector3::new(-center.x, -bounds.min.y, -center.z)))
}
