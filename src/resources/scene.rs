//! Scene files adapted into one importer-independent shape.
//!
//! [`SourceScene`] is what the importer walks: a node arena with a root, the meshes
//! the nodes point at and the materials the meshes point at. Wavefront OBJ is read
//! with `tobj`, glTF 2.0 with `gltf`.

use std::path::{Path, PathBuf};

use crate::{data_structures::texture::TextureRef, error::ImportError};

/// An element of the scene hierarchy.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceNode {
    pub name: String,
    /// Indices into [`SourceScene::meshes`].
    pub meshes: Vec<usize>,
    /// Indices into [`SourceScene::nodes`], in declaration order.
    pub children: Vec<usize>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    /// Empty when the file has no normals.
    pub normals: Vec<[f32; 3]>,
    /// Texture coordinate set 0, `None` when the file has none.
    pub tex_coords: Option<Vec<[f32; 2]>>,
    pub indices: Vec<u32>,
    /// Index into [`SourceScene::materials`].
    pub material: Option<usize>,
}

/// Material properties as the file states them. Absent values take the viewer's defaults.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceMaterial {
    pub name: String,
    pub diffuse_texture: Option<TextureRef>,
    pub specular_texture: Option<TextureRef>,
    pub diffuse_color: Option<[f32; 3]>,
    pub specular_color: Option<[f32; 3]>,
    pub shininess: Option<f32>,
    pub shininess_strength: Option<f32>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SourceScene {
    /// Used in logs and error messages.
    pub name: String,
    pub nodes: Vec<SourceNode>,
    pub root: Option<usize>,
    pub meshes: Vec<SourceMesh>,
    pub materials: Vec<SourceMaterial>,
    /// Set when the file could only be read in part.
    pub incomplete: bool,
}

impl SourceScene {
    /// Read a scene file, picking the reader by file extension.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ImportError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("obj") => Self::from_obj(path),
            Some("gltf") | Some("glb") => Self::from_gltf(path),
            _ => Err(ImportError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    pub fn root_node(&self) -> Option<&SourceNode> {
        self.root.and_then(|root| self.nodes.get(root))
    }

    /// Read a Wavefront OBJ file and the MTL libraries it references.
    ///
    /// OBJ has no hierarchy: every object becomes a child of a single root node.
    /// Point and line elements are ignored.
    /// Texture V coordinates are flipped to the top-left origin wgpu samples with.
    pub fn from_obj(path: &Path) -> Result<Self, ImportError> {
        let (models, obj_materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ignore_points: true,
                ignore_lines: true,
                ..Default::default()
            },
        )
        .map_err(|e| ImportError::malformed(path, e))?;

        let base = base_dir(path);
        let materials = match obj_materials {
            Ok(materials) => materials
                .into_iter()
                .map(|m| SourceMaterial {
                    diffuse_texture: non_empty(m.diffuse_texture).map(|t| TextureRef::file(base.join(t))),
                    specular_texture: non_empty(m.specular_texture).map(|t| TextureRef::file(base.join(t))),
                    diffuse_color: m.diffuse,
                    specular_color: m.specular,
                    shininess: m.shininess,
                    shininess_strength: None,
                    name: m.name,
                })
                .collect(),
            Err(e) => {
                log::warn!(
                    "Materials of {} could not be loaded, using defaults: {e}",
                    path.display()
                );
                Vec::new()
            }
        };

        let mut scene = SourceScene {
            name: path.display().to_string(),
            nodes: vec![SourceNode {
                name: "root".to_string(),
                ..Default::default()
            }],
            root: Some(0),
            materials,
            ..Default::default()
        };
        for model in models {
            let m = model.mesh;
            let vertex_count = m.positions.len() / 3;
            let positions = m.positions.chunks_exact(3).map(|p| [p[0], p[1], p[2]]).collect();
            let normals = if m.normals.len() >= vertex_count * 3 {
                m.normals.chunks_exact(3).map(|n| [n[0], n[1], n[2]]).collect()
            } else {
                Vec::new()
            };
            let tex_coords = (!m.texcoords.is_empty() && m.texcoords.len() >= vertex_count * 2)
                .then(|| {
                    m.texcoords
                        .chunks_exact(2)
                        .map(|t| [t[0], 1.0 - t[1]])
                        .collect()
                });
            let material = m
                .material_id
                .filter(|&id| id < scene.materials.len());

            let mesh_index = scene.meshes.len();
            scene.meshes.push(SourceMesh {
                name: model.name.clone(),
                positions,
                normals,
                tex_coords,
                indices: m.indices,
                material,
            });
            let node_index = scene.nodes.len();
            scene.nodes.push(SourceNode {
                name: model.name,
                meshes: vec![mesh_index],
                children: Vec::new(),
            });
            scene.nodes[0].children.push(node_index);
        }
        Ok(scene)
    }

    /// Read a glTF 2.0 file (`.gltf` with external or embedded buffers, or `.glb`).
    ///
    /// Every triangle primitive becomes one mesh; other primitive modes are skipped.
    /// A triangle primitive whose positions or indices cannot be read marks the
    /// scene incomplete.
    /// The node hierarchy of the default scene (or the first one) is kept as is, below
    /// a synthetic root when the scene has more than one top-level node.
    pub fn from_gltf(path: &Path) -> Result<Self, ImportError> {
        let gltf::Gltf { document, blob } =
            gltf::Gltf::open(path).map_err(|e| ImportError::malformed(path, e))?;
        let buffers = gltf::import_buffers(&document, Some(base_dir(path)), blob)
            .map_err(|e| ImportError::malformed(path, e))?;

        let mut scene = SourceScene {
            name: path.display().to_string(),
            ..Default::default()
        };

        scene.materials = document
            .materials()
            .map(|material| gltf_material(path, &buffers, &material))
            .collect();

        // Source meshes of every glTF mesh, one per triangle primitive
        let mut primitives_of_mesh = Vec::new();
        for mesh in document.meshes() {
            let mesh_name = mesh.name().unwrap_or("unnamed mesh");
            let mut indices_of_primitives = Vec::new();
            for primitive in mesh.primitives() {
                if primitive.mode() != gltf::mesh::Mode::Triangles {
                    log::warn!(
                        "Skipping primitive {} of {mesh_name}: {:?} is not a triangle list",
                        primitive.index(),
                        primitive.mode()
                    );
                    continue;
                }
                let reader =
                    primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| d.0.as_slice()));
                // Accessors running past their buffer view read as None
                let Some(positions) = reader.read_positions() else {
                    log::warn!(
                        "Primitive {} of {mesh_name} has unreadable positions",
                        primitive.index()
                    );
                    scene.incomplete = true;
                    continue;
                };
                let positions: Vec<[f32; 3]> = positions.collect();
                let indices = match (reader.read_indices(), primitive.indices()) {
                    (Some(indices), _) => indices.into_u32().collect(),
                    (None, None) => (0..positions.len() as u32).collect(),
                    (None, Some(_)) => {
                        log::warn!(
                            "Primitive {} of {mesh_name} has unreadable indices",
                            primitive.index()
                        );
                        scene.incomplete = true;
                        continue;
                    }
                };
                let normals = reader.read_normals().map(Iterator::collect).unwrap_or_default();
                let tex_coords = reader
                    .read_tex_coords(0)
                    .map(|coords| coords.into_f32().collect());
                indices_of_primitives.push(scene.meshes.len());
                scene.meshes.push(SourceMesh {
                    name: format!("{mesh_name}#{}", primitive.index()),
                    positions,
                    normals,
                    tex_coords,
                    indices,
                    material: primitive.material().index(),
                });
            }
            primitives_of_mesh.push(indices_of_primitives);
        }

        scene.nodes = document
            .nodes()
            .map(|node| SourceNode {
                name: node.name().unwrap_or("unnamed node").to_string(),
                meshes: node
                    .mesh()
                    .and_then(|mesh| primitives_of_mesh.get(mesh.index()))
                    .cloned()
                    .unwrap_or_default(),
                children: node.children().map(|child| child.index()).collect(),
            })
            .collect();

        let gltf_scene = document
            .default_scene()
            .or_else(|| document.scenes().next());
        let root = gltf_scene.map(|s| {
            let top_level: Vec<usize> = s.nodes().map(|n| n.index()).collect();
            match top_level.as_slice() {
                [single] => *single,
                _ => {
                    scene.nodes.push(SourceNode {
                        name: s.name().unwrap_or("scene").to_string(),
                        meshes: Vec::new(),
                        children: top_level,
                    });
                    scene.nodes.len() - 1
                }
            }
        });
        scene.root = root;
        Ok(scene)
    }
}

fn base_dir(path: &Path) -> &Path {
    path.parent().unwrap_or_else(|| Path::new("."))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn gltf_material(
    path: &Path,
    buffers: &[gltf::buffer::Data],
    material: &gltf::Material,
) -> SourceMaterial {
    let pbr = material.pbr_metallic_roughness();
    let [r, g, b, _] = pbr.base_color_factor();
    let specular = material.specular();
    SourceMaterial {
        name: material.name().unwrap_or("unnamed material").to_string(),
        diffuse_texture: pbr
            .base_color_texture()
            .and_then(|info| gltf_texture(path, buffers, info.texture())),
        specular_texture: specular
            .as_ref()
            .and_then(|s| s.specular_color_texture())
            .and_then(|info| gltf_texture(path, buffers, info.texture())),
        diffuse_color: Some([r, g, b]),
        specular_color: specular.as_ref().map(|s| s.specular_color_factor()),
        shininess: None,
        shininess_strength: specular.as_ref().map(|s| s.specular_factor()),
    }
}

/// Locate the image behind a glTF texture. Images inside a buffer view are keyed by
/// the scene path and the image index.
fn gltf_texture(
    path: &Path,
    buffers: &[gltf::buffer::Data],
    texture: gltf::Texture,
) -> Option<TextureRef> {
    let image = texture.source();
    match image.source() {
        gltf::image::Source::View { view, .. } => {
            let buffer = buffers.get(view.buffer().index())?;
            let bytes = buffer.0.get(view.offset()..view.offset() + view.length())?;
            Some(TextureRef::embedded(
                format!("{}#image{}", path.display(), image.index()),
                bytes,
            ))
        }
        gltf::image::Source::Uri { uri, .. } if uri.starts_with("data:") => {
            log::warn!(
                "Image {} of {} is a data URI, which is not supported",
                image.index(),
                path.display()
            );
            None
        }
        gltf::image::Source::Uri { uri, .. } => {
            let joined: PathBuf = base_dir(path).join(uri);
            Some(TextureRef::file(joined))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_extension_is_rejected() {
        let err = SourceScene::open("model.fbx").unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedFormat(_)));
    }

    #[test]
    fn extension_match_ignores_case() {
        // Recognised, so the failure comes from the missing file rather than the format
        let err = SourceScene::open("does/not/exist.OBJ").unwrap_err();
        assert!(matches!(err, ImportError::Malformed { .. }));
    }
}
