#![allow(dead_code)]

use std::{
    collections::HashSet,
    path::PathBuf,
};

use model_viewer::{
    data_structures::{texture::{TextureId, TextureRef}},
    resources::{
        scene::{SourceMaterial, SourceMesh, SourceNode, SourceScene},
        texture::{ChannelHint, TextureCache, TextureResolver},
    },
};

/// A fresh directory under the system temp dir, unique per test name and process.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join("model-viewer-tests")
        .join(format!("{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

/// Resolves textures without a GPU: the cache stores the key, and every load and
/// every lookup is recorded.
pub struct RecordingResolver {
    pub cache: TextureCache<String>,
    pub lookups: Vec<(String, ChannelHint)>,
    pub loads: Vec<String>,
    pub broken: HashSet<String>,
}

impl RecordingResolver {
    pub fn new() -> Self {
        Self {
            cache: TextureCache::new("fallback".to_string()),
            lookups: Vec::new(),
            loads: Vec::new(),
            broken: HashSet::new(),
        }
    }

    pub fn with_broken(keys: &[&str]) -> Self {
        Self {
            broken: keys.iter().map(|k| k.to_string()).collect(),
            ..Self::new()
        }
    }

    /// The key a handle handed out by this resolver points at.
    pub fn key_of(&self, id: Option<TextureId>) -> &str {
        self.cache.resolve(id)
    }
}

impl TextureResolver for RecordingResolver {
    fn resolve(&mut self, texture: &TextureRef, hint: ChannelHint) -> Option<TextureId> {
        self.lookups.push((texture.key.clone(), hint));
        let loads = &mut self.loads;
        let broken = &self.broken;
        self.cache.get_or_insert_with(&texture.key, || {
            loads.push(texture.key.clone());
            if broken.contains(&texture.key) {
                anyhow::bail!("cannot decode {}", texture.key);
            }
            Ok(texture.key.clone())
        })
    }
}

/// A single triangle spanning `[0, size]` on X and Y, placed at depth `z`.
pub fn triangle(name: &str, size: f32, z: f32, material: Option<usize>) -> SourceMesh {
    SourceMesh {
        name: name.to_string(),
        positions: vec![[0.0, 0.0, z], [size, 0.0, z], [0.0, size, z]],
        normals: vec![[0.0, 0.0, 1.0]; 3],
        tex_coords: Some(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]),
        indices: vec![0, 1, 2],
        material,
    }
}

pub fn node(name: &str, meshes: &[usize], children: &[usize]) -> SourceNode {
    SourceNode {
        name: name.to_string(),
        meshes: meshes.to_vec(),
        children: children.to_vec(),
    }
}

/// A scene whose root is node 0.
pub fn scene(nodes: Vec<SourceNode>, meshes: Vec<SourceMesh>, materials: Vec<SourceMaterial>) -> SourceScene {
    SourceScene {
        name: "test scene".to_string(),
        nodes,
        root: Some(0),
        meshes,
        materials,
        incomplete: false,
    }
}

pub fn textured_material(diffuse: &str, diffuse_color: [f32; 3]) -> SourceMaterial {
    SourceMaterial {
        name: diffuse.to_string(),
        diffuse_texture: Some(TextureRef::file(diffuse)),
        diffuse_color: Some(diffuse_color),
        ..Default::default()
    }
}
