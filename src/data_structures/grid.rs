//! The ground: a flat square with a grid of thin lines laid over it.
//!
//! Both parts are plain [`ModelData`] so they go through the same upload and draw
//! path as imported models. The ground pipeline ignores depth, so the lines only
//! have to come after the plane in the mesh list to show on top of it.

use cgmath::{Matrix4, SquareMatrix, Vector3};

use crate::data_structures::{
    bounds::Aabb,
    model::{Material, MeshData, ModelData, ModelVertex},
};

/// Dimensions and colour of the ground.
#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct GroundSettings {
    /// Half the side length of the square.
    pub size: f32,
    /// Distance between two neighbouring grid lines.
    pub line_interval: f32,
    pub line_width: f32,
    pub color: [f32; 3],
    pub line_color: [f32; 3],
}

impl Default for GroundSettings {
    fn default() -> Self {
        Self {
            size: 50.0,
            line_interval: 1.0,
            line_width: 0.1,
            color: [22.0 / 256.0, 121.0 / 256.0, 113.0 / 256.0],
            line_color: [1.0, 1.0, 1.0],
        }
    }
}

const UP: [f32; 3] = [0.0, 1.0, 0.0];

fn vertex(x: f32, z: f32) -> ModelVertex {
    ModelVertex {
        position: [x, 0.0, z],
        normal: UP,
        tex_coords: [0.0, 0.0],
    }
}

/// Append the quad spanned by two opposite corners on the ground plane.
fn push_quad(mesh: &mut MeshData, (x0, z0): (f32, f32), (x1, z1): (f32, f32)) {
    let base = mesh.vertices.len() as u32;
    mesh.vertices.extend([
        vertex(x0, z0),
        vertex(x1, z0),
        vertex(x0, z1),
        vertex(x1, z1),
    ]);
    mesh.indices
        .extend([base, base + 2, base + 1, base + 1, base + 2, base + 3]);
}

fn flat_material(color: [f32; 3]) -> Material {
    Material {
        diffuse_color: color.into(),
        specular_color: Vector3::new(0.0, 0.0, 0.0),
        ..Default::default()
    }
}

/// Build the ground plane and its grid lines.
///
/// Lines run along both axes at every multiple of `line_interval` strictly inside
/// the square, so no line sits on the border.
pub fn build_ground(settings: &GroundSettings) -> ModelData {
    let size = settings.size;
    let mut plane = MeshData {
        name: "ground".to_string(),
        vertices: Vec::with_capacity(4),
        indices: Vec::with_capacity(6),
        material: flat_material(settings.color),
    };
    push_quad(&mut plane, (-size, -size), (size, size));

    let mut lines = MeshData {
        name: "ground grid".to_string(),
        vertices: Vec::new(),
        indices: Vec::new(),
        material: flat_material(settings.line_color),
    };
    if settings.line_interval > 0.0 {
        let half_width = settings.line_width / 2.0;
        let count = ((2.0 * size) / settings.line_interval - 0.5).floor().max(0.0) as u32;
        for i in 1..=count {
            let at = -size + i as f32 * settings.line_interval;
            push_quad(&mut lines, (at - half_width, -size), (at + half_width, size));
            push_quad(&mut lines, (-size, at - half_width), (size, at + half_width));
        }
    }

    let mut meshes = vec![plane];
    if !lines.indices.is_empty() {
        meshes.push(lines);
    }
    ModelData {
        name: "ground".to_string(),
        meshes,
        bounds: Aabb::new([-size, 0.0, -size], [size, 0.0, size]),
        transform: Matrix4::identity(),
    }
}
