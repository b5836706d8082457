//! Viewer data structures: models, textures, instances and the ground.
//!
//! - `model` contains vertex, material and mesh definitions, CPU and GPU side
//! - `texture` contains the GPU texture wrapper and the handles materials use
//! - `instance` holds the per-instance data of instanced meshes
//! - `bounds` is the axis-aligned box used for normalization and camera bounds
//! - `grid` builds the ground plane with its grid lines

pub mod bounds;
pub mod grid;
pub mod instance;
pub mod model;
pub mod texture;
