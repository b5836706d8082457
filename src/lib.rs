//! model-viewer
//!
//! An interactive viewer for OBJ and glTF scenes. Each imported scene is flattened
//! into a list of meshes, its textures are shared through a path-keyed cache, and
//! it is rescaled to rest on the ground inside a fixed-size volume. A free-flying
//! camera walks around it inside a bounding box.
//!
//! High-level modules
//! - `camera`: camera controller with a lazily rebuilt view matrix, projection and uniforms
//! - `config`: viewer configuration read from TOML
//! - `context`: GPU and window context that owns device/queue/pipelines
//! - `data_structures`: meshes, materials, instances, textures and bounds
//! - `error`: error types for importing and running the viewer
//! - `pipelines`: render pipelines and the light setup
//! - `resources`: scene import, texture cache and GPU upload
//! - `render`: frame composition with pipeline batching
//! - `viewer`: the winit application and its event loop
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod viewer;

pub use config::ViewerConfig;
pub use error::{ConfigError, ImportError, ViewerError};
pub use resources::{import_scene, load_model};
pub use viewer::run;
