//! Error types for importing scenes and running the viewer.
//!
//! Import errors are reported per model: a caller loading several files logs the
//! failing one and keeps going. [`ViewerError`] covers everything the viewer cannot
//! recover from (no adapter, no surface, no window) and is handed back to `main`.

use std::path::PathBuf;

use thiserror::Error;

/// Why a scene file could not be turned into a model.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The file is unreadable or the import library rejected it.
    #[error("could not import {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    /// The file extension does not map to any known importer.
    #[error("unsupported scene format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// The scene has no root node to start the traversal from.
    #[error("{0} has no root node")]
    MissingRoot(String),

    /// The importer flagged the scene as only partially loaded.
    #[error("{0} was only partially imported")]
    IncompleteScene(String),

    /// Every axis of the model's bounding box collapsed, so no scale can be derived.
    #[error("{name} has degenerate bounds (extent {extent:?})")]
    DegenerateGeometry { name: String, extent: [f32; 3] },
}

impl ImportError {
    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Malformed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Problems reading the viewer configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Fatal errors the viewer hands back to the host.
#[derive(Debug, Error)]
pub enum ViewerError {
    /// A GPU object (adapter, device, surface) could not be created.
    #[error("GPU resource creation failed: {0}")]
    ResourceCreation(String),

    #[error("could not create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("could not create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("event loop failed: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
