//! Viewer configuration, read from a TOML file.
//!
//! Every section and field is optional; missing values fall back to the defaults
//! below. A minimal file only lists the models:
//!
//! ```toml
//! [[models]]
//! path = "assets/sponza/sponza.obj"
//!
//! [[models]]
//! path = "assets/duck.glb"
//! instances = [[-12.0, 0.0, 0.0], [12.0, 0.0, 0.0]]
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{
    camera::CameraSettings, data_structures::grid::GroundSettings, error::ConfigError,
    pipelines::light::LightSettings,
};

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub models: Vec<ModelEntry>,
    pub window: WindowSettings,
    pub camera: CameraSettings,
    /// Clear colour, also the colour geometry fades into with distance.
    pub background: Background,
    pub ground: GroundSettings,
    pub lights: LightSettings,
}

/// One model to load. Relative paths are resolved against the config file.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ModelEntry {
    pub path: PathBuf,
    /// World-space offsets to draw copies of the model at, added after the model
    /// is normalized. Empty draws the model once.
    #[serde(default)]
    pub instances: Vec<[f32; 3]>,
}

impl ModelEntry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            instances: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "Model Viewer".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Background(pub [f32; 4]);

impl Default for Background {
    fn default() -> Self {
        Self([0.2, 0.2, 0.2, 1.0])
    }
}

impl Background {
    pub fn to_wgpu(self) -> wgpu::Color {
        let [r, g, b, a] = self.0.map(f64::from);
        wgpu::Color { r, g, b, a }
    }
}

impl ViewerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read a config file. Model paths in it are made relative to its directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;
        if let Some(dir) = path.parent() {
            for model in &mut config.models {
                if model.path.is_relative() {
                    model.path = dir.join(&model.path);
                }
            }
        }
        Ok(config)
    }

    /// Build a config from the command line: a single `.toml` argument is read as a
    /// config file, anything else is taken as a list of model files.
    pub fn from_args<I>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let args: Vec<String> = args.into_iter().collect();
        match args.as_slice() {
            [single] if single.ends_with(".toml") => Self::load(single),
            models => Ok(Self {
                models: models.iter().map(ModelEntry::new).collect(),
                ..Default::default()
            }),
        }
    }
}
