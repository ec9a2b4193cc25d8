//! Application configuration
//!
//! Everything the pipeline and the front-ends need at startup. Values come from
//! an optional TOML file; command line flags override individual fields.
//!
//! ```toml
//! [model]
//! path = "models/tomato.mpk"
//!
//! [model.architecture]
//! num_classes = 4
//!
//! [labels]
//! path = "label_map.json"
//! descriptions = "descriptions.json"
//!
//! [preprocess]
//! image_size = 224
//! filter = "nearest"
//!
//! [uploads]
//! dir = "static/uploads"
//! purge_on_startup = false
//!
//! [server]
//! port = 5000
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::inference::preprocess::PreprocessConfig;
use crate::model::PlantClassifierConfig;
use crate::utils::error::{LeafError, Result, ResultExt};

/// Trained model location and architecture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSection {
    /// Burn record file (`CompactRecorder`, `.mpk`)
    pub path: PathBuf,
    pub architecture: PlantClassifierConfig,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("models/tomato.mpk"),
            architecture: PlantClassifierConfig::default(),
        }
    }
}

/// Label map and optional description overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelsSection {
    /// JSON object `{class_name: index}`
    pub path: PathBuf,
    /// JSON object `{display_label: description}` merged over the built-ins
    pub descriptions: Option<PathBuf>,
}

impl Default for LabelsSection {
    fn default() -> Self {
        Self {
            path: PathBuf::from("label_map.json"),
            descriptions: None,
        }
    }
}

/// Paths the server routes itself; uploads cannot be mounted on or under them
pub const RESERVED_PATHS: [&str; 2] = ["/api", "/health"];

/// Scratch directory for uploaded images
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub dir: PathBuf,
    /// Public URL prefix under which `dir` is served
    pub url_prefix: String,
    /// Delete leftover uploads when the server starts
    pub purge_on_startup: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("static/uploads"),
            url_prefix: "/static/uploads".to_string(),
            purge_on_startup: false,
        }
    }
}

impl UploadConfig {
    /// `url_prefix` without trailing slashes, the path uploads are mounted at
    pub fn mount_path(&self) -> &str {
        self.url_prefix.trim_end_matches('/')
    }

    fn validate(&self) -> Result<()> {
        let mount = self.mount_path();
        if !self.url_prefix.starts_with('/') {
            return Err(LeafError::Config(format!(
                "uploads.url_prefix must start with '/', got '{}'",
                self.url_prefix
            )));
        }
        if mount.is_empty() {
            return Err(LeafError::Config(
                "uploads.url_prefix cannot be the site root".to_string(),
            ));
        }
        let clashes = RESERVED_PATHS
            .iter()
            .any(|reserved| mount == *reserved || mount.starts_with(&format!("{}/", reserved)));
        if clashes {
            return Err(LeafError::Config(format!(
                "uploads.url_prefix '{}' overlaps a server route",
                self.url_prefix
            )));
        }
        Ok(())
    }
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    /// Maximum accepted request body in bytes
    pub max_upload_bytes: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            max_upload_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelSection,
    pub labels: LabelsSection,
    pub preprocess: PreprocessConfig,
    pub uploads: UploadConfig,
    pub server: ServerSection,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        if self.preprocess.image_size == 0 {
            return Err(LeafError::Config(
                "preprocess.image_size must be greater than 0".to_string(),
            ));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(LeafError::Config(
                "server.max_upload_bytes must be greater than 0".to_string(),
            ));
        }
        self.uploads.validate()?;
        self.model.architecture.validate()
    }
}
