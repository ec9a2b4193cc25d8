//! # Tomato Leaf
//!
//! Tomato leaf disease classification with the Burn framework.
//!
//! An uploaded leaf photo is decoded, resized and scaled, fed to a trained
//! CNN, and the output is turned into a label, a per-class percentage
//! breakdown and a short description of the disease.
//!
//! ## Modules
//!
//! - `catalog`: label map loading and the disease knowledge base
//! - `inference`: preprocessing, the classifier adapter, formatting and the pipeline
//! - `model`: CNN architecture built with Burn
//! - `upload`: upload validation and scratch storage
//! - `config`: TOML configuration
//! - `utils`: logging, errors and formatting helpers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tomato_leaf::{AppConfig, Pipeline};
//!
//! let config = AppConfig::load_or_default(None)?;
//! let pipeline = Pipeline::from_config(&config)?;
//! let result = pipeline.classify_bytes(&std::fs::read("leaf.jpg")?)?;
//! println!("{}", result.display());
//! ```

pub mod backend;
pub mod catalog;
pub mod config;
pub mod inference;
pub mod model;
pub mod upload;
pub mod utils;

// Re-export commonly used items for convenience
pub use catalog::{DiseaseKnowledgeBase, LabelCatalog, TomatoDisease};
pub use config::AppConfig;
pub use inference::{Classifier, Pipeline, PredictionResult};
pub use upload::{StoredUpload, UploadStore};
pub use utils::error::{LeafError, Result};

/// Default model input size (width and height)
pub const IMAGE_SIZE: u32 = 224;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
