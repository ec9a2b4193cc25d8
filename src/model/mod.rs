//! Model module for the CNN architecture built with the Burn framework
//!
//! The architecture is only needed to give the trained record a shape to load
//! into. Training happens elsewhere.

pub mod cnn;
pub mod config;

// Re-export main types for convenience
pub use cnn::PlantClassifier;
pub use config::PlantClassifierConfig;
