//! Inference module: preprocessing, model adapter, formatting and the pipeline
//! tying them together
//!
//! This module provides:
//! - Image decoding, resizing and normalization
//! - The [`Classifier`] trait and its Burn implementation
//! - Arg-max selection and per-class percentage formatting
//! - [`Pipeline`], the shared application context used by every front-end

pub mod classifier;
pub mod pipeline;
pub mod predictor;
pub mod preprocess;

// Re-export main types for convenience
pub use classifier::{BurnClassifier, Classifier};
pub use pipeline::Pipeline;
pub use predictor::{format_prediction, ClassPercentage, PredictionResult};
pub use preprocess::{ImagePreprocessor, ImageTensor, PreprocessConfig, ResizeFilter};
