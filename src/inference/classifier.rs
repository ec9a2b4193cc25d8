//! Classifier adapter
//!
//! [`Classifier`] is the seam between the pipeline and whatever produces class
//! probabilities. [`BurnClassifier`] is the production implementation backed by
//! a trained [`PlantClassifier`] record.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use burn::module::Module;
use burn::record::CompactRecorder;
use burn::tensor::{Tensor, TensorData};

use crate::backend::{default_device, InferenceBackend};
use crate::model::{PlantClassifier, PlantClassifierConfig};
use crate::utils::error::{LeafError, Result};

use super::preprocess::ImageTensor;

/// Something that maps a preprocessed image to per-class probabilities
pub trait Classifier: Send + Sync {
    /// Number of values returned by [`Classifier::predict`]
    fn num_classes(&self) -> usize;

    /// Raw per-class output for a `[1, H, W, 3]` tensor, in class-index order.
    /// Values are returned as produced by the model, without renormalisation.
    fn predict(&self, input: &ImageTensor) -> Result<Vec<f32>>;
}

/// Burn-backed classifier loaded from a `CompactRecorder` file
pub struct BurnClassifier {
    model: Mutex<PlantClassifier<InferenceBackend>>,
    num_classes: usize,
    model_path: PathBuf,
}

impl std::fmt::Debug for BurnClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BurnClassifier")
            .field("model_path", &self.model_path)
            .field("num_classes", &self.num_classes)
            .finish()
    }
}

impl BurnClassifier {
    /// Load trained weights for the architecture described by `config`
    pub fn load(model_path: &Path, config: &PlantClassifierConfig) -> Result<Self> {
        if !model_path.exists() {
            return Err(LeafError::ModelLoad(
                model_path.to_path_buf(),
                "file not found".to_string(),
            ));
        }

        config
            .validate()
            .map_err(|e| LeafError::ModelLoad(model_path.to_path_buf(), e.to_string()))?;

        let start = Instant::now();
        let device = default_device();
        let model: PlantClassifier<InferenceBackend> = PlantClassifier::new(config, &device)
            .load_file(model_path, &CompactRecorder::new(), &device)
            .map_err(|e| LeafError::ModelLoad(model_path.to_path_buf(), format!("{:?}", e)))?;

        tracing::info!(
            "Loaded model {:?} ({} classes) in {:.1} ms",
            model_path,
            config.num_classes,
            start.elapsed().as_secs_f64() * 1000.0
        );

        Ok(Self {
            num_classes: model.num_classes(),
            model: Mutex::new(model),
            model_path: model_path.to_path_buf(),
        })
    }

    /// Wrap an in-memory model
    pub fn from_model(model: PlantClassifier<InferenceBackend>) -> Self {
        Self {
            num_classes: model.num_classes(),
            model: Mutex::new(model),
            model_path: PathBuf::new(),
        }
    }
}

impl Classifier for BurnClassifier {
    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn predict(&self, input: &ImageTensor) -> Result<Vec<f32>> {
        let [batch, height, width, channels] = input.shape();
        let device = default_device();

        // NHWC -> NCHW for the convolution layers
        let data = TensorData::new(input.data().to_vec(), [batch, height, width, channels]);
        let tensor =
            Tensor::<InferenceBackend, 4>::from_floats(data, &device).permute([0, 3, 1, 2]);

        let model = self
            .model
            .lock()
            .map_err(|_| LeafError::Inference("model lock poisoned".to_string()))?;
        let output = model.forward_softmax(tensor);
        drop(model);

        let probs: Vec<f32> = output
            .into_data()
            .to_vec()
            .map_err(|e| LeafError::Inference(format!("failed to read probabilities: {:?}", e)))?;

        if probs.len() != batch * self.num_classes {
            return Err(LeafError::Inference(format!(
                "expected {} outputs, model produced {}",
                batch * self.num_classes,
                probs.len()
            )));
        }

        Ok(probs)
    }
}
