//! Classification pipeline
//!
//! [`Pipeline`] is the application context: it is built once at startup from
//! [`AppConfig`] and then shared read-only by every front-end. A request runs
//! preprocess -> predict -> format and gets either a [`PredictionResult`] or
//! the error of the first stage that failed.

use std::path::Path;
use std::time::{Duration, Instant};

use crate::catalog::{load_tables, DiseaseKnowledgeBase, LabelCatalog};
use crate::config::AppConfig;
use crate::utils::error::Result;

use super::classifier::{BurnClassifier, Classifier};
use super::predictor::{format_prediction, PredictionResult};
use super::preprocess::{ImagePreprocessor, ImageTensor};

/// Label catalog, knowledge base, preprocessor and classifier bundled together
pub struct Pipeline {
    catalog: LabelCatalog,
    knowledge: DiseaseKnowledgeBase,
    preprocessor: ImagePreprocessor,
    classifier: Box<dyn Classifier>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("num_labels", &self.catalog.len())
            .field("num_descriptions", &self.knowledge.len())
            .field("preprocess", self.preprocessor.config())
            .field("num_classes", &self.classifier.num_classes())
            .finish()
    }
}

impl Pipeline {
    pub fn new(
        catalog: LabelCatalog,
        knowledge: DiseaseKnowledgeBase,
        preprocessor: ImagePreprocessor,
        classifier: Box<dyn Classifier>,
    ) -> Self {
        if classifier.num_classes() != catalog.len() {
            tracing::warn!(
                "Classifier produces {} classes but the label map has {} labels; \
                 unmatched indices will be reported as Unknown",
                classifier.num_classes(),
                catalog.len()
            );
        }

        Self {
            catalog,
            knowledge,
            preprocessor,
            classifier,
        }
    }

    /// Load every startup artifact named in `config`.
    ///
    /// Fails on a missing or invalid label map, description file or model.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let (catalog, knowledge) = load_tables(&config.labels)?;
        let classifier = BurnClassifier::load(&config.model.path, &config.model.architecture)?;
        let preprocessor = ImagePreprocessor::new(config.preprocess.clone());

        tracing::info!(
            "Pipeline ready: {} labels, {} descriptions, {}x{} input",
            catalog.len(),
            knowledge.len(),
            config.preprocess.image_size,
            config.preprocess.image_size
        );

        Ok(Self::new(catalog, knowledge, preprocessor, Box::new(classifier)))
    }

    pub fn num_classes(&self) -> usize {
        self.classifier.num_classes()
    }

    /// Run the classifier on an already preprocessed tensor and format the output
    pub fn classify_tensor(&self, tensor: &ImageTensor) -> Result<PredictionResult> {
        let probs = self.classifier.predict(tensor)?;
        format_prediction(&probs, &self.catalog, &self.knowledge)
    }

    /// Full pipeline on raw image bytes
    pub fn classify_bytes(&self, bytes: &[u8]) -> Result<PredictionResult> {
        let tensor = self.preprocessor.preprocess(bytes)?;
        self.classify_tensor(&tensor)
    }

    /// Full pipeline on a file, also reporting how long it took
    pub fn classify_path(&self, path: &Path) -> Result<(PredictionResult, Duration)> {
        let start = Instant::now();
        let tensor = self.preprocessor.preprocess_path(path)?;
        let result = self.classify_tensor(&tensor)?;
        Ok((result, start.elapsed()))
    }
}
