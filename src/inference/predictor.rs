//! Prediction formatting
//!
//! Turns a raw probability vector into the labelled, display-ready
//! [`PredictionResult`] shared by every front-end.

use serde::{Deserialize, Serialize};

use crate::catalog::{DiseaseKnowledgeBase, LabelCatalog};
use crate::utils::error::{LeafError, Result};
use crate::utils::format_percentage;

/// One row of the per-class breakdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassPercentage {
    pub label: String,
    /// Probability formatted as `"12.34%"`
    pub percentage: String,
}

/// Result of a single prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Label of the most likely class, `"Unknown"` if the catalog has no entry for it
    pub top_label: String,

    /// Index of the most likely class
    pub top_index: usize,

    /// Raw probability of the most likely class
    pub confidence: f32,

    /// Every class in index order with its formatted percentage
    pub per_class: Vec<ClassPercentage>,

    /// Description of the top label
    pub description: String,
}

impl PredictionResult {
    /// Pretty print the prediction result
    pub fn display(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "Prediction: {} (class {})\n",
            self.top_label, self.top_index
        ));
        output.push_str(&format!("Confidence: {}\n", format_percentage(self.confidence)));
        output.push_str(&format!("\n{}\n", self.description));

        output.push_str("\nAll classes:\n");
        for row in &self.per_class {
            output.push_str(&format!("  {:<20} {:>8}\n", row.label, row.percentage));
        }

        output
    }
}

/// Index of the first maximum. NaN never wins.
pub fn stable_argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &value) in values.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        match best {
            Some((_, best_value)) if value <= best_value => {}
            _ => best = Some((i, value)),
        }
    }
    best.map(|(i, _)| i)
}

/// Build a [`PredictionResult`] from raw probabilities.
///
/// Ties go to the lowest index. Indices past the end of `catalog` are labelled
/// `"Unknown"` instead of failing, since a model/label-map mismatch should
/// still produce an answer.
pub fn format_prediction(
    probs: &[f32],
    catalog: &LabelCatalog,
    knowledge: &DiseaseKnowledgeBase,
) -> Result<PredictionResult> {
    let top_index = stable_argmax(probs).ok_or_else(|| {
        LeafError::Inference("classifier returned no usable probabilities".to_string())
    })?;

    let top_label = catalog.label_or_unknown(top_index).to_string();

    let per_class = probs
        .iter()
        .enumerate()
        .map(|(i, &p)| ClassPercentage {
            label: catalog.label_or_unknown(i).to_string(),
            percentage: format_percentage(p),
        })
        .collect();

    let description = knowledge.describe(&top_label).to_string();

    Ok(PredictionResult {
        top_label,
        top_index,
        confidence: probs[top_index],
        per_class,
        description,
    })
}
