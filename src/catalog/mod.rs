//! Label catalog and disease knowledge base
//!
//! The classifier only knows class indices. This module turns the label map
//! shipped next to the model (`{"early_blight": 0, ...}`) into an ordered list
//! of display labels, and attaches a human-readable description to each of
//! them.
//!
//! Both tables are built once at startup and never mutated afterwards, so they
//! can be shared freely across request handlers.

pub mod knowledge;

use std::collections::HashMap;
use std::path::Path;

use crate::config::LabelsSection;
use crate::utils::error::{LeafError, Result, ResultExt};

pub use knowledge::{DiseaseKnowledgeBase, TomatoDisease, DESCRIPTION_UNAVAILABLE};

/// Label used whenever a class index has no catalog entry
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Turn a raw class name into its display form.
///
/// Underscores become spaces, the first character is upper-cased and the rest
/// is lower-cased (`"leaf_Mold"` -> `"Leaf mold"`).
pub fn display_label(class_name: &str) -> String {
    let spaced = class_name.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Ordered display labels, one per class index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelCatalog {
    labels: Vec<String>,
}

impl LabelCatalog {
    /// Build the catalog from a `{class_name -> index}` map.
    ///
    /// The indices must form a dense permutation of `0..N`. Negative,
    /// out-of-range or duplicated indices are rejected, so the catalog never
    /// has holes.
    pub fn build(label_to_index: &HashMap<String, i64>) -> Result<Self> {
        let len = label_to_index.len();
        let mut slots: Vec<Option<String>> = vec![None; len];

        for (name, &index) in label_to_index {
            let position = usize::try_from(index)
                .ok()
                .filter(|&i| i < len)
                .ok_or_else(|| {
                    LeafError::Config(format!(
                        "label '{}' has index {} outside 0..{}",
                        name, index, len
                    ))
                })?;

            if let Some(existing) = &slots[position] {
                return Err(LeafError::Config(format!(
                    "index {} is assigned to both '{}' and '{}'",
                    index,
                    existing,
                    display_label(name)
                )));
            }
            slots[position] = Some(display_label(name));
        }

        // Dense and duplicate-free implies every slot is filled
        let labels = slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| slot.with_context(|| format!("no label for index {}", i)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { labels })
    }

    /// Load a JSON label map (`{"early_blight": 0, ...}`) from disk
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(LeafError::Config(format!(
                "label map not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read label map {}", path.display()))?;
        let map: HashMap<String, i64> = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse label map {}", path.display()))?;

        let catalog = Self::build(&map)?;
        tracing::debug!("Loaded {} labels from {:?}", catalog.len(), path);
        Ok(catalog)
    }

    /// Build a catalog directly from display labels in index order
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of classes
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Display label for a class index
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Display label for a class index, or [`UNKNOWN_LABEL`] when out of range
    pub fn label_or_unknown(&self, index: usize) -> &str {
        self.get(index).unwrap_or(UNKNOWN_LABEL)
    }

    /// Index of a display label
    pub fn position(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.position(label).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

/// Load the label catalog and the knowledge base named in the `[labels]` section
pub fn load_tables(labels: &LabelsSection) -> Result<(LabelCatalog, DiseaseKnowledgeBase)> {
    let catalog = LabelCatalog::from_file(&labels.path)?;
    let knowledge = match &labels.descriptions {
        Some(path) => DiseaseKnowledgeBase::from_file(path, &catalog)?,
        None => DiseaseKnowledgeBase::builtin(),
    };
    Ok((catalog, knowledge))
}
