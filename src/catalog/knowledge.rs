//! Disease knowledge base
//!
//! Static descriptions shown next to a prediction.

use std::collections::HashMap;
use std::path::Path;

use crate::utils::error::{LeafError, Result, ResultExt};

use super::LabelCatalog;

/// Text returned for labels without a description
pub const DESCRIPTION_UNAVAILABLE: &str = "Description unavailable.";

/// Tomato leaf conditions the classifier ships with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TomatoDisease {
    EarlyBlight,
    LateBlight,
    LeafMold,
    Healthy,
}

impl TomatoDisease {
    pub const ALL: [TomatoDisease; 4] = [
        TomatoDisease::EarlyBlight,
        TomatoDisease::LateBlight,
        TomatoDisease::LeafMold,
        TomatoDisease::Healthy,
    ];

    /// Display label, as produced by [`super::display_label`]
    pub fn label(&self) -> &'static str {
        match self {
            TomatoDisease::EarlyBlight => "Early blight",
            TomatoDisease::LateBlight => "Late blight",
            TomatoDisease::LeafMold => "Leaf mold",
            TomatoDisease::Healthy => "Healthy",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            TomatoDisease::EarlyBlight => {
                "Early blight shows up as dark, concentric spots that spread upwards from \
                 the lower leaves. It is caused by the fungus Alternaria solani."
            }
            TomatoDisease::LateBlight => {
                "Late blight causes dark, water-soaked lesions. The disease spreads quickly \
                 and makes leaves turn yellow and rot."
            }
            TomatoDisease::LeafMold => {
                "Leaf mold appears as yellow patches on the upper side of the leaf with grey \
                 mould underneath. It mostly occurs in humid conditions."
            }
            TomatoDisease::Healthy => {
                "The leaf is healthy. No disease symptoms were found."
            }
        }
    }
}

/// Mapping from display label to description text
#[derive(Debug, Clone)]
pub struct DiseaseKnowledgeBase {
    entries: HashMap<String, String>,
}

impl Default for DiseaseKnowledgeBase {
    fn default() -> Self {
        Self::builtin()
    }
}

impl DiseaseKnowledgeBase {
    /// Descriptions for the built-in tomato classes
    pub fn builtin() -> Self {
        let entries = TomatoDisease::ALL
            .into_iter()
            .map(|d| (d.label().to_string(), d.description().to_string()))
            .collect();
        Self { entries }
    }

    /// Built-in descriptions extended with a JSON file of `{label: description}`.
    ///
    /// Every key must be a label of `catalog`; a typo in the file is a startup
    /// error instead of a silent fallback at request time.
    pub fn from_file(path: &Path, catalog: &LabelCatalog) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read descriptions {}", path.display()))?;
        let overrides: HashMap<String, String> = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse descriptions {}", path.display()))?;

        let mut kb = Self::builtin();
        kb.extend(overrides, catalog)?;
        tracing::debug!("Loaded {} descriptions from {:?}", kb.len(), path);
        Ok(kb)
    }

    /// Add or replace descriptions, rejecting labels unknown to `catalog`
    pub fn extend(
        &mut self,
        entries: HashMap<String, String>,
        catalog: &LabelCatalog,
    ) -> Result<()> {
        let mut unknown: Vec<&str> = entries
            .keys()
            .filter(|label| !catalog.contains(label))
            .map(String::as_str)
            .collect();

        if !unknown.is_empty() {
            unknown.sort_unstable();
            return Err(LeafError::Config(format!(
                "descriptions reference unknown labels: {}",
                unknown.join(", ")
            )));
        }

        self.entries.extend(entries);
        Ok(())
    }

    /// Description for `label`, or [`DESCRIPTION_UNAVAILABLE`]
    pub fn describe(&self, label: &str) -> &str {
        self.entries
            .get(label)
            .map(String::as_str)
            .unwrap_or(DESCRIPTION_UNAVAILABLE)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
