//! Model Configuration Module
//!
//! Architecture hyperparameters needed to rebuild the network before its
//! trained weights are loaded from disk.

use serde::{Deserialize, Serialize};

use crate::utils::error::{LeafError, Result};

/// Configuration for the PlantClassifier CNN model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantClassifierConfig {
    /// Number of output classes (4 for the tomato label map)
    pub num_classes: usize,

    /// Input image size the network was trained on (assumes square images)
    pub input_size: usize,

    /// Dropout rate used during training (inactive at inference)
    pub dropout_rate: f64,

    /// Number of input channels (3 for RGB)
    pub in_channels: usize,

    /// Base number of convolutional filters, doubled by every block
    pub base_filters: usize,

    /// Number of conv/pool blocks in the feature extractor
    pub conv_blocks: usize,

    /// Units of the hidden fully connected layer
    pub hidden_units: usize,
}

impl Default for PlantClassifierConfig {
    fn default() -> Self {
        Self {
            num_classes: 4,
            input_size: 224,
            dropout_rate: 0.3,
            in_channels: 3,
            base_filters: 32,
            conv_blocks: 4,
            hidden_units: 256,
        }
    }
}

impl PlantClassifierConfig {
    /// Create a configuration with a custom number of classes
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            ..Default::default()
        }
    }

    /// Configure base filters
    pub fn with_base_filters(mut self, base_filters: usize) -> Self {
        self.base_filters = base_filters;
        self
    }

    pub fn with_conv_blocks(mut self, conv_blocks: usize) -> Self {
        self.conv_blocks = conv_blocks;
        self
    }

    /// Channels produced by the last block
    pub fn feature_channels(&self) -> usize {
        self.base_filters << self.conv_blocks.saturating_sub(1)
    }

    /// Configure hidden units
    pub fn with_hidden_units(mut self, hidden_units: usize) -> Self {
        self.hidden_units = hidden_units;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.num_classes == 0 {
            return Err(LeafError::Config(
                "num_classes must be greater than 0".to_string(),
            ));
        }

        if self.in_channels != 3 {
            return Err(LeafError::Config(format!(
                "in_channels must be 3 (RGB), got {}",
                self.in_channels
            )));
        }

        if self.base_filters == 0 || self.hidden_units == 0 {
            return Err(LeafError::Config(
                "base_filters and hidden_units must be greater than 0".to_string(),
            ));
        }

        // Every block halves the resolution
        let smallest = self.input_size.checked_shr(self.conv_blocks as u32).unwrap_or(0);
        if self.conv_blocks == 0 || smallest == 0 {
            return Err(LeafError::Config(format!(
                "conv_blocks must be between 1 and log2(input_size), got {}",
                self.conv_blocks
            )));
        }

        if !(0.0..1.0).contains(&self.dropout_rate) {
            return Err(LeafError::Config(
                "dropout_rate must be in range [0.0, 1.0)".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PlantClassifierConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.num_classes, 4);
        assert_eq!(config.input_size, 224);
    }

    #[test]
    fn test_invalid_configs() {
        assert!(PlantClassifierConfig::new(0).validate().is_err());

        let mut config = PlantClassifierConfig::default();
        config.dropout_rate = 1.0;
        assert!(config.validate().is_err());

        let mut config = PlantClassifierConfig::default();
        config.in_channels = 1;
        assert!(config.validate().is_err());

        let config = PlantClassifierConfig::default().with_conv_blocks(0);
        assert!(config.validate().is_err());

        let mut config = PlantClassifierConfig::default().with_conv_blocks(8);
        config.input_size = 128;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml() {
        let config: PlantClassifierConfig = toml::from_str("num_classes = 10").unwrap();
        assert_eq!(config.num_classes, 10);
        assert_eq!(config.base_filters, 32);
    }

    #[test]
    fn test_feature_channels() {
        assert_eq!(PlantClassifierConfig::default().feature_channels(), 256);
        let config = PlantClassifierConfig::default()
            .with_base_filters(8)
            .with_conv_blocks(1);
        assert_eq!(config.feature_channels(), 8);
    }
}
