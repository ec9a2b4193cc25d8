//! Image preprocessing
//!
//! Turns uploaded bytes into the `[1, H, W, 3]` float tensor the classifier
//! consumes.

use std::path::Path;

use image::{imageops::FilterType, DynamicImage};
use serde::{Deserialize, Serialize};

use crate::utils::error::{LeafError, Result};
use crate::IMAGE_SIZE;

/// Resampling kernel used when resizing to the model input size.
///
/// Outputs are not bit-identical across kernels; `Nearest` matches the loader
/// the reference model was evaluated with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    #[default]
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Configuration for image preprocessing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Target width and height in pixels
    pub image_size: u32,
    /// Resampling kernel
    pub filter: ResizeFilter,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            image_size: IMAGE_SIZE,
            filter: ResizeFilter::default(),
        }
    }
}

/// A batched image in NHWC layout with values in `[0, 1]`
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    shape: [usize; 4],
    data: Vec<f32>,
}

impl ImageTensor {
    /// Wrap raw NHWC data, checking that it matches `shape`
    pub fn new(shape: [usize; 4], data: Vec<f32>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(LeafError::Inference(format!(
                "tensor data has {} values, shape {:?} needs {}",
                data.len(),
                shape,
                expected
            )));
        }
        Ok(Self { shape, data })
    }

    /// `[batch, height, width, channels]`
    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }
}

/// Image preprocessor for leaf images
#[derive(Debug, Clone, Default)]
pub struct ImagePreprocessor {
    config: PreprocessConfig,
}

impl ImagePreprocessor {
    /// Creates a new image preprocessor with the given configuration
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Decode an in-memory image (JPEG or PNG)
    pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.is_empty() {
            return Err(LeafError::Decode("image data is empty".to_string()));
        }
        Ok(image::load_from_memory(bytes)?)
    }

    /// Decode, resize and normalize raw image bytes
    pub fn preprocess(&self, bytes: &[u8]) -> Result<ImageTensor> {
        let image = Self::decode(bytes)?;
        Ok(self.preprocess_image(&image))
    }

    /// Load and preprocess an image from a file path
    pub fn preprocess_path(&self, path: &Path) -> Result<ImageTensor> {
        let bytes = std::fs::read(path)?;
        self.preprocess(&bytes)
    }

    /// Resize and normalize an already decoded image
    pub fn preprocess_image(&self, image: &DynamicImage) -> ImageTensor {
        let size = self.config.image_size;
        let resized = image
            .resize_exact(size, size, self.config.filter.into())
            .to_rgb8();

        // RgbImage stores pixels row-major as [r, g, b, r, g, b, ...], which is
        // already HWC
        let data: Vec<f32> = resized
            .as_raw()
            .iter()
            .map(|&value| value as f32 / 255.0)
            .collect();

        ImageTensor {
            shape: [1, size as usize, size as usize, 3],
            data,
        }
    }
}
