//! Leaf classifier network
//!
//! A stack of conv/pool blocks followed by global average pooling and a small
//! dense head. The layout is rebuilt from [`PlantClassifierConfig`] before the
//! trained weights are loaded, so the config must match the one used to train.

use burn::{
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d,
        Relu,
    },
    tensor::{activation::softmax, backend::Backend, Tensor},
};

use super::config::PlantClassifierConfig;

/// 3x3 convolution, batch norm, ReLU, then a 2x2 max pool
#[derive(Module, Debug)]
pub struct FeatureBlock<B: Backend> {
    conv: Conv2d<B>,
    norm: BatchNorm<B, 2>,
    activation: Relu,
    pool: MaxPool2d,
}

impl<B: Backend> FeatureBlock<B> {
    pub fn new(channels: [usize; 2], device: &B::Device) -> Self {
        Self {
            conv: Conv2dConfig::new(channels, [3, 3])
                .with_padding(PaddingConfig2d::Same)
                .init(device),
            norm: BatchNormConfig::new(channels[1]).init(device),
            activation: Relu::new(),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.norm.forward(self.conv.forward(x));
        self.pool.forward(self.activation.forward(x))
    }
}

/// Tomato leaf classifier CNN
///
/// Input is `[batch, channels, height, width]`, output one logit per class.
#[derive(Module, Debug)]
pub struct PlantClassifier<B: Backend> {
    features: Vec<FeatureBlock<B>>,
    pool: AdaptiveAvgPool2d,
    hidden: Linear<B>,
    activation: Relu,
    dropout: Dropout,
    head: Linear<B>,
    num_classes: usize,
}

impl<B: Backend> PlantClassifier<B> {
    /// Build an untrained network with the layout described by `config`
    pub fn new(config: &PlantClassifierConfig, device: &B::Device) -> Self {
        let mut features = Vec::with_capacity(config.conv_blocks);
        let mut channels = config.in_channels;
        for block in 0..config.conv_blocks {
            let out = config.base_filters << block;
            features.push(FeatureBlock::new([channels, out], device));
            channels = out;
        }

        Self {
            features,
            pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            hidden: LinearConfig::new(config.feature_channels(), config.hidden_units).init(device),
            activation: Relu::new(),
            dropout: DropoutConfig::new(config.dropout_rate).init(),
            head: LinearConfig::new(config.hidden_units, config.num_classes).init(device),
            num_classes: config.num_classes,
        }
    }

    /// Raw logits, shape `[batch, num_classes]`
    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self
            .features
            .iter()
            .fold(input, |x, block| block.forward(x));

        // [B, C, H, W] -> [B, C]
        let x = self.pool.forward(x);
        let [batch, channels, _, _] = x.dims();
        let x = x.reshape([batch, channels]);

        let x = self.activation.forward(self.hidden.forward(x));
        self.head.forward(self.dropout.forward(x))
    }

    /// Class probabilities, each row sums to one
    pub fn forward_softmax(&self, input: Tensor<B, 4>) -> Tensor<B, 2> {
        softmax(self.forward(input), 1)
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InferenceBackend;

    fn tiny_config(num_classes: usize) -> PlantClassifierConfig {
        PlantClassifierConfig::new(num_classes)
            .with_base_filters(4)
            .with_hidden_units(8)
    }

    #[test]
    fn test_output_shape() {
        let device = Default::default();
        let model = PlantClassifier::<InferenceBackend>::new(&tiny_config(4), &device);

        let input = Tensor::<InferenceBackend, 4>::zeros([2, 3, 32, 32], &device);
        assert_eq!(model.forward(input).dims(), [2, 4]);
        assert_eq!(model.num_classes(), 4);
    }

    #[test]
    fn test_block_count_follows_config() {
        let device = Default::default();
        let config = tiny_config(2).with_conv_blocks(2);
        let model = PlantClassifier::<InferenceBackend>::new(&config, &device);
        assert_eq!(model.features.len(), 2);

        let input = Tensor::<InferenceBackend, 4>::zeros([1, 3, 16, 16], &device);
        assert_eq!(model.forward(input).dims(), [1, 2]);
    }

    #[test]
    fn test_forward_softmax_sums_to_one() {
        let device = Default::default();
        let model = PlantClassifier::<InferenceBackend>::new(&tiny_config(3), &device);

        let input = Tensor::<InferenceBackend, 4>::ones([1, 3, 32, 32], &device);
        let probs: Vec<f32> = model.forward_softmax(input).into_data().to_vec().unwrap();

        assert_eq!(probs.len(), 3);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-4);
    }
}
