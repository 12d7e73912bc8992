use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::{Linear, LinearConfig, PaddingConfig2d};
use burn::tensor::Tensor;
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};

use super::encoding::StateEncoder;

pub const DEFAULT_CONV_CHANNELS: [usize; 2] = [16, 32];
pub const DEFAULT_HIDDEN: usize = 128;

/// Action-value function over batches of encoded grids.
///
/// Implementors map `[batch, channels, height, width]` to `[batch, actions]`.
pub trait ValueFunction<B: Backend>: Module<B> {
    fn forward(&self, states: Tensor<B, 4>) -> Tensor<B, 2>;

    /// Shapes of every trainable tensor, in a stable order. Used to refuse
    /// checkpoints written for a different architecture.
    fn parameter_shapes(&self) -> Vec<Vec<usize>>;
}

/// Hyperparameters of the reference convolutional Q-network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QNetworkConfig {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
    pub actions: usize,
    pub conv_channels: [usize; 2],
    pub hidden: usize,
}

impl QNetworkConfig {
    pub fn new(channels: usize, height: usize, width: usize, actions: usize) -> Self {
        Self {
            channels,
            height,
            width,
            actions,
            conv_channels: DEFAULT_CONV_CHANNELS,
            hidden: DEFAULT_HIDDEN,
        }
    }

    pub fn for_encoder(encoder: &StateEncoder, actions: usize) -> Self {
        let [channels, height, width] = encoder.shape();
        Self::new(channels, height, width, actions)
    }

    pub fn with_hidden(mut self, hidden: usize) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn with_conv_channels(mut self, conv_channels: [usize; 2]) -> Self {
        self.conv_channels = conv_channels;
        self
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> QNetwork<B> {
        assert!(self.actions > 0, "network needs at least one action");
        // 3x3 kernels with unit padding keep the spatial size.
        let flattened = self.conv_channels[1] * self.height * self.width;
        QNetwork {
            conv1: Conv2dConfig::new([self.channels, self.conv_channels[0]], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device),
            conv2: Conv2dConfig::new([self.conv_channels[0], self.conv_channels[1]], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device),
            hidden: LinearConfig::new(flattened, self.hidden).init(device),
            output: LinearConfig::new(self.hidden, self.actions).init(device),
        }
    }
}

/// Two convolutions followed by a fully connected head, one output per action.
#[derive(Module, Debug)]
pub struct QNetwork<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    hidden: Linear<B>,
    output: Linear<B>,
}

impl<B: Backend> QNetwork<B> {
    pub fn action_count(&self) -> usize {
        self.output.weight.val().dims()[1]
    }
}

impl<B: Backend> ValueFunction<B> for QNetwork<B> {
    fn forward(&self, states: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = relu(self.conv1.forward(states));
        let x = relu(self.conv2.forward(x));
        let [batch, channels, height, width] = x.dims();
        let x = x.reshape([batch, channels * height * width]);
        let x = relu(self.hidden.forward(x));
        self.output.forward(x)
    }

    fn parameter_shapes(&self) -> Vec<Vec<usize>> {
        let mut shapes = vec![
            self.conv1.weight.val().dims().to_vec(),
            self.conv2.weight.val().dims().to_vec(),
            self.hidden.weight.val().dims().to_vec(),
            self.output.weight.val().dims().to_vec(),
        ];
        let biases = [
            &self.conv1.bias,
            &self.conv2.bias,
            &self.hidden.bias,
            &self.output.bias,
        ];
        for bias in biases.into_iter().flatten() {
            shapes.push(bias.val().dims().to_vec());
        }
        shapes
    }
}
