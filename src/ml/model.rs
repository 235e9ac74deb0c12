use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        loss::CrossEntropyLossConfig,
        pool::{MaxPool2d, MaxPool2dConfig},
        Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    prelude::*,
};

use crate::domain::label::NUM_CLASSES;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally, do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct RoadCnnConfig {
    /// Side of the square input patch, a multiple of 4
    pub patch_size:   usize,
    #[config(default = 3)]
    pub num_channels: usize,
    #[config(default = 512)]
    pub hidden_units: usize,
}

impl RoadCnnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> RoadCnn<B> {
        // two 2x2 pools → P/4 on each side, 64 feature maps
        let reduced  = self.patch_size / 4;
        let features = 64 * reduced * reduced;

        RoadCnn {
            conv1: Conv2dConfig::new([self.num_channels, 32], [5, 5])
                .with_padding(PaddingConfig2d::Same)
                .init(device),
            conv2: Conv2dConfig::new([32, 64], [5, 5])
                .with_padding(PaddingConfig2d::Same)
                .init(device),
            pool:  MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            fc1:   LinearConfig::new(features, self.hidden_units).init(device),
            fc2:   LinearConfig::new(self.hidden_units, NUM_CLASSES).init(device),
            activation: Relu::new(),
        }
    }
}

/// Two conv + pool stages followed by two fully connected layers.
#[derive(Module, Debug)]
pub struct RoadCnn<B: Backend> {
    conv1:      Conv2d<B>,
    conv2:      Conv2d<B>,
    pool:       MaxPool2d,
    fc1:        Linear<B>,
    fc2:        Linear<B>,
    activation: Relu,
}

impl<B: Backend> RoadCnn<B> {
    /// images: [batch, channels, P, P] → logits: [batch, 2]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let [batch_size, _, _, _] = images.dims();

        let x = self.pool.forward(self.activation.forward(self.conv1.forward(images)));
        let x = self.pool.forward(self.activation.forward(self.conv2.forward(x)));

        let [_, c, h, w] = x.dims();
        let x = x.reshape([batch_size, c * h * w]);

        let x = self.activation.forward(self.fc1.forward(x));
        self.fc2.forward(x)
    }

    /// Mean cross-entropy over the batch, plus the logits it came from.
    pub fn forward_loss(
        &self,
        images:  Tensor<B, 4>,
        targets: Tensor<B, 1, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(images);
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), targets);
        (loss, logits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let model: RoadCnn<NdArray> = RoadCnnConfig::new(16).with_hidden_units(8).init(&device);
        let images = Tensor::<NdArray, 4>::zeros([5, 3, 16, 16], &device);
        assert_eq!(model.forward(images).dims(), [5, 2]);
    }

    #[test]
    fn test_single_channel_input() {
        let device = Default::default();
        let model: RoadCnn<NdArray> = RoadCnnConfig::new(8)
            .with_num_channels(1)
            .with_hidden_units(4)
            .init(&device);
        let images = Tensor::<NdArray, 4>::ones([2, 1, 8, 8], &device);
        assert_eq!(model.forward(images).dims(), [2, 2]);
    }
}
