use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Linear, LinearConfig, PaddingConfig2d, Relu, Sigmoid,
    },
    prelude::*,
};

/// Configuration of the emotion classifier.
///
/// The defaults reproduce the classic starter topology:
/// zero-pad(3) -> conv(32 filters, 7x7, stride 1) -> batch-norm -> relu
/// -> max-pool(2x2) -> flatten -> linear(1) with a sigmoid head.
/// The knobs are here so the topology can be experimented with; nothing in
/// the crate assumes the default values.
#[derive(Config, Debug)]
pub struct EmotionModelConfig {
    #[config(default = 64)]
    pub height: usize,
    #[config(default = 64)]
    pub width: usize,
    #[config(default = 3)]
    pub channels: usize,
    #[config(default = 32)]
    pub num_filters: usize,
    #[config(default = 7)]
    pub kernel_size: usize,
    /// Zero padding applied on each image border before the convolution.
    #[config(default = 3)]
    pub padding: usize,
    #[config(default = 2)]
    pub pool_size: usize,
}

#[derive(Module, Debug)]
pub struct EmotionModel<B: Backend> {
    conv: Conv2d<B>,
    norm: BatchNorm<B, 2>,
    activation: Relu,
    pool: MaxPool2d,
    fc: Linear<B>,
    head: Sigmoid,
}

impl EmotionModelConfig {
    /// Initialize an untrained model on the given device.
    pub fn init<B: Backend>(&self, device: &B::Device) -> EmotionModel<B> {
        let conv = Conv2dConfig::new(
            [self.channels, self.num_filters],
            [self.kernel_size, self.kernel_size],
        )
        .with_stride([1, 1])
        .with_padding(PaddingConfig2d::Explicit(self.padding, self.padding))
        .init(device);

        let norm = BatchNormConfig::new(self.num_filters).init(device);
        let pool = MaxPool2dConfig::new([self.pool_size, self.pool_size])
            .with_strides([self.pool_size, self.pool_size])
            .init();
        let fc = LinearConfig::new(self.fc_features(), 1).init(device);

        EmotionModel {
            conv,
            norm,
            activation: Relu::new(),
            pool,
            fc,
            head: Sigmoid::new(),
        }
    }

    /// Spatial output size [height, width] after the padded convolution.
    pub fn conv_output(&self) -> [usize; 2] {
        [
            self.height + 2 * self.padding - self.kernel_size + 1,
            self.width + 2 * self.padding - self.kernel_size + 1,
        ]
    }

    /// Spatial output size [height, width] after max pooling.
    pub fn pooled_output(&self) -> [usize; 2] {
        let [h, w] = self.conv_output();
        [h / self.pool_size, w / self.pool_size]
    }

    /// Number of features fed into the dense layer.
    pub fn fc_features(&self) -> usize {
        let [h, w] = self.pooled_output();
        self.num_filters * h * w
    }
}

impl<B: Backend> EmotionModel<B> {
    /// Forward pass returning raw logits of shape `[batch, 1]`.
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.conv.forward(images);
        let x = self.norm.forward(x);
        let x = self.activation.forward(x);
        let x = self.pool.forward(x);
        let x = x.flatten::<2>(1, 3);
        self.fc.forward(x)
    }

    /// Forward pass returning sigmoid scores in (0, 1), shape `[batch, 1]`.
    pub fn infer(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        self.head.forward(self.forward(images))
    }

    /// Per-layer parameter counts and output shapes, like a framework
    /// `summary()` table.
    pub fn summary(&self, config: &EmotionModelConfig) -> String {
        let [conv_h, conv_w] = config.conv_output();
        let [pool_h, pool_w] = config.pooled_output();
        let rows = [
            (
                "conv0 (Conv2d)",
                format!("[N, {}, {conv_h}, {conv_w}]", config.num_filters),
                self.conv.num_params(),
            ),
            (
                "bn0 (BatchNorm)",
                format!("[N, {}, {conv_h}, {conv_w}]", config.num_filters),
                self.norm.num_params(),
            ),
            (
                "relu (Relu)",
                format!("[N, {}, {conv_h}, {conv_w}]", config.num_filters),
                0,
            ),
            (
                "max_pool (MaxPool2d)",
                format!("[N, {}, {pool_h}, {pool_w}]", config.num_filters),
                0,
            ),
            ("flatten", format!("[N, {}]", config.fc_features()), 0),
            ("fc (Linear, sigmoid)", "[N, 1]".to_string(), self.fc.num_params()),
        ];

        let mut out = String::new();
        out.push_str(&format!(
            "{:<24} {:<20} {:>12}\n",
            "Layer", "Output shape", "Params"
        ));
        for (name, shape, params) in rows {
            out.push_str(&format!("{name:<24} {shape:<20} {params:>12}\n"));
        }
        out.push_str(&format!("Total params: {}\n", self.num_params()));
        out
    }
}
