use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::dataset::{FaceItem, CHANNELS, HEIGHT, WIDTH};

/// Collates [`FaceItem`]s into tensors, rescaling intensities into [0, 1].
#[derive(Clone, Default)]
pub struct FaceBatcher {}

impl FaceBatcher {
    pub fn new() -> Self {
        Self {}
    }
}

#[derive(Clone, Debug)]
pub struct FaceBatch<B: Backend> {
    /// Images in NCHW order, values in [0, 1].
    pub images: Tensor<B, 4>,
    /// One binary target per example.
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> Batcher<B, FaceItem, FaceBatch<B>> for FaceBatcher {
    fn batch(&self, items: Vec<FaceItem>, device: &B::Device) -> FaceBatch<B> {
        let targets = items
            .iter()
            .map(|item| {
                Tensor::<B, 1, Int>::from_data(
                    TensorData::from([item.label.elem::<B::IntElem>()]),
                    device,
                )
            })
            .collect();

        let images = items
            .into_iter()
            .map(|item| TensorData::new(item.pixels, Shape::new([HEIGHT, WIDTH, CHANNELS])))
            .map(|data| {
                Tensor::<B, 3>::from_data(data.convert::<B::FloatElem>(), device)
                    // HWC to CHW
                    .swap_dims(2, 1)
                    .swap_dims(1, 0)
            })
            .map(|tensor| tensor / 255)
            .collect();

        let images = Tensor::stack(images, 0);
        let targets = Tensor::cat(targets, 0);

        FaceBatch { images, targets }
    }
}
