// ============================================================
// Layer 4 — Image Batcher
// ============================================================
// Implements burn's Batcher trait to turn a Vec<ImageSample>
// into device tensors.
//
//   Input:  N samples, each C*H*W pixels + num_outputs targets
//   Output: ImageBatch
//             images  [N, C, H, W]
//             targets [N, num_outputs]
//
// Pixels are already CHW-flattened, so concatenating the
// samples gives the row-major buffer of the [N, C, H, W]
// tensor directly.
//
// Unlabelled samples (prediction inputs) get zero targets;
// nothing downstream reads them.

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::domain::{sample::ImageSample, shape::Dims2};

#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// [batch, channels, height, width]
    pub images: Tensor<B, 4>,

    /// [batch, num_outputs]
    pub targets: Tensor<B, 2>,
}

/// Holds the geometry every sample in a batch must have.
#[derive(Clone, Debug)]
pub struct ImageBatcher {
    channels:    usize,
    image:       Dims2,
    num_outputs: usize,
}

impl ImageBatcher {
    pub fn new(channels: usize, image: Dims2, num_outputs: usize) -> Self {
        Self { channels, image, num_outputs }
    }
}

impl<B: Backend> Batcher<B, ImageSample, ImageBatch<B>> for ImageBatcher {
    fn batch(&self, items: Vec<ImageSample>, device: &B::Device) -> ImageBatch<B> {
        let batch_size = items.len();

        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|s| s.pixels.iter().copied())
            .collect();

        let targets: Vec<f32> = items
            .iter()
            .flat_map(|s| {
                if s.is_labelled() {
                    s.targets.clone()
                } else {
                    vec![0.0; self.num_outputs]
                }
            })
            .collect();

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(
                pixels,
                [batch_size, self.channels, self.image.height, self.image.width],
            ),
            device,
        );

        let targets = Tensor::<B, 2>::from_data(
            TensorData::new(targets, [batch_size, self.num_outputs]),
            device,
        );

        ImageBatch { images, targets }
    }
}
