// ============================================================
// Layer 4 — Per-Channel Normaliser
// ============================================================
// Standardises every channel of every image:
//
//   x' = (x - mean[c]) / std[c]
//
// The statistics are fitted on the TRAINING split only, saved
// next to the checkpoint, and re-applied at prediction time so
// the model always sees inputs on the scale it was trained on.
//
// A channel with (near) zero variance gets std = 1 so constant
// channels pass through shifted but never divide by zero.

use serde::{Deserialize, Serialize};

use crate::domain::{sample::ImageSample, shape::Dims2};

const MIN_STD: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub mean: Vec<f32>,
    pub std:  Vec<f32>,
}

impl ChannelStats {
    /// Stats that leave every pixel unchanged
    pub fn identity(channels: usize) -> Self {
        Self {
            mean: vec![0.0; channels],
            std:  vec![1.0; channels],
        }
    }

    /// Fit mean and population std per channel.
    /// Samples must already be validated against `channels` x `image`.
    pub fn fit(samples: &[ImageSample], channels: usize, image: Dims2) -> Self {
        if samples.is_empty() {
            return Self::identity(channels);
        }

        let mut mean = Vec::with_capacity(channels);
        let mut std  = Vec::with_capacity(channels);

        for c in 0..channels {
            // Accumulate in f64 — images can hold a lot of pixels
            let mut sum    = 0.0f64;
            let mut sum_sq = 0.0f64;
            let mut count  = 0usize;

            for s in samples {
                for &v in s.channel(c, image) {
                    let v = v as f64;
                    sum    += v;
                    sum_sq += v * v;
                    count  += 1;
                }
            }

            let m   = sum / count as f64;
            let var = (sum_sq / count as f64 - m * m).max(0.0);
            let sd  = var.sqrt();

            mean.push(m as f32);
            std.push(if sd < MIN_STD { 1.0 } else { sd as f32 });
        }

        tracing::debug!("Fitted channel stats: mean={:?} std={:?}", mean, std);
        Self { mean, std }
    }

    pub fn channels(&self) -> usize {
        self.mean.len()
    }

    /// One mean and one std per channel
    pub fn is_valid_for(&self, channels: usize) -> bool {
        self.mean.len() == channels && self.std.len() == channels
    }

    /// Normalise one sample in place.
    /// Panics if the stats cover fewer channels than the sample.
    pub fn apply(&self, sample: &mut ImageSample, image: Dims2) {
        let plane = image.area();
        for (c, chunk) in sample.pixels.chunks_mut(plane).enumerate() {
            let (m, s) = (self.mean[c], self.std[c]);
            for v in chunk.iter_mut() {
                *v = (*v - m) / s;
            }
        }
    }

    /// Normalise a whole collection
    pub fn apply_all(&self, samples: &mut [ImageSample], image: Dims2) {
        for s in samples.iter_mut() {
            self.apply(s, image);
        }
    }
}
