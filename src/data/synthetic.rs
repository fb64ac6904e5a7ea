// ============================================================
// Layer 4 — Synthetic Sample Source
// ============================================================
// Generates random images whose target is a known function of
// the pixels, so the full train → checkpoint → predict path can
// be exercised without a real dataset:
//
//   pixels ~ U(0, 1)
//   target = mean of channel 0 over the upper half of the image
//            (+ uniform noise in [-noise, noise])
//
// Seeded with StdRng, so the same seed always gives the same
// samples. Every output gets the same target value.

use anyhow::Result;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::domain::{sample::ImageSample, shape::Dims2, traits::SampleSource};

pub struct SyntheticSource {
    count:       usize,
    channels:    usize,
    image:       Dims2,
    num_outputs: usize,
    noise:       f32,
    seed:        u64,
}

impl SyntheticSource {
    pub fn new(count: usize, channels: usize, image: Dims2, num_outputs: usize, seed: u64) -> Self {
        Self { count, channels, image, num_outputs, noise: 0.0, seed }
    }

    pub fn with_noise(mut self, noise: f32) -> Self {
        self.noise = noise.abs();
        self
    }

    fn target(&self, pixels: &[f32]) -> f32 {
        let upper = (self.image.height / 2).max(1) * self.image.width;
        let sum: f32 = pixels[..upper].iter().sum();
        sum / upper as f32
    }
}

impl SampleSource for SyntheticSource {
    fn load_all(&self) -> Result<Vec<ImageSample>> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let len     = self.channels * self.image.area();

        let samples: Vec<ImageSample> = (0..self.count)
            .map(|_| {
                let pixels: Vec<f32> = (0..len).map(|_| rng.gen::<f32>()).collect();
                let noise = if self.noise > 0.0 {
                    rng.gen_range(-self.noise..=self.noise)
                } else {
                    0.0
                };
                let target = self.target(&pixels) + noise;
                ImageSample::new(pixels, vec![target; self.num_outputs])
            })
            .collect();

        tracing::info!(
            "Generated {} synthetic samples ({} channels, {})",
            samples.len(),
            self.channels,
            self.image
        );
        Ok(samples)
    }
}
