// ============================================================
// Layer 4 — Image Dataset
// ============================================================
// Wraps the prepared samples in burn's Dataset trait so the
// DataLoader can index, shuffle and batch them.

use burn::data::dataset::Dataset;

use crate::domain::sample::ImageSample;

/// Validated, normalised samples exposed through burn's Dataset trait.
pub struct ImageDataset {
    samples: Vec<ImageSample>,
}

impl ImageDataset {
    pub fn new(samples: Vec<ImageSample>) -> Self { Self { samples } }

    pub fn sample_count(&self) -> usize { self.samples.len() }
}

impl Dataset<ImageSample> for ImageDataset {
    fn get(&self, index: usize) -> Option<ImageSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
