// ============================================================
// Layer 3 — ImageSample Domain Type
// ============================================================
// One multi-channel image plus its regression target(s).
//
// Pixels are stored flattened in channel-major (CHW) order:
//   index = c * H * W + y * W + x
// which is exactly the memory layout of a [C, H, W] tensor,
// so the batcher can hand the buffer to burn unchanged.
//
// `targets` is empty for unlabelled inputs (prediction only).

use serde::{Deserialize, Serialize};

use crate::domain::{error::ShapeError, shape::Dims2};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSample {
    /// Flattened CHW pixel values
    pub pixels: Vec<f32>,

    /// Regression targets, one per model output
    #[serde(default)]
    pub targets: Vec<f32>,
}

impl ImageSample {
    pub fn new(pixels: Vec<f32>, targets: Vec<f32>) -> Self {
        Self { pixels, targets }
    }

    /// An input with no label attached
    pub fn unlabelled(pixels: Vec<f32>) -> Self {
        Self { pixels, targets: Vec::new() }
    }

    pub fn is_labelled(&self) -> bool {
        !self.targets.is_empty()
    }

    /// Check the pixel buffer against the expected image geometry.
    /// Targets are checked only when `num_outputs` is given.
    pub fn validate(
        &self,
        channels:    usize,
        image:       Dims2,
        num_outputs: Option<usize>,
    ) -> Result<(), ShapeError> {
        let expected = channels * image.area();
        if self.pixels.len() != expected {
            return Err(ShapeError::PixelCount {
                expected,
                actual: self.pixels.len(),
            });
        }
        if let Some(n) = num_outputs {
            if self.targets.len() != n {
                return Err(ShapeError::TargetCount {
                    expected: n,
                    actual:   self.targets.len(),
                });
            }
        }
        Ok(())
    }

    /// Borrow the plane for one channel
    pub fn channel(&self, c: usize, image: Dims2) -> &[f32] {
        let plane = image.area();
        &self.pixels[c * plane..(c + 1) * plane]
    }
}
