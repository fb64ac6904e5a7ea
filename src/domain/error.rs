// ============================================================
// Layer 3 — Shape Errors
// ============================================================
// Every way an image / patch / model shape can be rejected.
// These are raised before any tensor is built, so a bad
// configuration never reaches a reshape inside the model.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShapeError {
    /// A "(h, w)" style string could not be parsed
    #[error("cannot parse '{input}' as a (height, width) pair")]
    Parse { input: String },

    /// A dimension that must be positive was zero
    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },

    /// The image side is not an exact multiple of the patch side
    #[error("image {axis} {image} is not divisible by patch {axis} {patch}")]
    NotDivisible {
        axis:  &'static str,
        image: usize,
        patch: usize,
    },

    /// d_model cannot be split evenly across the attention heads
    #[error("d_model {d_model} is not divisible by num_heads {num_heads}")]
    HeadSplit { d_model: usize, num_heads: usize },

    /// Dropout probability outside [0, 1)
    #[error("dropout rate {0} must be in [0, 1)")]
    Dropout(f64),

    /// A sample's pixel buffer does not match C * H * W
    #[error("sample has {actual} pixel values, expected {expected}")]
    PixelCount { expected: usize, actual: usize },

    /// A labelled sample's target vector does not match num_outputs
    #[error("sample has {actual} targets, expected {expected}")]
    TargetCount { expected: usize, actual: usize },
}
