// ============================================================
// Layer 3 — Image and Patch Shapes
// ============================================================
// Dims2 is a (height, width) pair. It is what the user types
// on the command line for --image-shape and --patch-shape, so
// it parses the loose forms people actually write:
//
//   "(160, 106)"   "160,106"   "160x106"   "[32, 53]"
//
// PatchGrid is the bookkeeping derived from an image shape,
// a patch shape and a channel count. Everything the patch
// embedding needs to size its layers comes from here:
//
//   rows        = H / ph
//   cols        = W / pw
//   num_patches = rows * cols
//   patch_dim   = C * ph * pw
//   seq_len     = num_patches + 1      (class token in front)

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::domain::error::ShapeError;

/// A (height, width) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dims2 {
    pub height: usize,
    pub width:  usize,
}

impl Dims2 {
    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    /// Number of elements in one H x W plane
    pub fn area(&self) -> usize {
        self.height * self.width
    }
}

impl fmt::Display for Dims2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.height, self.width)
    }
}

impl FromStr for Dims2 {
    type Err = ShapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ShapeError::Parse { input: s.to_string() };

        let inner = s
            .trim()
            .trim_start_matches(|c| c == '(' || c == '[')
            .trim_end_matches(|c| c == ')' || c == ']');

        let parts: Vec<&str> = inner
            .split(|c: char| c == ',' || c == 'x' || c == 'X')
            .map(str::trim)
            .collect();

        match parts.as_slice() {
            [h, w] => {
                let height = h.parse::<usize>().map_err(|_| err())?;
                let width  = w.parse::<usize>().map_err(|_| err())?;
                Ok(Self { height, width })
            }
            _ => Err(err()),
        }
    }
}

/// How an image is cut into patches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchGrid {
    pub rows:      usize,
    pub cols:      usize,
    pub patch:     Dims2,
    pub channels:  usize,
}

impl PatchGrid {
    /// Build the grid, rejecting shapes that cannot be cut exactly.
    pub fn new(channels: usize, image: Dims2, patch: Dims2) -> Result<Self, ShapeError> {
        if channels == 0 {
            return Err(ShapeError::Zero { name: "in_channels" });
        }
        if image.height == 0 {
            return Err(ShapeError::Zero { name: "image height" });
        }
        if image.width == 0 {
            return Err(ShapeError::Zero { name: "image width" });
        }
        if patch.height == 0 {
            return Err(ShapeError::Zero { name: "patch height" });
        }
        if patch.width == 0 {
            return Err(ShapeError::Zero { name: "patch width" });
        }
        if image.height % patch.height != 0 {
            return Err(ShapeError::NotDivisible {
                axis:  "height",
                image: image.height,
                patch: patch.height,
            });
        }
        if image.width % patch.width != 0 {
            return Err(ShapeError::NotDivisible {
                axis:  "width",
                image: image.width,
                patch: patch.width,
            });
        }

        Ok(Self {
            rows: image.height / patch.height,
            cols: image.width / patch.width,
            patch,
            channels,
        })
    }

    pub fn num_patches(&self) -> usize {
        self.rows * self.cols
    }

    /// Length of one flattened patch vector
    pub fn patch_dim(&self) -> usize {
        self.channels * self.patch.area()
    }

    /// Token count after the class token is prepended
    pub fn seq_len(&self) -> usize {
        self.num_patches() + 1
    }

    pub fn image(&self) -> Dims2 {
        Dims2::new(self.rows * self.patch.height, self.cols * self.patch.width)
    }
}
