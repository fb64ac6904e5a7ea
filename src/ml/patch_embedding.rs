// ============================================================
// Layer 5 — Patch Embedding
// ============================================================
// [B, C, H, W] image  →  [B, num_patches + 1, d_model] tokens
//
//   1. Cut the image into a rows x cols grid of ph x pw patches
//      and flatten each patch as (p1 p2 c), channel innermost:
//        b c (h p1) (w p2)  →  b (h w) (p1 p2 c)
//   2. LayerNorm(patch_dim) → Linear(patch_dim → d_model) → LayerNorm(d_model)
//   3. Prepend the learned class token (token 0)
//   4. Add the learned positional embedding
//
// cls_token and pos_embedding start from N(0, 1).

use burn::{
    module::Param,
    nn::{LayerNorm, LayerNormConfig, Linear, LinearConfig},
    prelude::*,
    tensor::Distribution,
};

use crate::domain::{error::ShapeError, shape::{Dims2, PatchGrid}};

#[derive(Config, Debug)]
pub struct PatchEmbeddingConfig {
    pub in_channels:  usize,
    pub d_model:      usize,
    pub image_height: usize,
    pub image_width:  usize,
    pub patch_height: usize,
    pub patch_width:  usize,
}

impl PatchEmbeddingConfig {
    /// The patch grid this config describes, or why it cannot exist.
    pub fn grid(&self) -> Result<PatchGrid, ShapeError> {
        PatchGrid::new(
            self.in_channels,
            Dims2::new(self.image_height, self.image_width),
            Dims2::new(self.patch_height, self.patch_width),
        )
    }

    /// Call `grid()` first. Debug builds panic here on a shape that
    /// does not divide evenly; release builds panic later in `forward`.
    pub fn init<B: Backend>(&self, device: &B::Device) -> PatchEmbedding<B> {
        debug_assert!(self.grid().is_ok(), "invalid patch geometry: {:?}", self.grid());

        let grid_rows   = self.image_height / self.patch_height;
        let grid_cols   = self.image_width / self.patch_width;
        let num_patches = grid_rows * grid_cols;
        let patch_dim   = self.in_channels * self.patch_height * self.patch_width;

        let cls_token = Tensor::<B, 3>::random(
            [1, 1, self.d_model],
            Distribution::Normal(0.0, 1.0),
            device,
        );
        let pos_embedding = Tensor::<B, 3>::random(
            [1, num_patches + 1, self.d_model],
            Distribution::Normal(0.0, 1.0),
            device,
        );

        PatchEmbedding {
            patch_norm:    LayerNormConfig::new(patch_dim).init(device),
            projection:    LinearConfig::new(patch_dim, self.d_model).init(device),
            embed_norm:    LayerNormConfig::new(self.d_model).init(device),
            cls_token:     Param::from_tensor(cls_token),
            pos_embedding: Param::from_tensor(pos_embedding),
            grid_rows,
            grid_cols,
            patch_height:  self.patch_height,
            patch_width:   self.patch_width,
        }
    }
}

#[derive(Module, Debug)]
pub struct PatchEmbedding<B: Backend> {
    pub patch_norm:    LayerNorm<B>,
    pub projection:    Linear<B>,
    pub embed_norm:    LayerNorm<B>,
    pub cls_token:     Param<Tensor<B, 3>>,
    pub pos_embedding: Param<Tensor<B, 3>>,
    pub grid_rows:     usize,
    pub grid_cols:     usize,
    pub patch_height:  usize,
    pub patch_width:   usize,
}

impl<B: Backend> PatchEmbedding<B> {
    pub fn num_patches(&self) -> usize {
        self.grid_rows * self.grid_cols
    }

    /// images: [batch, C, H, W] → flattened patches [batch, num_patches, ph * pw * C]
    pub fn patchify(&self, images: Tensor<B, 4>) -> Tensor<B, 3> {
        let [batch, channels, _, _] = images.dims();
        let (rows, cols) = (self.grid_rows, self.grid_cols);
        let (ph, pw)     = (self.patch_height, self.patch_width);

        // [b, c, rows, ph, cols, pw] → [b, rows, cols, ph, pw, c]
        images
            .reshape([batch, channels, rows, ph, cols, pw])
            .permute([0, 2, 4, 3, 5, 1])
            .reshape([batch, rows * cols, ph * pw * channels])
    }

    /// images: [batch, C, H, W] → tokens [batch, num_patches + 1, d_model]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 3> {
        let patches = self.patchify(images);
        let tokens  = self.embed_norm.forward(
            self.projection.forward(self.patch_norm.forward(patches)),
        );
        let [batch, n, d_model] = tokens.dims();

        let cls = self.cls_token.val().repeat_dim(0, batch);
        let x   = Tensor::cat(vec![cls, tokens], 1);

        let pos = self.pos_embedding.val().slice([0..1, 0..n + 1, 0..d_model]);
        x + pos
    }
}
