use std::str::FromStr;

use burn::{
    nn::{
        loss::{MseLoss, Reduction},
        LayerNorm, LayerNormConfig, Linear, LinearConfig,
    },
    prelude::*,
};

use crate::domain::{
    error::ShapeError,
    shape::{Dims2, PatchGrid},
};
use crate::ml::{
    block::{TransformerBlock, TransformerBlockConfig},
    patch_embedding::{PatchEmbedding, PatchEmbeddingConfig},
};

/// How the per-token head outputs are reduced to one prediction per image.
#[derive(Config, Debug, PartialEq, Eq)]
pub enum Pooling {
    /// Average the head output over every token, class token included
    Mean,
    /// Use the head output at the class token only
    Cls,
}

impl FromStr for Pooling {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(Pooling::Mean),
            "cls"  => Ok(Pooling::Cls),
            other  => Err(format!("unknown pooling '{other}', expected 'mean' or 'cls'")),
        }
    }
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct ViTConfig {
    #[config(default = 160)]
    pub image_height: usize,
    #[config(default = 106)]
    pub image_width: usize,
    #[config(default = 4)]
    pub in_channels: usize,
    #[config(default = 32)]
    pub patch_height: usize,
    #[config(default = 53)]
    pub patch_width: usize,
    #[config(default = 512)]
    pub d_model: usize,
    #[config(default = 2)]
    pub num_transformer_layers: usize,
    /// Shared by attention and MLP dropout in every block
    #[config(default = 0.2)]
    pub dropout_rate: f64,
    #[config(default = 1048)]
    pub mlp_size: usize,
    #[config(default = 4)]
    pub num_heads: usize,
    /// Regression problem, so a single output by default
    #[config(default = 1)]
    pub num_outputs: usize,
    #[config(default = "Pooling::Mean")]
    pub pooling: Pooling,
}

impl ViTConfig {
    pub fn image_shape(&self) -> Dims2 {
        Dims2::new(self.image_height, self.image_width)
    }

    pub fn patch_shape(&self) -> Dims2 {
        Dims2::new(self.patch_height, self.patch_width)
    }

    pub fn with_image_shape(self, shape: Dims2) -> Self {
        self.with_image_height(shape.height).with_image_width(shape.width)
    }

    pub fn with_patch_shape(self, shape: Dims2) -> Self {
        self.with_patch_height(shape.height).with_patch_width(shape.width)
    }

    /// Check every shape constraint and return the resulting patch grid.
    pub fn validate(&self) -> Result<PatchGrid, ShapeError> {
        let grid = self.patch_embedding_config().grid()?;

        if self.d_model == 0 {
            return Err(ShapeError::Zero { name: "d_model" });
        }
        if self.num_heads == 0 {
            return Err(ShapeError::Zero { name: "num_heads" });
        }
        if self.mlp_size == 0 {
            return Err(ShapeError::Zero { name: "mlp_size" });
        }
        if self.num_outputs == 0 {
            return Err(ShapeError::Zero { name: "num_outputs" });
        }
        if self.d_model % self.num_heads != 0 {
            return Err(ShapeError::HeadSplit {
                d_model:   self.d_model,
                num_heads: self.num_heads,
            });
        }
        if !(0.0..1.0).contains(&self.dropout_rate) {
            return Err(ShapeError::Dropout(self.dropout_rate));
        }
        Ok(grid)
    }

    pub fn patch_embedding_config(&self) -> PatchEmbeddingConfig {
        PatchEmbeddingConfig::new(
            self.in_channels,
            self.d_model,
            self.image_height,
            self.image_width,
            self.patch_height,
            self.patch_width,
        )
    }

    pub fn block_config(&self) -> TransformerBlockConfig {
        TransformerBlockConfig::new(
            self.d_model,
            self.dropout_rate,
            self.dropout_rate,
            self.mlp_size,
            self.num_heads,
        )
    }

    /// Build the model. Call `validate()` first: an image shape that the
    /// patch shape does not divide, or `d_model % num_heads != 0`, yields
    /// a model that panics in `forward`.
    pub fn init<B: Backend>(&self, device: &B::Device) -> ViT<B> {
        let block_cfg = self.block_config();
        let blocks: Vec<TransformerBlock<B>> = (0..self.num_transformer_layers)
            .map(|_| block_cfg.init(device))
            .collect();

        ViT {
            patch_embedding: self.patch_embedding_config().init(device),
            blocks,
            head_norm:   LayerNormConfig::new(self.d_model).init(device),
            head:        LinearConfig::new(self.d_model, self.num_outputs).init(device),
            cls_pooling: self.pooling == Pooling::Cls,
        }
    }
}

#[derive(Module, Debug)]
pub struct ViT<B: Backend> {
    pub patch_embedding: PatchEmbedding<B>,
    pub blocks:          Vec<TransformerBlock<B>>,
    pub head_norm:       LayerNorm<B>,
    pub head:            Linear<B>,
    pub cls_pooling:     bool,
}

pub struct RegressionOutput<B: Backend> {
    /// Mean squared error over the batch
    pub loss:    Tensor<B, 1>,
    /// [batch, num_outputs]
    pub output:  Tensor<B, 2>,
    /// [batch, num_outputs]
    pub targets: Tensor<B, 2>,
}

impl<B: Backend> ViT<B> {
    /// images: [batch, C, H, W] → [batch, num_outputs]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = self.patch_embedding.forward(images);
        for block in &self.blocks {
            x = block.forward(x);
        }

        // The head runs on every token: [batch, seq_len, num_outputs]
        let out = self.head.forward(self.head_norm.forward(x));
        let [batch, _, outputs] = out.dims();

        if self.cls_pooling {
            out.slice([0..batch, 0..1, 0..outputs]).reshape([batch, outputs])
        } else {
            out.mean_dim(1).reshape([batch, outputs])
        }
    }

    pub fn forward_regression(
        &self,
        images:  Tensor<B, 4>,
        targets: Tensor<B, 2>,
    ) -> RegressionOutput<B> {
        let output = self.forward(images);
        let loss   = MseLoss::new().forward(output.clone(), targets.clone(), Reduction::Mean);
        RegressionOutput { loss, output, targets }
    }
}
