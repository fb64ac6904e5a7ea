// ============================================================
// Layer 5 — Model Summary
// ============================================================
// Shape and parameter bookkeeping for a ViT configuration.
//
// Everything here is computed from the config alone, so a
// summary can be printed without allocating the model.

use serde::Serialize;

use crate::domain::{error::ShapeError, shape::Dims2};
use crate::ml::vit::{Pooling, ViTConfig};

#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub image_shape:   Dims2,
    pub patch_shape:   Dims2,
    pub in_channels:   usize,
    pub grid_rows:     usize,
    pub grid_cols:     usize,
    pub num_patches:   usize,
    pub patch_dim:     usize,
    pub seq_len:       usize,
    pub d_model:       usize,
    pub num_heads:     usize,
    pub head_dim:      usize,
    pub mlp_size:      usize,
    pub depth:         usize,
    pub num_outputs:   usize,
    pub pooling:       String,
    pub params:        ParamBreakdown,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParamBreakdown {
    pub patch_embedding: usize,
    pub per_block:       usize,
    pub blocks:          usize,
    pub head:            usize,
    pub total:           usize,
}

impl ParamBreakdown {
    fn compute(cfg: &ViTConfig, patch_dim: usize, num_patches: usize) -> Self {
        let d = cfg.d_model;
        let m = cfg.mlp_size;
        let o = cfg.num_outputs;

        let layer_norm = |n: usize| 2 * n;
        let linear     = |fan_in: usize, fan_out: usize| fan_in * fan_out + fan_out;

        let patch_embedding = layer_norm(patch_dim)
            + linear(patch_dim, d)
            + layer_norm(d)
            + d                       // cls token
            + (num_patches + 1) * d;  // positional embedding

        // norm + q/k/v/out projections, then norm + two-layer MLP
        let per_block = layer_norm(d)
            + 4 * linear(d, d)
            + layer_norm(d)
            + linear(d, m)
            + linear(m, d);

        let blocks = per_block * cfg.num_transformer_layers;
        let head   = layer_norm(d) + linear(d, o);

        Self {
            patch_embedding,
            per_block,
            blocks,
            head,
            total: patch_embedding + blocks + head,
        }
    }
}

impl ModelSummary {
    pub fn from_config(cfg: &ViTConfig) -> Result<Self, ShapeError> {
        let grid = cfg.validate()?;

        Ok(Self {
            image_shape: cfg.image_shape(),
            patch_shape: cfg.patch_shape(),
            in_channels: cfg.in_channels,
            grid_rows:   grid.rows,
            grid_cols:   grid.cols,
            num_patches: grid.num_patches(),
            patch_dim:   grid.patch_dim(),
            seq_len:     grid.seq_len(),
            d_model:     cfg.d_model,
            num_heads:   cfg.num_heads,
            head_dim:    cfg.d_model / cfg.num_heads,
            mlp_size:    cfg.mlp_size,
            depth:       cfg.num_transformer_layers,
            num_outputs: cfg.num_outputs,
            pooling:     match cfg.pooling {
                Pooling::Mean => "mean".to_string(),
                Pooling::Cls  => "cls".to_string(),
            },
            params: ParamBreakdown::compute(cfg, grid.patch_dim(), grid.num_patches()),
        })
    }

    /// Bytes needed to hold the parameters as f32
    pub fn param_bytes(&self) -> usize {
        self.params.total * std::mem::size_of::<f32>()
    }

    pub fn display(&self) -> String {
        let mut out = String::new();
        out.push_str("ViT regressor\n");
        out.push_str(&format!("  image            {} x {} channels\n", self.image_shape, self.in_channels));
        out.push_str(&format!("  patch            {}\n", self.patch_shape));
        out.push_str(&format!("  grid             {} x {} = {} patches\n", self.grid_rows, self.grid_cols, self.num_patches));
        out.push_str(&format!("  patch dim        {}\n", self.patch_dim));
        out.push_str(&format!("  sequence length  {} (with class token)\n", self.seq_len));
        out.push_str(&format!("  d_model          {} ({} heads x {})\n", self.d_model, self.num_heads, self.head_dim));
        out.push_str(&format!("  mlp size         {}\n", self.mlp_size));
        out.push_str(&format!("  depth            {}\n", self.depth));
        out.push_str(&format!("  outputs          {} ({} pooling)\n", self.num_outputs, self.pooling));
        out.push_str("Parameters\n");
        out.push_str(&format!("  patch embedding  {}\n", self.params.patch_embedding));
        out.push_str(&format!("  per block        {}\n", self.params.per_block));
        out.push_str(&format!("  all blocks       {}\n", self.params.blocks));
        out.push_str(&format!("  head             {}\n", self.params.head));
        out.push_str(&format!(
            "  total            {} ({:.2}M, {:.1} MB f32)\n",
            self.params.total,
            self.params.total as f64 / 1_000_000.0,
            self.param_bytes() as f64 / 1_000_000.0,
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{backend::NdArray, module::Module};

    #[test]
    fn test_analytic_count_matches_module() {
        let cfg = ViTConfig::new()
            .with_image_shape(Dims2::new(12, 8))
            .with_patch_shape(Dims2::new(4, 4))
            .with_in_channels(2)
            .with_d_model(8)
            .with_num_heads(2)
            .with_mlp_size(12)
            .with_num_transformer_layers(3)
            .with_num_outputs(2);

        let summary = ModelSummary::from_config(&cfg).unwrap();
        let model   = cfg.init::<NdArray>(&Default::default());
        assert_eq!(summary.params.total, model.num_params());
    }

    #[test]
    fn test_default_sequence_bookkeeping() {
        let s = ModelSummary::from_config(&ViTConfig::new()).unwrap();
        assert_eq!(s.num_patches, 10);
        assert_eq!(s.seq_len, 11);
        assert_eq!(s.patch_dim, 6784);
        assert_eq!(s.head_dim, 128);
        assert!(s.display().contains("5 x 2 = 10 patches"));
    }

    #[test]
    fn test_invalid_config_has_no_summary() {
        let cfg = ViTConfig::new().with_patch_shape(Dims2::new(30, 53));
        assert!(ModelSummary::from_config(&cfg).is_err());
    }
}
