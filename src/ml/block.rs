// ============================================================
// Layer 5 — Transformer Block
// ============================================================
//   x = msa(x) + x
//   x = ff(x)  + x

use burn::prelude::*;

use crate::ml::{
    attention::{MultiHeadAttentionBlock, MultiHeadAttentionBlockConfig},
    feed_forward::{FeedForward, FeedForwardConfig},
};

#[derive(Config, Debug)]
pub struct TransformerBlockConfig {
    pub d_model:      usize,
    pub mlp_dropout:  f64,
    pub attn_dropout: f64,
    pub mlp_size:     usize,
    pub num_heads:    usize,
}

impl TransformerBlockConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> TransformerBlock<B> {
        TransformerBlock {
            msa_block: MultiHeadAttentionBlockConfig::new(self.d_model, self.num_heads)
                .with_attn_dropout(self.attn_dropout)
                .init(device),
            ff_block:  FeedForwardConfig::new(self.d_model, self.mlp_size)
                .with_mlp_dropout(self.mlp_dropout)
                .init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct TransformerBlock<B: Backend> {
    pub msa_block: MultiHeadAttentionBlock<B>,
    pub ff_block:  FeedForward<B>,
}

impl<B: Backend> TransformerBlock<B> {
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let x = self.msa_block.forward(x.clone()) + x;
        self.ff_block.forward(x.clone()) + x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_residual_composition() {
        let device = Default::default();
        let block  = TransformerBlockConfig::new(8, 0.0, 0.0, 16, 2).init::<TestBackend>(&device);
        let x      = Tensor::<TestBackend, 3>::random([2, 3, 8], burn::tensor::Distribution::Default, &device);

        let h        = block.msa_block.forward(x.clone()) + x.clone();
        let expected = block.ff_block.forward(h.clone()) + h;
        let got      = block.forward(x);

        let expected = expected.into_data().to_vec::<f32>().unwrap();
        let got      = got.into_data().to_vec::<f32>().unwrap();
        for (g, e) in got.iter().zip(&expected) {
            assert!((g - e).abs() < 1e-5);
        }
    }
}
