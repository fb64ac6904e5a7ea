// ============================================================
// Layer 5 — Multi-Head Attention Block
// ============================================================
// LayerNorm → multi-head self-attention (q = k = v).
// Dropout is applied to the attention weights inside burn's
// MultiHeadAttention. No residual here; TransformerBlock adds it.

use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        LayerNorm, LayerNormConfig,
    },
    prelude::*,
};

#[derive(Config, Debug)]
pub struct MultiHeadAttentionBlockConfig {
    pub d_model:      usize,
    pub num_heads:    usize,
    #[config(default = 0.0)]
    pub attn_dropout: f64,
}

impl MultiHeadAttentionBlockConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> MultiHeadAttentionBlock<B> {
        MultiHeadAttentionBlock {
            norm:      LayerNormConfig::new(self.d_model).init(device),
            attention: MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
                .with_dropout(self.attn_dropout)
                .init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct MultiHeadAttentionBlock<B: Backend> {
    pub norm:      LayerNorm<B>,
    pub attention: MultiHeadAttention<B>,
}

impl<B: Backend> MultiHeadAttentionBlock<B> {
    /// x: [batch, seq_len, d_model] → [batch, seq_len, d_model]
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let x = self.norm.forward(x);
        self.attention.forward(MhaInput::self_attn(x)).context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_preserves_shape() {
        let device = Default::default();
        let block  = MultiHeadAttentionBlockConfig::new(16, 4)
            .with_attn_dropout(0.2)
            .init::<TestBackend>(&device);

        let x = Tensor::<TestBackend, 3>::random(
            [2, 5, 16],
            burn::tensor::Distribution::Default,
            &device,
        );
        assert_eq!(block.forward(x).dims(), [2, 5, 16]);
    }

    #[test]
    fn test_tokens_attend_within_their_own_sample() {
        // Changing sample 1 must not change the output for sample 0
        let device = Default::default();
        let block  = MultiHeadAttentionBlockConfig::new(8, 2).init::<TestBackend>(&device);

        let a = Tensor::<TestBackend, 3>::random([1, 3, 8], burn::tensor::Distribution::Default, &device);
        let b = Tensor::<TestBackend, 3>::random([1, 3, 8], burn::tensor::Distribution::Default, &device);
        let c = Tensor::<TestBackend, 3>::random([1, 3, 8], burn::tensor::Distribution::Default, &device);

        let out_ab = block.forward(Tensor::cat(vec![a.clone(), b], 0));
        let out_ac = block.forward(Tensor::cat(vec![a, c], 0));

        let first_ab = out_ab.slice([0..1, 0..3, 0..8]).into_data().to_vec::<f32>().unwrap();
        let first_ac = out_ac.slice([0..1, 0..3, 0..8]).into_data().to_vec::<f32>().unwrap();
        for (x, y) in first_ab.iter().zip(&first_ac) {
            assert!((x - y).abs() < 1e-5);
        }
    }
}
