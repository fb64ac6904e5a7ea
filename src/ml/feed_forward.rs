// ============================================================
// Layer 5 — Feed Forward
// ============================================================
// LayerNorm → Linear(d_model → mlp_size) → GELU → Dropout
//           → Linear(mlp_size → d_model) → Dropout

use burn::{
    nn::{Dropout, DropoutConfig, LayerNorm, LayerNormConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation::gelu,
};

#[derive(Config, Debug)]
pub struct FeedForwardConfig {
    pub d_model:     usize,
    pub mlp_size:    usize,
    #[config(default = 0.0)]
    pub mlp_dropout: f64,
}

impl FeedForwardConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> FeedForward<B> {
        FeedForward {
            norm:    LayerNormConfig::new(self.d_model).init(device),
            linear1: LinearConfig::new(self.d_model, self.mlp_size).init(device),
            linear2: LinearConfig::new(self.mlp_size, self.d_model).init(device),
            dropout: DropoutConfig::new(self.mlp_dropout).init(),
        }
    }
}

#[derive(Module, Debug)]
pub struct FeedForward<B: Backend> {
    pub norm:    LayerNorm<B>,
    pub linear1: Linear<B>,
    pub linear2: Linear<B>,
    pub dropout: Dropout,
}

impl<B: Backend> FeedForward<B> {
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 3> {
        let x = self.norm.forward(x);
        let x = self.dropout.forward(gelu(self.linear1.forward(x)));
        self.dropout.forward(self.linear2.forward(x))
    }
}
