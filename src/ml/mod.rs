// ============================================================
// Layer 5 — ML / Model Layer (burn)
// ============================================================
// All burn model code lives here.
//
//   patch_embedding.rs — image → patch tokens + class token
//                        + learned positional embedding
//   attention.rs       — LayerNorm + multi-head self-attention
//   feed_forward.rs    — LayerNorm + two-layer GELU MLP
//   block.rs           — residual attention / MLP block
//   vit.rs             — the full regressor and its config
//   summary.rs         — shape and parameter bookkeeping
//   trainer.rs         — Adam / MSE training loop
//   inferencer.rs      — checkpoint → predictions
//
// Reference: Dosovitskiy et al. (2020) An Image is Worth 16x16 Words

pub mod patch_embedding;

pub mod attention;

pub mod feed_forward;

pub mod block;

/// Vision Transformer regressor
pub mod vit;

pub mod summary;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Loads a checkpoint and predicts
pub mod inferencer;
