// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Three subcommands: `train`, `predict` and `summary`.
//
// Model architecture flags live in ModelArgs and are shared by
// `train` and `summary`. Shapes are written as (height, width)
// pairs, e.g. --image-shape "(160, 106)" --patch-shape 32x53.

use clap::{Args, Subcommand, ValueEnum};

use crate::application::train_use_case::TrainConfig;
use crate::domain::shape::Dims2;
use crate::ml::vit::{Pooling, ViTConfig};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the ViT regressor on JSON-lines image samples
    Train(TrainArgs),

    /// Predict with a trained checkpoint
    Predict(PredictArgs),

    /// Print patch / sequence / parameter bookkeeping for a model config
    Summary(SummaryArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Architecture flags
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Image (height, width); must be a multiple of the patch shape
    #[arg(long, default_value = "(160, 106)")]
    pub image_shape: Dims2,

    /// Patch (height, width)
    #[arg(long, default_value = "(32, 53)")]
    pub patch_shape: Dims2,

    /// Number of image channels
    #[arg(long, default_value_t = 4)]
    pub in_channels: usize,

    /// Token embedding width; must be divisible by num_heads
    #[arg(long, default_value_t = 512)]
    pub d_model: usize,

    #[arg(long, default_value_t = 4)]
    pub num_heads: usize,

    /// Number of stacked transformer blocks
    #[arg(long, default_value_t = 2)]
    pub num_layers: usize,

    /// Hidden width of each block's MLP
    #[arg(long, default_value_t = 1048)]
    pub mlp_size: usize,

    /// Dropout for both attention weights and MLP activations
    #[arg(long, default_value_t = 0.2)]
    pub dropout: f64,

    /// Number of regression outputs
    #[arg(long, default_value_t = 1)]
    pub num_outputs: usize,

    /// How token outputs are reduced: mean | cls
    #[arg(long, default_value = "mean")]
    pub pooling: Pooling,
}

impl From<ModelArgs> for ViTConfig {
    fn from(a: ModelArgs) -> Self {
        ViTConfig::new()
            .with_image_shape(a.image_shape)
            .with_patch_shape(a.patch_shape)
            .with_in_channels(a.in_channels)
            .with_d_model(a.d_model)
            .with_num_heads(a.num_heads)
            .with_num_transformer_layers(a.num_layers)
            .with_mlp_size(a.mlp_size)
            .with_dropout_rate(a.dropout)
            .with_num_outputs(a.num_outputs)
            .with_pooling(a.pooling)
    }
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// JSON-lines file or directory of *.jsonl files.
    /// Omit to train on synthetic samples.
    #[arg(long)]
    pub data: Option<String>,

    /// Number of synthetic samples when --data is not given
    #[arg(long, default_value_t = 256)]
    pub synthetic_samples: usize,

    /// Directory to save checkpoints, config and metrics
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-4)]
    pub lr: f64,

    /// Share of samples used for training; the rest validates
    #[arg(long, default_value_t = 0.8)]
    pub train_fraction: f64,

    /// Seed for the split, shuffling and synthetic data
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, default_value_t = 1)]
    pub num_workers: usize,

    #[command(flatten)]
    pub model: ModelArgs,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_path:         a.data,
            synthetic_samples: a.synthetic_samples,
            checkpoint_dir:    a.checkpoint_dir,
            batch_size:        a.batch_size,
            epochs:            a.epochs,
            lr:                a.lr,
            train_fraction:    a.train_fraction,
            seed:              a.seed,
            num_workers:       a.num_workers,
            image_shape:       a.model.image_shape,
            patch_shape:       a.model.patch_shape,
            in_channels:       a.model.in_channels,
            d_model:           a.model.d_model,
            num_heads:         a.model.num_heads,
            num_layers:        a.model.num_layers,
            mlp_size:          a.model.mlp_size,
            dropout:           a.model.dropout,
            num_outputs:       a.model.num_outputs,
            pooling:           a.model.pooling,
        }
    }
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// JSON-lines file or directory with samples to predict
    #[arg(long)]
    pub input: String,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Epoch to load; defaults to the best, then the latest
    #[arg(long)]
    pub epoch: Option<usize>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}
