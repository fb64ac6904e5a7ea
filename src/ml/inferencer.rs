// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Rebuilds the model from train_config.json, loads weights and
// channel stats, then predicts in batches of `batch_size`.
//
// Inputs may carry labels; when they do, the label count must
// match the model's outputs.

use anyhow::{anyhow, Context, Result};
use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::{batcher::{ImageBatch, ImageBatcher}, normalizer::ChannelStats};
use crate::domain::{sample::ImageSample, shape::Dims2};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::vit::ViT;

type InferBackend = burn::backend::Wgpu;

pub struct Predictor<B: Backend = InferBackend> {
    model:       ViT<B>,
    stats:       ChannelStats,
    batcher:     ImageBatcher,
    channels:    usize,
    image:       Dims2,
    num_outputs: usize,
    batch_size:  usize,
    device:      B::Device,
}

impl Predictor<InferBackend> {
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager, epoch: Option<usize>) -> Result<Self> {
        Self::load(ckpt_manager, epoch, burn::backend::wgpu::WgpuDevice::default())
    }
}

impl<B: Backend> Predictor<B> {
    pub fn load(
        ckpt_manager: &CheckpointManager,
        epoch:        Option<usize>,
        device:       B::Device,
    ) -> Result<Self> {
        let cfg       = ckpt_manager.load_config()?;
        let model_cfg = cfg.model_config();
        model_cfg.validate().context("Saved training config is invalid")?;

        let model: ViT<B> = model_cfg.init(&device);
        let model = ckpt_manager.load_model(model, epoch, &device)?;

        let stats = match ckpt_manager.load_stats() {
            Ok(stats) if stats.is_valid_for(cfg.in_channels) => stats,
            Ok(stats) => {
                tracing::warn!(
                    "Channel stats cover {} channels but the model has {}; inputs will not be normalised",
                    stats.channels(),
                    cfg.in_channels,
                );
                ChannelStats::identity(cfg.in_channels)
            }
            Err(e) => {
                tracing::warn!("No channel stats found ({e:#}); inputs will not be normalised");
                ChannelStats::identity(cfg.in_channels)
            }
        };
        tracing::info!("Model loaded from checkpoint");

        Ok(Self {
            model,
            stats,
            batcher:     ImageBatcher::new(cfg.in_channels, cfg.image_shape, cfg.num_outputs),
            channels:    cfg.in_channels,
            image:       cfg.image_shape,
            num_outputs: cfg.num_outputs,
            batch_size:  cfg.batch_size.max(1),
            device,
        })
    }

    /// One output vector per input sample, in input order.
    pub fn predict(&self, samples: &[ImageSample]) -> Result<Vec<Vec<f32>>> {
        let mut prepared = Vec::with_capacity(samples.len());
        for (i, s) in samples.iter().enumerate() {
            s.validate(self.channels, self.image, s.is_labelled().then_some(self.num_outputs))
                .with_context(|| format!("Input sample {i}"))?;
            let mut s = s.clone();
            self.stats.apply(&mut s, self.image);
            prepared.push(s);
        }

        let mut predictions = Vec::with_capacity(prepared.len());
        for chunk in prepared.chunks(self.batch_size) {
            let batch: ImageBatch<B> = self.batcher.batch(chunk.to_vec(), &self.device);
            let output = self.model.forward(batch.images);

            let values = output
                .into_data()
                .to_vec::<f32>()
                .map_err(|e| anyhow!("Cannot read predictions: {e:?}"))?;

            predictions.extend(values.chunks(self.num_outputs).map(<[f32]>::to_vec));
        }

        tracing::debug!("Predicted {} samples", predictions.len());
        Ok(predictions)
    }
}
