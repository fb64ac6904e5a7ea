// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate the model config       (Layer 5 - ml)
//   Step 2: Load samples                    (Layer 4 - data)
//   Step 3: Drop samples with bad shapes    (Layer 3 - domain)
//   Step 4: Split train/validation          (Layer 4 - data)
//   Step 5: Fit + apply channel stats       (Layer 4 - data)
//   Step 6: Save config and stats           (Layer 6 - infra)
//   Step 7: Run training loop               (Layer 5 - ml)

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::ImageDataset,
    loader::JsonlLoader,
    normalizer::ChannelStats,
    splitter::split_train_val,
    synthetic::SyntheticSource,
};
use crate::domain::{sample::ImageSample, shape::Dims2, traits::SampleSource};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    trainer::{run_training, TrainReport},
    vit::{Pooling, ViTConfig},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// Data, optimisation and model settings for one run.
// Saved as train_config.json so prediction can rebuild the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// JSON-lines file or directory; None trains on synthetic samples
    pub data_path:         Option<String>,
    pub synthetic_samples: usize,
    pub checkpoint_dir:    String,
    pub batch_size:        usize,
    pub epochs:            usize,
    pub lr:                f64,
    pub train_fraction:    f64,
    pub seed:              u64,
    pub num_workers:       usize,
    pub image_shape:       Dims2,
    pub patch_shape:       Dims2,
    pub in_channels:       usize,
    pub d_model:           usize,
    pub num_heads:         usize,
    pub num_layers:        usize,
    pub mlp_size:          usize,
    pub dropout:           f64,
    pub num_outputs:       usize,
    pub pooling:           Pooling,
}

impl Default for TrainConfig {
    fn default() -> Self {
        let model = ViTConfig::new();
        Self {
            data_path:         None,
            synthetic_samples: 256,
            checkpoint_dir:    "checkpoints".to_string(),
            batch_size:        16,
            epochs:            10,
            lr:                1e-4,
            train_fraction:    0.8,
            seed:              42,
            num_workers:       1,
            image_shape:       model.image_shape(),
            patch_shape:       model.patch_shape(),
            in_channels:       model.in_channels,
            d_model:           model.d_model,
            num_heads:         model.num_heads,
            num_layers:        model.num_transformer_layers,
            mlp_size:          model.mlp_size,
            dropout:           model.dropout_rate,
            num_outputs:       model.num_outputs,
            pooling:           model.pooling,
        }
    }
}

impl TrainConfig {
    pub fn model_config(&self) -> ViTConfig {
        ViTConfig::new()
            .with_image_shape(self.image_shape)
            .with_patch_shape(self.patch_shape)
            .with_in_channels(self.in_channels)
            .with_d_model(self.d_model)
            .with_num_heads(self.num_heads)
            .with_num_transformer_layers(self.num_layers)
            .with_mlp_size(self.mlp_size)
            .with_dropout_rate(self.dropout)
            .with_num_outputs(self.num_outputs)
            .with_pooling(self.pooling.clone())
    }

    fn source(&self) -> Box<dyn SampleSource> {
        match &self.data_path {
            Some(path) => Box::new(JsonlLoader::new(path)),
            None => Box::new(
                SyntheticSource::new(
                    self.synthetic_samples,
                    self.in_channels,
                    self.image_shape,
                    self.num_outputs,
                    self.seed,
                )
                .with_noise(0.01),
            ),
        }
    }
}

/// Normalised datasets ready for the training loop
pub struct PreparedData {
    pub train: ImageDataset,
    pub val:   ImageDataset,
    pub stats: ChannelStats,
}

pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Steps 1–5: everything up to the point tensors are needed
    pub fn prepare(&self) -> Result<PreparedData> {
        let cfg = &self.config;

        // ── Step 1: Model shapes must be consistent before anything else ──────
        let grid = cfg.model_config().validate()?;
        tracing::info!(
            "Image {} cut into {} patches of {} ({} tokens per image)",
            cfg.image_shape,
            grid.num_patches(),
            cfg.patch_shape,
            grid.seq_len(),
        );

        // ── Step 2: Load ──────────────────────────────────────────────────────
        let raw = cfg.source().load_all()?;

        // ── Step 3: Keep only labelled samples with the right geometry ────────
        let total = raw.len();
        let samples: Vec<ImageSample> = raw
            .into_iter()
            .enumerate()
            .filter_map(|(i, s)| {
                match s.validate(cfg.in_channels, cfg.image_shape, Some(cfg.num_outputs)) {
                    Ok(()) => Some(s),
                    Err(e) => {
                        tracing::warn!("Skipping sample {}: {}", i, e);
                        None
                    }
                }
            })
            .collect();

        if samples.is_empty() {
            bail!("No usable samples ({} loaded, all rejected)", total);
        }
        tracing::info!("{} of {} samples usable", samples.len(), total);

        // ── Step 4: Train / validation split ──────────────────────────────────
        let (mut train, mut val) = split_train_val(samples, cfg.train_fraction, cfg.seed);
        if train.is_empty() {
            bail!("train_fraction {} leaves no training samples", cfg.train_fraction);
        }
        tracing::info!("Split: {} train, {} validation", train.len(), val.len());

        // ── Step 5: Normalise with stats from the training split only ─────────
        let stats = ChannelStats::fit(&train, cfg.in_channels, cfg.image_shape);
        stats.apply_all(&mut train, cfg.image_shape);
        stats.apply_all(&mut val, cfg.image_shape);

        Ok(PreparedData {
            train: ImageDataset::new(train),
            val:   ImageDataset::new(val),
            stats,
        })
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainReport> {
        let cfg      = &self.config;
        let prepared = self.prepare()?;

        // ── Step 6: Save what inference needs to rebuild the model ────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir);
        ckpt_manager.save_config(cfg)?;
        ckpt_manager.save_stats(&prepared.stats)?;

        // ── Step 7: Run training loop (Layer 5) ───────────────────────────────
        run_training(cfg, prepared.train, prepared.val, &ckpt_manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::write_jsonl;

    fn small() -> TrainConfig {
        TrainConfig {
            synthetic_samples: 20,
            image_shape:       Dims2::new(4, 4),
            patch_shape:       Dims2::new(2, 2),
            in_channels:       2,
            d_model:           8,
            num_heads:         2,
            mlp_size:          8,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_default_config_matches_model_defaults() {
        let cfg = TrainConfig::default();
        let vit = cfg.model_config();
        assert_eq!(vit.image_shape(), Dims2::new(160, 106));
        assert_eq!(vit.patch_shape(), Dims2::new(32, 53));
        assert_eq!(vit.d_model, 512);
        assert_eq!(vit.dropout_rate, 0.2);
        assert!(vit.validate().is_ok());
    }

    #[test]
    fn test_config_json_round_trip() {
        let cfg  = TrainConfig { pooling: Pooling::Cls, ..small() };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: TrainConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.image_shape, cfg.image_shape);
        assert_eq!(back.pooling, Pooling::Cls);
    }

    #[test]
    fn test_prepare_synthetic_split_and_normalise() {
        let prepared = TrainUseCase::new(small()).prepare().unwrap();
        assert_eq!(prepared.train.sample_count(), 16);
        assert_eq!(prepared.val.sample_count(), 4);
        assert_eq!(prepared.stats.channels(), 2);
    }

    #[test]
    fn test_prepare_drops_bad_samples() {
        let dir  = tempfile::tempdir().unwrap();
        let file = dir.path().join("data.jsonl");
        let good = ImageSample::new(vec![0.5; 2 * 16], vec![1.0]);
        write_jsonl(
            &file,
            &[
                good.clone(),
                good.clone(),
                ImageSample::new(vec![0.5; 3], vec![1.0]),   // wrong pixel count
                ImageSample::unlabelled(vec![0.5; 2 * 16]),  // no target
            ],
        )
        .unwrap();

        let cfg = TrainConfig {
            data_path: Some(file.display().to_string()),
            train_fraction: 0.5,
            ..small()
        };
        let prepared = TrainUseCase::new(cfg).prepare().unwrap();
        assert_eq!(prepared.train.sample_count() + prepared.val.sample_count(), 2);
    }

    #[test]
    fn test_prepare_rejects_bad_model_shape() {
        let cfg = TrainConfig { patch_shape: Dims2::new(3, 3), ..small() };
        assert!(TrainUseCase::new(cfg).prepare().is_err());
    }
}
