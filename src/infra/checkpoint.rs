// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using burn's CompactRecorder,
// plus the JSON side files inference needs to rebuild the model.
//
// File layout:
//   checkpoints/
//     model_epoch_1.mpk.gz   ← weights after epoch 1
//     model_epoch_2.mpk.gz
//     ...
//     latest_epoch.json      ← last epoch written
//     best_epoch.json        ← epoch with the lowest validation loss
//     train_config.json      ← TrainConfig (model architecture included)
//     channel_stats.json     ← per-channel mean/std from the training split
//
// CompactRecorder serialises to MessagePack and gzips; loading
// fails if the record does not match the model architecture.

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde::{de::DeserializeOwned, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::data::normalizer::ChannelStats;
use crate::ml::vit::ViT;

const LATEST_EPOCH: &str = "latest_epoch.json";
const BEST_EPOCH:   &str = "best_epoch.json";
const TRAIN_CONFIG: &str = "train_config.json";
const STATS:        &str = "channel_stats.json";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a new CheckpointManager, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        fs::create_dir_all(&dir).ok();
        Self { dir }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Save weights for `epoch` and move the latest pointer to it.
    pub fn save_model<B: Backend>(&self, model: &ViT<B>, epoch: usize) -> Result<()> {
        // Recorder adds the extension
        let path = self.dir.join(format!("model_epoch_{epoch}"));

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| {
                format!("Failed to save checkpoint to '{}'", path.display())
            })?;

        self.write_json(LATEST_EPOCH, &epoch)?;
        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Forget the latest / best pointers of any earlier run in this
    /// directory. Called once before the first epoch of a new run.
    pub fn reset_epochs(&self) -> Result<()> {
        for name in [LATEST_EPOCH, BEST_EPOCH] {
            let path = self.dir.join(name);
            if path.exists() {
                fs::remove_file(&path)
                    .with_context(|| format!("Cannot remove '{}'", path.display()))?;
            }
        }
        Ok(())
    }

    /// Record `epoch` as the best one seen so far
    pub fn mark_best(&self, epoch: usize) -> Result<()> {
        self.write_json(BEST_EPOCH, &epoch)
    }

    /// Load weights into `model`.
    ///
    /// Epoch choice: `epoch` if given, else the best epoch,
    /// else the latest one.
    pub fn load_model<B: Backend>(
        &self,
        model:  ViT<B>,
        epoch:  Option<usize>,
        device: &B::Device,
    ) -> Result<ViT<B>> {
        let epoch = self.resolve_epoch(epoch)?;
        let path  = self.dir.join(format!("model_epoch_{epoch}"));

        tracing::info!("Loading checkpoint from epoch {}", epoch);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!(
                    "Cannot load checkpoint '{}'. Have you trained the model first?",
                    path.display()
                )
            })?;

        Ok(model.load_record(record))
    }

    pub fn resolve_epoch(&self, requested: Option<usize>) -> Result<usize> {
        if let Some(epoch) = requested {
            return Ok(epoch);
        }
        if self.dir.join(BEST_EPOCH).exists() {
            return self.read_json(BEST_EPOCH);
        }
        self.read_json(LATEST_EPOCH).with_context(|| {
            format!(
                "No checkpoint found in '{}'. Have you run 'train' first?",
                self.dir.display()
            )
        })
    }

    /// Must be called before training so inference can rebuild the model
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        self.write_json(TRAIN_CONFIG, cfg)
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        self.read_json(TRAIN_CONFIG).with_context(|| {
            "Cannot read training config. Make sure you have run 'train' before 'predict'."
        })
    }

    pub fn save_stats(&self, stats: &ChannelStats) -> Result<()> {
        self.write_json(STATS, stats)
    }

    pub fn load_stats(&self) -> Result<ChannelStats> {
        self.read_json(STATS)
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write '{}'", path.display()))
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Cannot parse '{}'", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shape::Dims2;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn tiny_config() -> TrainConfig {
        TrainConfig {
            image_shape: Dims2::new(8, 8),
            patch_shape: Dims2::new(4, 4),
            in_channels: 1,
            d_model:     8,
            num_heads:   2,
            num_layers:  1,
            mlp_size:    16,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_config_and_stats_round_trip() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());

        let cfg = tiny_config();
        ckpt.save_config(&cfg).unwrap();
        let loaded = ckpt.load_config().unwrap();
        assert_eq!(loaded.image_shape, cfg.image_shape);
        assert_eq!(loaded.d_model, cfg.d_model);

        let stats = ChannelStats { mean: vec![0.5], std: vec![2.0] };
        ckpt.save_stats(&stats).unwrap();
        assert_eq!(ckpt.load_stats().unwrap(), stats);
    }

    #[test]
    fn test_model_weights_survive_save_and_load() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path());
        let device = Default::default();
        let cfg    = tiny_config().model_config();

        let model = cfg.init::<TestBackend>(&device);
        ckpt.save_model(&model, 1).unwrap();

        let fresh  = cfg.init::<TestBackend>(&device);
        let loaded = ckpt.load_model(fresh, None, &device).unwrap();

        // Weights are stored as f16, so outputs match only approximately
        let images = Tensor::<TestBackend, 4>::ones([1, 1, 8, 8], &device);
        let a = model.forward(images.clone()).into_data().to_vec::<f32>().unwrap();
        let b = loaded.forward(images).into_data().to_vec::<f32>().unwrap();
        assert!((a[0] - b[0]).abs() < 1e-2);
    }

    #[test]
    fn test_best_epoch_wins_over_latest() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());

        ckpt.write_json(LATEST_EPOCH, &3usize).unwrap();
        assert_eq!(ckpt.resolve_epoch(None).unwrap(), 3);

        ckpt.mark_best(2).unwrap();
        assert_eq!(ckpt.resolve_epoch(None).unwrap(), 2);
        assert_eq!(ckpt.resolve_epoch(Some(1)).unwrap(), 1);
    }

    #[test]
    fn test_reset_clears_previous_run() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());

        ckpt.write_json(LATEST_EPOCH, &3usize).unwrap();
        ckpt.mark_best(3).unwrap();
        ckpt.reset_epochs().unwrap();
        assert!(ckpt.resolve_epoch(None).is_err());

        // Resetting an empty directory is fine too
        ckpt.reset_epochs().unwrap();
    }

    #[test]
    fn test_empty_dir_has_no_epoch() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());
        assert!(ckpt.resolve_epoch(None).is_err());
    }
}
