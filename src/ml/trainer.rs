// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Train + validation loop using burn's DataLoader and Adam.
//
//   - Training runs on an AutodiffBackend so dropout is live
//     and gradients are tracked
//   - model.valid() hands back the same weights on the inner
//     backend for validation: no autodiff, no dropout
//   - Loss is MSE; validation also reports MAE
//   - Every epoch is checkpointed; the lowest validation loss
//     is recorded as the best epoch
//
// Reference: Kingma & Ba (2015) Adam

use anyhow::{bail, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::ImageBatcher, dataset::ImageDataset};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::vit::ViT;

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub epochs:     Vec<EpochMetrics>,
    pub best_epoch: Option<usize>,
}

pub fn run_training(
    cfg:           &TrainConfig,
    train_dataset: ImageDataset,
    val_dataset:   ImageDataset,
    ckpt_manager:  &CheckpointManager,
) -> Result<TrainReport> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop::<MyBackend>(cfg, train_dataset, val_dataset, ckpt_manager, device)
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    train_dataset: ImageDataset,
    val_dataset:   ImageDataset,
    ckpt_manager:  &CheckpointManager,
    device:        B::Device,
) -> Result<TrainReport> {
    if train_dataset.sample_count() == 0 {
        bail!("Training set is empty; nothing to fit");
    }

    // ── Build model ───────────────────────────────────────────────────────────
    let model_cfg = cfg.model_config();
    let grid      = model_cfg.validate()?;
    let mut model: ViT<B> = model_cfg.init(&device);
    tracing::info!(
        "Model ready: {} layers, d_model={}, {} patches/image, {} parameters",
        model_cfg.num_transformer_layers,
        model_cfg.d_model,
        grid.num_patches(),
        model.num_params(),
    );

    let mut optim = AdamConfig::new().with_epsilon(1e-8).init();

    let batcher = ImageBatcher::new(cfg.in_channels, cfg.image_shape, cfg.num_outputs);

    let train_loader = DataLoaderBuilder::new(batcher.clone())
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(cfg.num_workers)
        .build(train_dataset);

    // Validation runs on the inner backend, no autodiff overhead
    let val_loader = DataLoaderBuilder::new(batcher)
        .batch_size(cfg.batch_size)
        .num_workers(cfg.num_workers)
        .build(val_dataset);

    // Drop latest / best pointers left by an earlier run in this dir
    ckpt_manager.reset_epochs()?;

    let logger        = MetricsLogger::new(ckpt_manager.dir().clone())?;
    let mut history   = Vec::with_capacity(cfg.epochs);
    let mut best_loss = f64::INFINITY;
    let mut best      = None;

    for epoch in 1..=cfg.epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;

        for batch in train_loader.iter() {
            let out = model.forward_regression(batch.images, batch.targets);

            train_loss_sum += out.loss.clone().into_scalar().elem::<f64>();
            train_batches  += 1;

            let grads = out.loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);
        }

        let avg_train_loss = if train_batches > 0 {
            train_loss_sum / train_batches as f64
        } else { f64::NAN };

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();

        let mut sq_err_sum  = 0.0f64;
        let mut abs_err_sum = 0.0f64;
        let mut count       = 0usize;

        for batch in val_loader.iter() {
            let out  = model_valid.forward_regression(batch.images, batch.targets);
            let diff = out.output - out.targets;
            let [n, outputs] = diff.dims();

            sq_err_sum  += (diff.clone() * diff.clone()).sum().into_scalar().elem::<f64>();
            abs_err_sum += diff.abs().sum().into_scalar().elem::<f64>();
            count       += n * outputs;
        }

        let (val_loss, val_mae) = if count > 0 {
            (sq_err_sum / count as f64, abs_err_sum / count as f64)
        } else {
            (f64::NAN, f64::NAN)
        };

        let metrics = EpochMetrics::new(epoch, avg_train_loss, val_loss, val_mae);

        println!(
            "Epoch {:>3}/{} | train_mse={:.4} | val_mse={:.4} | val_mae={:.4}",
            epoch, cfg.epochs, avg_train_loss, val_loss, val_mae,
        );
        logger.log(&metrics)?;

        ckpt_manager.save_model(&model, epoch)?;
        if metrics.is_improvement(best_loss) {
            best_loss = metrics.val_loss;
            best      = Some(epoch);
            ckpt_manager.mark_best(epoch)?;
            tracing::info!("Epoch {} is the new best (val_mse={:.4})", epoch, val_loss);
        }
        tracing::info!("Checkpoint saved for epoch {}", epoch);

        history.push(metrics);
    }

    tracing::info!("Training complete!");
    Ok(TrainReport { epochs: history, best_epoch: best })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::SyntheticSource;
    use crate::domain::{shape::Dims2, traits::SampleSource};
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray>;

    fn tiny_config(dir: &std::path::Path) -> TrainConfig {
        TrainConfig {
            checkpoint_dir: dir.display().to_string(),
            image_shape:    Dims2::new(8, 8),
            patch_shape:    Dims2::new(4, 4),
            in_channels:    2,
            d_model:        8,
            num_heads:      2,
            num_layers:     1,
            mlp_size:       16,
            dropout:        0.1,
            batch_size:     4,
            epochs:         2,
            lr:             1e-3,
            num_workers:    1,
            ..TrainConfig::default()
        }
    }

    fn samples(count: usize, seed: u64) -> Vec<crate::domain::sample::ImageSample> {
        SyntheticSource::new(count, 2, Dims2::new(8, 8), 1, seed)
            .load_all()
            .unwrap()
    }

    #[test]
    fn test_runs_epochs_and_checkpoints() {
        let dir  = tempfile::tempdir().unwrap();
        let cfg  = tiny_config(dir.path());
        let ckpt = CheckpointManager::new(dir.path());

        let report = train_loop::<TestBackend>(
            &cfg,
            ImageDataset::new(samples(8, 1)),
            ImageDataset::new(samples(4, 2)),
            &ckpt,
            Default::default(),
        )
        .unwrap();

        assert_eq!(report.epochs.len(), 2);
        assert!(report.epochs.iter().all(|m| m.train_loss.is_finite()));
        assert!(report.epochs.iter().all(|m| m.val_loss.is_finite()));
        assert!(report.best_epoch.is_some());
        assert!(dir.path().join("metrics.csv").exists());
        assert_eq!(ckpt.resolve_epoch(None).unwrap(), report.best_epoch.unwrap());
    }

    #[test]
    fn test_empty_validation_gives_nan_and_no_best() {
        let dir  = tempfile::tempdir().unwrap();
        let cfg  = TrainConfig { epochs: 1, ..tiny_config(dir.path()) };
        let ckpt = CheckpointManager::new(dir.path());

        let report = train_loop::<TestBackend>(
            &cfg,
            ImageDataset::new(samples(4, 3)),
            ImageDataset::new(Vec::new()),
            &ckpt,
            Default::default(),
        )
        .unwrap();

        assert!(report.epochs[0].val_loss.is_nan());
        assert!(report.best_epoch.is_none());
        // Latest checkpoint is still resolvable
        assert_eq!(ckpt.resolve_epoch(None).unwrap(), 1);
    }

    #[test]
    fn test_rerun_in_same_dir_forgets_old_best() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());

        let first = train_loop::<TestBackend>(
            &TrainConfig { epochs: 3, ..tiny_config(dir.path()) },
            ImageDataset::new(samples(8, 1)),
            ImageDataset::new(samples(4, 2)),
            &ckpt,
            Default::default(),
        )
        .unwrap();
        assert!(first.best_epoch.is_some());

        // Second run has no validation data, so no epoch is best
        let second = train_loop::<TestBackend>(
            &TrainConfig { epochs: 1, ..tiny_config(dir.path()) },
            ImageDataset::new(samples(4, 3)),
            ImageDataset::new(Vec::new()),
            &ckpt,
            Default::default(),
        )
        .unwrap();
        assert!(second.best_epoch.is_none());
        assert_eq!(ckpt.resolve_epoch(None).unwrap(), 1);
    }

    #[test]
    fn test_empty_training_set_is_an_error() {
        let dir  = tempfile::tempdir().unwrap();
        let cfg  = tiny_config(dir.path());
        let ckpt = CheckpointManager::new(dir.path());

        let result = train_loop::<TestBackend>(
            &cfg,
            ImageDataset::new(Vec::new()),
            ImageDataset::new(samples(2, 4)),
            &ckpt,
            Default::default(),
        );
        assert!(result.is_err());
    }
}
