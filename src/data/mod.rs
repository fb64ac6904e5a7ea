// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from raw samples to device-ready tensor batches:
//
//   JsonlLoader / SyntheticSource   → Vec<ImageSample>
//       │
//       ▼
//   split_train_val                 → train / validation
//       │
//       ▼
//   ChannelStats                    → fitted on train, applied to both
//       │
//       ▼
//   ImageDataset                    → burn Dataset
//       │
//       ▼
//   ImageBatcher                    → burn Batcher → ImageBatch
//       │
//       ▼
//   DataLoader                      → feeds the training loop

/// Reads samples from JSON-lines files
pub mod loader;

/// Seeded random samples with a known target
pub mod synthetic;

/// Per-channel standardisation
pub mod normalizer;

/// burn Dataset over image samples
pub mod dataset;

/// burn Batcher producing image/target tensors
pub mod batcher;

/// Seeded shuffle and train/validation split
pub mod splitter;
