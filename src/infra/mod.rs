// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting persistence used by training and prediction:
//
//   checkpoint.rs — model weights via burn's CompactRecorder,
//                   plus the training config, channel stats
//                   and latest / best epoch pointers as JSON
//
//   metrics.rs    — per-epoch loss / MAE rows in a CSV file

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
