// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Cross-cutting persistence used by the main loop extensions:
//
//   checkpoint.rs - one-file checkpoint of model weights,
//                   training state and run configuration,
//                   written with Burn's NamedMpkBytesRecorder
//
//   metrics.rs    - per-epoch CSV log of the training cost
//                   and every monitored metric
//
// Reference: Burn Book §5 (Checkpointing)

/// Model + state checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
