// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// Everything from a stored dataset to tensor batches:
//
//   MNIST split (burn vision dataset)
//       │   MnistToDigit: flatten 28x28, scale to [0, 1]
//       ▼
//   Dataset<DigitSample>
//       │
//       ▼
//   SequentialScheme  → index ranges [0,B), [B,2B), ...
//       │
//       ▼
//   DataStream        → validated Vec<DigitSample> per batch
//       │
//       ▼
//   DigitBatcher      → DigitBatch { features, targets }
//
// Two streams exist per run: training (small batches) and
// evaluation on the test split (large batches).
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// MNIST-backed datasets of DigitSample
pub mod dataset;

/// Sequential index ranges for one pass
pub mod scheme;

/// Restartable, validated batch stream
pub mod stream;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
