// ============================================================
// Layer 3 - Domain Layer
// ============================================================
// Plain Rust types that describe a training run, independent
// of the tensor framework:
//
//   sample.rs - one labelled digit image (features + class)
//   state.rs  - epoch / iteration counters, best metrics and
//               the per-epoch log owned by the main loop
//   error.rs  - the error taxonomy shared by every layer
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//
// Reference: Rust Book §5 (Structs), §9 (Error Handling)

/// A labelled example fed to the network
pub mod sample;

/// Training progress: counters, status, metric log
pub mod state;

/// Configuration / computation / I/O error taxonomy
pub mod error;
