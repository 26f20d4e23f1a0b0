// ============================================================
// Layer 5 - ML / Training Layer (Burn)
// ============================================================
// Everything that touches Burn tensors and autodiff lives
// here or in data::batcher:
//
//   model.rs      - the configurable MLP (Dense layers, Tanh,
//                   Softmax) and its cross-entropy cost
//
//   optimizer.rs  - fixed-rate steepest descent on top of
//                   Burn's plain Sgd
//
//   main_loop.rs  - the epoch loop: forward, backward,
//                   update, then the extension hooks
//
//   extensions.rs - FinishAfter, DataStreamMonitoring,
//                   Checkpointing, MetricsLogging, Printing
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Multilayer perceptron and its classification output
pub mod model;

/// Steepest descent step rule
pub mod optimizer;

/// The training main loop
pub mod main_loop;

/// Hooks run at the main loop's boundaries
pub mod extensions;

/// Backend used for training. NdArray on the CPU by default,
/// wgpu when built with `--features wgpu`.
#[cfg(not(feature = "wgpu"))]
pub type TrainBackend = burn::backend::Autodiff<burn::backend::NdArray>;

#[cfg(feature = "wgpu")]
pub type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;
