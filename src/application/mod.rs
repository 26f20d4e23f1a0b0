// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// Turns a TrainConfig into a wired-up main loop and runs it.
// No tensor math and no argument parsing here; only workflow
// coordination between the data, ml and infra layers.

/// The training workflow
pub mod train_use_case;
