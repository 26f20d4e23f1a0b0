// ============================================================
// Layer 1 - CLI Arguments
// ============================================================
// Flags of the single `mnist-mlp` command. The positional
// argument and --num-epochs match the classic script:
//
//   mnist-mlp [SAVE_TO] [--num-epochs N]
//
// Everything else has the same default as TrainConfig.
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::path::PathBuf;

use clap::Args;

use crate::application::train_use_case::TrainConfig;

/// All arguments for a training run.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Destination of the checkpoint file
    #[arg(default_value = "mnist.pkl")]
    pub save_to: PathBuf,

    /// Number of epochs to perform
    #[arg(long, default_value_t = 2)]
    pub num_epochs: usize,

    /// Fixed step size of steepest descent
    #[arg(long, default_value_t = 0.1)]
    pub learning_rate: f64,

    /// Training examples per update
    #[arg(long, default_value_t = 50)]
    pub batch_size: usize,

    /// Test examples per evaluation batch
    #[arg(long, default_value_t = 500)]
    pub eval_batch_size: usize,

    /// Units in the tanh hidden layer
    #[arg(long, default_value_t = 100)]
    pub hidden_width: usize,

    /// Seed for the weight initialisation
    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    /// Write the checkpoint every N epochs (always at the last one)
    #[arg(long, default_value_t = 1)]
    pub checkpoint_every: usize,

    /// Also append per-epoch metrics to this CSV file
    #[arg(long)]
    pub metrics_csv: Option<PathBuf>,

    /// Continue from SAVE_TO if it exists
    #[arg(long)]
    pub resume: bool,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            save_to:          a.save_to,
            num_epochs:       a.num_epochs,
            hidden_width:     a.hidden_width,
            learning_rate:    a.learning_rate,
            batch_size:       a.batch_size,
            eval_batch_size:  a.eval_batch_size,
            seed:             a.seed,
            checkpoint_every: a.checkpoint_every,
            metrics_csv:      a.metrics_csv,
            resume:           a.resume,
            ..TrainConfig::default()
        }
    }
}
