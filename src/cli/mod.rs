// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and hands a TrainConfig to the
// application layer. Nothing here touches tensors.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::TrainArgs;

use crate::application::train_use_case::TrainUseCase;

/// Train an MLP on MNIST, printing test error after every epoch.
#[derive(Parser, Debug)]
#[command(
    name = "mnist-mlp",
    version,
    about = "Train a multilayer perceptron on MNIST with steepest descent."
)]
pub struct Cli {
    #[command(flatten)]
    pub train: TrainArgs,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        tracing::info!(
            "Training for {} epochs, checkpoint at '{}'",
            self.train.num_epochs,
            self.train.save_to.display()
        );

        let use_case = TrainUseCase::new(self.train.into());
        let state = use_case.execute()?;

        println!(
            "Training complete: {} epochs, {} iterations.",
            state.epochs_done, state.iterations_done
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;
    use std::path::PathBuf;

    #[test]
    fn defaults_match_the_classic_script() {
        let cli = Cli::try_parse_from(["mnist-mlp"]).unwrap();
        let cfg: TrainConfig = cli.train.into();
        assert_eq!(cfg, TrainConfig::default());
    }

    #[test]
    fn positional_save_to_and_flags() {
        let cli = Cli::try_parse_from([
            "mnist-mlp",
            "out/model.pkl",
            "--num-epochs",
            "5",
            "--learning-rate",
            "0.05",
            "--metrics-csv",
            "out/metrics.csv",
            "--resume",
        ])
        .unwrap();

        let cfg: TrainConfig = cli.train.into();
        assert_eq!(cfg.save_to, PathBuf::from("out/model.pkl"));
        assert_eq!(cfg.num_epochs, 5);
        assert_eq!(cfg.learning_rate, 0.05);
        assert_eq!(cfg.metrics_csv, Some(PathBuf::from("out/metrics.csv")));
        assert!(cfg.resume);
        assert_eq!(cfg.batch_size, 50);
    }

    #[test]
    fn non_numeric_epochs_are_refused() {
        assert!(Cli::try_parse_from(["mnist-mlp", "--num-epochs", "two"]).is_err());
    }
}
