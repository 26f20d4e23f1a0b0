// ============================================================
// Layer 2 - TrainUseCase
// ============================================================
// Orchestrates one training run in order:
//
//   Step 1: Validate the configuration
//   Step 2: Open MNIST train / test splits  (Layer 4 - data)
//   Step 3: Build the MLP, or restore it     (Layer 5 / 6)
//   Step 4: Build the step rule              (Layer 5 - ml)
//   Step 5: Register extensions              (Layer 5 - ml)
//             FinishAfter → DataStreamMonitoring("test")
//             → Checkpointing → MetricsLogging → Printing
//   Step 6: Run the main loop                (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::{data::dataset::Dataset, module::Module, tensor::backend::AutodiffBackend};
use serde::{Deserialize, Serialize};

use crate::data::{
    dataset::{mnist, Split},
    stream::DataStream,
};
use crate::domain::{
    error::{self, TrainError},
    sample::{DigitSample, MNIST_CLASSES, MNIST_PIXELS},
    state::TrainingState,
};
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
use crate::ml::{
    extensions::{Checkpointing, DataStreamMonitoring, FinishAfter, MetricsLogging, Printing},
    main_loop::MainLoop,
    model::{Activation, Mlp, MlpConfig},
    optimizer::steepest_descent,
    TrainBackend,
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All settings of a run. Serialisable so every checkpoint carries a
// snapshot of the configuration that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Checkpoint destination, written exactly as given
    pub save_to:          PathBuf,
    pub num_epochs:       usize,
    pub input_width:      usize,
    pub hidden_width:     usize,
    pub num_classes:      usize,
    pub weights_std:      f64,
    pub biases_init:      f64,
    pub learning_rate:    f64,
    pub batch_size:       usize,
    pub eval_batch_size:  usize,
    /// Seeds the weight initialisation
    pub seed:             u64,
    pub checkpoint_every: usize,
    pub metrics_csv:      Option<PathBuf>,
    /// Continue from `save_to` when it exists
    pub resume:           bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            save_to:          PathBuf::from("mnist.pkl"),
            num_epochs:       2,
            input_width:      MNIST_PIXELS,
            hidden_width:     100,
            num_classes:      MNIST_CLASSES,
            weights_std:      0.01,
            biases_init:      0.0,
            learning_rate:    0.1,
            batch_size:       50,
            eval_batch_size:  500,
            seed:             1,
            checkpoint_every: 1,
            metrics_csv:      None,
            resume:           false,
        }
    }
}

impl TrainConfig {
    /// Rejects settings that would fail only after data is loaded.
    pub fn validate(&self) -> error::Result<()> {
        if self.save_to.as_os_str().is_empty() {
            return Err(TrainError::invalid_config("save_to must not be empty"));
        }
        // both paths end up in the JSON snapshot stored in every checkpoint
        for path in std::iter::once(&self.save_to).chain(&self.metrics_csv) {
            if path.to_str().is_none() {
                return Err(TrainError::invalid_config(format!(
                    "path {} is not valid UTF-8",
                    path.display()
                )));
            }
        }
        if self.batch_size == 0 || self.eval_batch_size == 0 {
            return Err(TrainError::invalid_config(format!(
                "batch sizes must be >= 1, got train={} eval={}",
                self.batch_size, self.eval_batch_size
            )));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(TrainError::invalid_config(format!(
                "learning rate must be > 0, got {}",
                self.learning_rate
            )));
        }
        if self.checkpoint_every == 0 {
            return Err(TrainError::invalid_config("checkpoint cadence must be >= 1 epoch"));
        }
        self.model_config().validate()
    }

    /// input → hidden (tanh) → classes (softmax)
    pub fn model_config(&self) -> MlpConfig {
        MlpConfig::new(
            vec![self.input_width, self.hidden_width, self.num_classes],
            vec![Activation::Tanh, Activation::Softmax],
        )
        .with_weights_std(self.weights_std)
        .with_biases_init(self.biases_init)
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Trains on MNIST with the default backend.
    pub fn execute(&self) -> Result<TrainingState> {
        self.config.validate()?;

        let device = <TrainBackend as burn::tensor::backend::Backend>::Device::default();
        tracing::info!("Using device: {:?}", device);

        let train = mnist(Split::Train);
        let test  = mnist(Split::Test);
        self.train_on::<TrainBackend, _, _>(train, test, &device)
    }

    /// Runs the full loop on any pair of datasets.
    pub fn train_on<B, DT, DE>(
        &self,
        train:  DT,
        test:   DE,
        device: &B::Device,
    ) -> Result<TrainingState>
    where
        B: AutodiffBackend,
        DT: Dataset<DigitSample>,
        DE: Dataset<DigitSample> + 'static,
    {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Model, fresh or restored ──────────────────────────────────────────
        let model_cfg = cfg.model_config();
        let template  = model_cfg.init::<B>(cfg.seed, device)?;
        tracing::info!(
            "Model ready: widths={:?}, weights ~ N(0, {}²), seed={}",
            model_cfg.widths,
            cfg.weights_std,
            cfg.seed
        );

        let restore = CheckpointManager::new(&cfg.save_to);
        let (model, state) = if cfg.resume && restore.exists() {
            let loaded = restore
                .load(template, device)
                .with_context(|| format!("Cannot resume from '{}'", cfg.save_to.display()))?;
            if loaded.config.learning_rate != cfg.learning_rate
                || loaded.config.batch_size != cfg.batch_size
            {
                tracing::warn!(
                    "Resuming with lr={} batch_size={}, the checkpoint was trained with lr={} batch_size={}",
                    cfg.learning_rate,
                    cfg.batch_size,
                    loaded.config.learning_rate,
                    loaded.config.batch_size
                );
            }
            (loaded.model, loaded.state)
        } else {
            if cfg.resume {
                tracing::warn!(
                    "No checkpoint at '{}', starting from scratch",
                    cfg.save_to.display()
                );
            }
            (template, TrainingState::new())
        };
        let fresh = state.epochs_done == 0;

        // ── Data streams, shaped like the model ───────────────────────────────
        let train_stream = DataStream::sequential(train, cfg.batch_size)?
            .with_shape(model.input_width(), model.num_classes());
        let test_stream = DataStream::sequential(test, cfg.eval_batch_size)?
            .with_shape(model.input_width(), model.num_classes());

        // ── Step rule ─────────────────────────────────────────────────────────
        let algorithm = steepest_descent::<B, Mlp<B>>(cfg.learning_rate)?;

        // ── Extensions, in call order ─────────────────────────────────────────
        let monitor = DataStreamMonitoring::new(test_stream, "test").before_first_epoch(fresh);
        let checkpointing = Checkpointing::new(
            CheckpointManager::new(&cfg.save_to),
            cfg.clone(),
            cfg.checkpoint_every,
        )?;

        let mut main_loop = MainLoop::new(model, train_stream, algorithm, device.clone())
            .with_state(state)
            .with_extension(FinishAfter::new(cfg.num_epochs))
            .with_extension(monitor)
            .with_extension(checkpointing);

        if let Some(csv) = &cfg.metrics_csv {
            let logger = MetricsLogger::new(csv)
                .with_context(|| format!("Cannot open metrics file '{}'", csv.display()))?;
            tracing::info!("Appending epoch metrics to '{}'", logger.csv_path().display());
            main_loop = main_loop.with_extension(MetricsLogging::new(logger));
        }

        let outcome = main_loop
            .with_extension(Printing::new(cfg.num_epochs))
            .run()?;

        tracing::info!(
            "Trained a {} parameter network for {} epochs",
            outcome.model.num_params(),
            outcome.state.epochs_done
        );
        Ok(outcome.state)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::DigitDataset;
    use crate::domain::state::LoopStatus;
    use burn::backend::{Autodiff, NdArray};
    use std::path::Path;

    type TestBackend = Autodiff<NdArray>;

    fn separable(n: usize) -> DigitDataset {
        DigitDataset::new(
            (0..n)
                .map(|i| {
                    let label = i % 2;
                    let x = if label == 0 { -1.0 } else { 1.0 };
                    DigitSample::new(vec![x, 0.5], label)
                })
                .collect(),
        )
    }

    fn small_config(dir: &Path) -> TrainConfig {
        TrainConfig {
            save_to:         dir.join("run.pkl"),
            input_width:     2,
            hidden_width:    4,
            num_classes:     2,
            weights_std:     0.1,
            batch_size:      10,
            eval_batch_size: 20,
            ..TrainConfig::default()
        }
    }

    fn train(config: TrainConfig) -> Result<TrainingState> {
        TrainUseCase::new(config).train_on::<TestBackend, _, _>(
            separable(45),
            separable(20),
            &Default::default(),
        )
    }

    #[test]
    fn defaults_follow_the_reference_run() {
        let cfg = TrainConfig::default();
        assert_eq!(cfg.save_to, PathBuf::from("mnist.pkl"));
        assert_eq!(cfg.num_epochs, 2);
        assert_eq!(cfg.model_config().widths, vec![784, 100, 10]);
        assert_eq!((cfg.batch_size, cfg.eval_batch_size), (50, 500));
        assert_eq!(cfg.learning_rate, 0.1);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let bad = [
            TrainConfig { batch_size: 0, ..TrainConfig::default() },
            TrainConfig { learning_rate: 0.0, ..TrainConfig::default() },
            TrainConfig { hidden_width: 0, ..TrainConfig::default() },
            TrainConfig { checkpoint_every: 0, ..TrainConfig::default() },
            TrainConfig { save_to: PathBuf::new(), ..TrainConfig::default() },
        ];
        for cfg in bad {
            assert!(matches!(cfg.validate(), Err(TrainError::InvalidConfig(_))), "{cfg:?}");
        }
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_paths_are_rejected_before_training() {
        use std::{ffi::OsStr, os::unix::ffi::OsStrExt};

        let odd = PathBuf::from(OsStr::from_bytes(b"ck\xff.pkl"));
        let bad_save = TrainConfig { save_to: odd.clone(), ..TrainConfig::default() };
        let bad_csv = TrainConfig { metrics_csv: Some(odd), ..TrainConfig::default() };

        for cfg in [bad_save, bad_csv] {
            assert!(matches!(cfg.validate(), Err(TrainError::InvalidConfig(_))), "{cfg:?}");
        }

        // train_on stops before the first epoch
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            save_to: dir.path().join(OsStr::from_bytes(b"ck\xff.pkl")),
            ..small_config(dir.path())
        };
        let err = train(cfg).unwrap_err();
        assert!(matches!(err.downcast_ref::<TrainError>(), Some(TrainError::InvalidConfig(_))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn full_run_writes_checkpoint_and_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("metrics.csv");
        let cfg = TrainConfig {
            metrics_csv: Some(csv.clone()),
            ..small_config(dir.path())
        };

        let state = train(cfg.clone()).unwrap();

        // 45 rows in batches of 10 → 5 updates per epoch
        assert_eq!(state.epochs_done, 2);
        assert_eq!(state.iterations_done, 10);
        assert_eq!(state.status, LoopStatus::Terminated);
        assert!(cfg.save_to.is_file());

        let text = std::fs::read_to_string(&csv).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "epoch,iterations_done,train_cost,test_cost,test_error_rate");
        assert!(lines[1].starts_with("0,0,,"));
        assert!(lines[3].starts_with("2,10,"));
    }

    #[test]
    fn zero_epochs_leaves_no_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig { num_epochs: 0, ..small_config(dir.path()) };

        let state = train(cfg.clone()).unwrap();
        assert_eq!(state.iterations_done, 0);
        assert_eq!(state.epochs_done, 0);
        assert!(!cfg.save_to.exists());
    }

    #[test]
    fn resume_continues_from_the_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        train(small_config(dir.path())).unwrap();

        let resumed = TrainConfig {
            num_epochs: 3,
            resume:     true,
            ..small_config(dir.path())
        };
        let state = train(resumed).unwrap();
        assert_eq!(state.epochs_done, 3);
        assert_eq!(state.iterations_done, 15);
        // epochs 0..=3, the first measured before training
        assert_eq!(state.log.len(), 4);
    }

    #[test]
    fn resume_with_another_architecture_fails() {
        let dir = tempfile::tempdir().unwrap();
        train(small_config(dir.path())).unwrap();

        let wider = TrainConfig {
            hidden_width: 8,
            resume:       true,
            ..small_config(dir.path())
        };
        let err = train(wider).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TrainError>(),
            Some(TrainError::Checkpoint(_))
        ));
    }
}
