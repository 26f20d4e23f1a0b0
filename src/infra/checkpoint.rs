// ============================================================
// Layer 6 - Checkpoint Manager
// ============================================================
// Saves and restores a training run as ONE file at `save_to`.
//
// What goes into a checkpoint:
//   1. model   - every Dense weight and bias (MlpRecord)
//   2. state   - TrainingState as JSON (epochs, iterations,
//                per-epoch log, best values)
//   3. config  - TrainConfig as JSON, so a resumed run can
//                check it rebuilds the same architecture
//
// Encoding: Burn's NamedMpkBytesRecorder at full precision.
// The bytes are produced in memory, written to a sibling
// `<save_to>.tmp` and renamed over `save_to`, so a crash
// mid-write never leaves a truncated checkpoint behind.
// Same model + state + config → same bytes.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkBytesRecorder, Record, Recorder},
};

use crate::application::train_use_case::TrainConfig;
use crate::domain::{
    error::{Result, TrainError},
    state::TrainingState,
};
use crate::ml::model::{Mlp, MlpRecord};

/// On-disk layout of a checkpoint.
#[derive(Record)]
pub struct MainLoopRecord<B: Backend> {
    pub model:  MlpRecord<B>,
    pub state:  String,
    pub config: String,
}

/// A decoded checkpoint with its weights already loaded into a model.
#[derive(Debug)]
pub struct LoadedCheckpoint<B: Backend> {
    pub model:  Mlp<B>,
    pub state:  TrainingState,
    pub config: TrainConfig,
}

type CheckpointRecorder = NamedMpkBytesRecorder<FullPrecisionSettings>;

pub struct CheckpointManager {
    /// Exactly the file the user asked for; no extension is added.
    path: PathBuf,
}

impl CheckpointManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Encodes model, state and config and atomically replaces `path`.
    pub fn save<B: Backend>(
        &self,
        model:  &Mlp<B>,
        state:  &TrainingState,
        config: &TrainConfig,
    ) -> Result<()> {
        let record = MainLoopRecord::<B> {
            model:  model.clone().into_record(),
            state:  serde_json::to_string(state)?,
            config: serde_json::to_string(config)?,
        };
        let bytes = Recorder::<B>::record(&CheckpointRecorder::new(), record, ())
            .map_err(|e| TrainError::checkpoint(format!("cannot encode checkpoint: {e}")))?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.tmp_path();
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, &self.path)?;

        tracing::debug!(
            "Wrote {} bytes to '{}' (epochs_done={})",
            bytes.len(),
            self.path.display(),
            state.epochs_done
        );
        Ok(())
    }

    /// Reads `path` and loads its weights into `template`.
    ///
    /// `template` must have the architecture the checkpoint was trained
    /// with; a mismatch is reported before any weight is touched.
    pub fn load<B: Backend>(
        &self,
        template: Mlp<B>,
        device:   &B::Device,
    ) -> Result<LoadedCheckpoint<B>> {
        let bytes = fs::read(&self.path).map_err(|e| {
            TrainError::checkpoint(format!("cannot read '{}': {e}", self.path.display()))
        })?;
        let record: MainLoopRecord<B> =
            Recorder::<B>::load(&CheckpointRecorder::new(), bytes, device).map_err(|e| {
                TrainError::checkpoint(format!("cannot decode '{}': {e}", self.path.display()))
            })?;

        let state: TrainingState = serde_json::from_str(&record.state)?;
        let config: TrainConfig  = serde_json::from_str(&record.config)?;

        let stored = config.model_config();
        if stored.widths != template.widths() || stored.activations != template.activations() {
            return Err(TrainError::checkpoint(format!(
                "'{}' holds a {:?} network, this run builds {:?}",
                self.path.display(),
                stored.widths,
                template.widths()
            )));
        }

        tracing::info!(
            "Loaded checkpoint '{}' at epoch {} ({} iterations)",
            self.path.display(),
            state.epochs_done,
            state.iterations_done
        );
        Ok(LoadedCheckpoint {
            model: template.load_record(record.model),
            state,
            config,
        })
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::{Activation, MlpConfig};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn config() -> TrainConfig {
        TrainConfig {
            hidden_width: 3,
            ..TrainConfig::default()
        }
    }

    fn model(seed: u64) -> Mlp<TestBackend> {
        config()
            .model_config()
            .init(seed, &Default::default())
            .unwrap()
    }

    fn state() -> TrainingState {
        let mut state = TrainingState::new();
        state.iterations_done = 1000;
        state.finish_epoch();
        state.record_train_cost(0.42);
        state.record_metric("test_error_rate", 0.1);
        state
    }

    #[test]
    fn save_writes_exactly_the_requested_path() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path().join("mnist.pkl"));
        manager.save(&model(1), &state(), &config()).unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["mnist.pkl"]);
        assert!(manager.exists());
    }

    #[test]
    fn identical_inputs_give_identical_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path().join("run.pkl"));
        let (model, state, config) = (model(1), state(), config());

        manager.save(&model, &state, &config).unwrap();
        let first = fs::read(manager.path()).unwrap();
        manager.save(&model, &state, &config).unwrap();
        let second = fs::read(manager.path()).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn load_restores_state_config_and_weights() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path().join("nested/run.pkl"));
        let device = Default::default();
        let saved = model(1);
        manager.save(&saved, &state(), &config()).unwrap();

        let loaded = manager.load(model(2), &device).unwrap();
        assert_eq!(loaded.state, state());
        assert_eq!(loaded.config, config());

        let x = Tensor::<TestBackend, 2>::ones([1, 784], &device);
        let expected: Vec<f32> = saved.forward(x.clone()).into_data().to_vec().unwrap();
        let actual: Vec<f32> = loaded.model.forward(x).into_data().to_vec().unwrap();
        assert_eq!(expected, actual);
    }

    #[test]
    fn missing_file_is_a_checkpoint_error() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path().join("absent.pkl"));
        let result = manager.load(model(1), &Default::default());
        assert!(matches!(result, Err(TrainError::Checkpoint(_))));
    }

    #[test]
    fn architecture_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path().join("run.pkl"));
        manager.save(&model(1), &state(), &config()).unwrap();

        let wider: Mlp<TestBackend> =
            MlpConfig::new(vec![784, 5, 10], vec![Activation::Tanh, Activation::Softmax])
                .init(1, &Default::default())
                .unwrap();
        let err = manager.load(wider, &Default::default()).unwrap_err();
        assert!(err.to_string().contains("[784, 3, 10]"));
    }
}
