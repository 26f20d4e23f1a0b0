// ============================================================
// Layer 3 - Training State
// ============================================================
// Everything the main loop knows about its own progress.
// It is owned by the loop, handed mutably to extensions at
// epoch boundaries, and serialised into every checkpoint so a
// run can be resumed where it stopped.
//
// The log holds one record per epoch. Record 0 exists only
// when an extension measured something before training began.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Where the main loop is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LoopStatus {
    /// Built but `run()` not called yet
    #[default]
    Init,
    /// Inside the epoch loop
    Running,
    /// The termination check fired and `after_training` ran
    Terminated,
}

/// Metrics gathered for one epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochRecord {
    /// Epochs completed when this record was written (0 = before training)
    pub epoch: usize,

    /// Update steps completed when this record was written
    pub iterations_done: usize,

    /// Mean cross-entropy over the epoch's training batches
    pub train_cost: Option<f64>,

    /// Monitored values keyed by name, e.g. `test_error_rate`
    pub metrics: BTreeMap<String, f64>,
}

impl EpochRecord {
    fn new(epoch: usize, iterations_done: usize) -> Self {
        Self {
            epoch,
            iterations_done,
            train_cost: None,
            metrics:    BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TrainingState {
    pub epochs_done:     usize,
    pub iterations_done: usize,
    pub status:          LoopStatus,

    /// Set by a termination extension; checked before every epoch.
    /// Not persisted: a resumed run decides afresh.
    #[serde(skip)]
    pub finish_requested: bool,

    /// Lowest value seen so far for every monitored metric
    pub best: BTreeMap<String, f64>,

    pub log: Vec<EpochRecord>,
}

impl TrainingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record for the current `epochs_done`, created on first access.
    pub fn current_record_mut(&mut self) -> &mut EpochRecord {
        let (epoch, iterations_done) = (self.epochs_done, self.iterations_done);
        if self.log.last().map_or(true, |r| r.epoch != epoch) {
            self.log.push(EpochRecord::new(epoch, iterations_done));
        }
        let last = self.log.len() - 1;
        let record = &mut self.log[last];
        record.iterations_done = iterations_done;
        record
    }

    pub fn current_record(&self) -> Option<&EpochRecord> {
        self.log.last().filter(|r| r.epoch == self.epochs_done)
    }

    pub fn record_train_cost(&mut self, cost: f64) {
        self.current_record_mut().train_cost = Some(cost);
    }

    /// Stores a metric in the current record and updates the best value.
    ///
    /// Returns true if this is a new best (lower is better).
    pub fn record_metric(&mut self, name: &str, value: f64) -> bool {
        self.current_record_mut()
            .metrics
            .insert(name.to_string(), value);

        let improved = self.best.get(name).map_or(true, |best| value < *best);
        if improved {
            self.best.insert(name.to_string(), value);
        }
        improved
    }

    /// Marks a completed epoch.
    pub fn finish_epoch(&mut self) {
        self.epochs_done += 1;
    }

    pub fn request_finish(&mut self) {
        self.finish_requested = true;
    }
}
