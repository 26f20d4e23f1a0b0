// ============================================================
// Layer 5 - Main Loop Extensions
// ============================================================
// Objects the main loop calls at its boundaries, in the order
// they were registered:
//
//   before_training - once, before the first termination check
//   on_epoch_end    - after every completed epoch
//   after_training  - once, after the loop ends
//
// Each hook sees the model, the training state and the device,
// and may ask the loop to finish by returning LoopSignal::Finish.
// All extensions still run for the epoch in which finish was
// requested; the loop stops at the next termination check.
//
// Provided extensions:
//   FinishAfter          - stop after N epochs
//   DataStreamMonitoring - cost / error rate on another stream
//   Checkpointing        - write model + state to disk
//   MetricsLogging       - append epoch records to a CSV file
//   Printing             - one summary line per epoch on stdout

use burn::{
    data::dataloader::batcher::Batcher,
    data::dataset::Dataset,
    module::AutodiffModule,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{DigitBatch, DigitBatcher},
    stream::DataStream,
};
use crate::domain::{
    error::{Result, TrainError},
    sample::DigitSample,
    state::{EpochRecord, TrainingState},
};
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
use crate::ml::model::Mlp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopSignal {
    Continue,
    Finish,
}

/// What an extension may look at (and mutate) at a loop boundary.
pub struct LoopContext<'a, B: AutodiffBackend> {
    pub model:  &'a Mlp<B>,
    pub state:  &'a mut TrainingState,
    pub device: &'a B::Device,
}

pub trait Extension<B: AutodiffBackend> {
    fn name(&self) -> &str;

    fn before_training(&mut self, _ctx: &mut LoopContext<'_, B>) -> Result<LoopSignal> {
        Ok(LoopSignal::Continue)
    }

    fn on_epoch_end(&mut self, ctx: &mut LoopContext<'_, B>) -> Result<LoopSignal>;

    fn after_training(&mut self, _ctx: &mut LoopContext<'_, B>) -> Result<()> {
        Ok(())
    }
}

// ─── FinishAfter ──────────────────────────────────────────────────────────────

/// The only termination condition: `epochs_done >= after_n_epochs`.
///
/// Checked before training as well, so a bound of 0 (or a resumed run
/// that already reached it) trains nothing.
#[derive(Debug, Clone, Copy)]
pub struct FinishAfter {
    after_n_epochs: usize,
}

impl FinishAfter {
    pub fn new(after_n_epochs: usize) -> Self {
        Self { after_n_epochs }
    }

    fn check(&self, state: &TrainingState) -> LoopSignal {
        if state.epochs_done >= self.after_n_epochs {
            LoopSignal::Finish
        } else {
            LoopSignal::Continue
        }
    }
}

impl<B: AutodiffBackend> Extension<B> for FinishAfter {
    fn name(&self) -> &str {
        "finish_after"
    }

    fn before_training(&mut self, ctx: &mut LoopContext<'_, B>) -> Result<LoopSignal> {
        Ok(self.check(ctx.state))
    }

    fn on_epoch_end(&mut self, ctx: &mut LoopContext<'_, B>) -> Result<LoopSignal> {
        Ok(self.check(ctx.state))
    }
}

// ─── DataStreamMonitoring ─────────────────────────────────────────────────────

/// Evaluates `{prefix}_cost` and `{prefix}_error_rate` over a whole stream.
///
/// Runs on `model.valid()`, the inner backend without autodiff, and weights
/// every batch by its row count so a short final batch counts for what it is.
pub struct DataStreamMonitoring<D> {
    stream:             DataStream<D>,
    prefix:             String,
    before_first_epoch: bool,
}

impl<D: Dataset<DigitSample>> DataStreamMonitoring<D> {
    pub fn new(stream: DataStream<D>, prefix: impl Into<String>) -> Self {
        Self {
            stream,
            prefix:             prefix.into(),
            before_first_epoch: false,
        }
    }

    /// Also evaluate once before any training happens.
    pub fn before_first_epoch(mut self, enabled: bool) -> Self {
        self.before_first_epoch = enabled;
        self
    }

    fn evaluate<B: AutodiffBackend>(&self, ctx: &mut LoopContext<'_, B>) -> Result<()> {
        let model = ctx.model.valid();

        let mut cost_sum = 0.0f64;
        let mut errors   = 0usize;
        let mut seen     = 0usize;

        for samples in self.stream.epoch() {
            let batch: DigitBatch<B::InnerBackend> =
                <DigitBatcher as Batcher<B::InnerBackend, _, _>>::batch(&DigitBatcher, samples?, ctx.device);
            let rows = batch.rows();

            let output = model.forward_classification(batch.features, batch.targets);
            let cost = output.cost_value();
            if !cost.is_finite() {
                return Err(TrainError::computation(format!(
                    "non-finite {}_cost ({cost}) after {} rows",
                    self.prefix, seen
                )));
            }

            cost_sum += cost * rows as f64;
            errors   += output.misclassified();
            seen     += rows;
        }

        if seen == 0 {
            tracing::warn!("'{}' stream is empty, nothing to monitor", self.prefix);
            return Ok(());
        }

        let cost       = cost_sum / seen as f64;
        let error_rate = errors as f64 / seen as f64;
        ctx.state.record_metric(&format!("{}_cost", self.prefix), cost);
        let improved = ctx
            .state
            .record_metric(&format!("{}_error_rate", self.prefix), error_rate);

        tracing::info!(
            "{} after {} epochs: cost={:.4} error_rate={:.4}{}",
            self.prefix,
            ctx.state.epochs_done,
            cost,
            error_rate,
            if improved { " (best so far)" } else { "" },
        );
        Ok(())
    }
}

impl<B, D> Extension<B> for DataStreamMonitoring<D>
where
    B: AutodiffBackend,
    D: Dataset<DigitSample>,
{
    fn name(&self) -> &str {
        "data_stream_monitoring"
    }

    fn before_training(&mut self, ctx: &mut LoopContext<'_, B>) -> Result<LoopSignal> {
        if self.before_first_epoch {
            self.evaluate(ctx)?;
        }
        Ok(LoopSignal::Continue)
    }

    fn on_epoch_end(&mut self, ctx: &mut LoopContext<'_, B>) -> Result<LoopSignal> {
        self.evaluate(ctx)?;
        Ok(LoopSignal::Continue)
    }
}

// ─── Checkpointing ────────────────────────────────────────────────────────────

/// Saves model + state every `every_n_epochs` epochs, and at the epoch in
/// which finish was requested so the last state is always on disk.
/// Register it after `FinishAfter`.
pub struct Checkpointing {
    manager:        CheckpointManager,
    config:         TrainConfig,
    every_n_epochs: usize,
}

impl Checkpointing {
    pub fn new(manager: CheckpointManager, config: TrainConfig, every_n_epochs: usize) -> Result<Self> {
        if every_n_epochs == 0 {
            return Err(TrainError::invalid_config("checkpoint cadence must be >= 1 epoch"));
        }
        Ok(Self { manager, config, every_n_epochs })
    }
}

impl<B: AutodiffBackend> Extension<B> for Checkpointing {
    fn name(&self) -> &str {
        "checkpointing"
    }

    fn on_epoch_end(&mut self, ctx: &mut LoopContext<'_, B>) -> Result<LoopSignal> {
        let due = ctx.state.epochs_done % self.every_n_epochs == 0;
        if due || ctx.state.finish_requested {
            self.manager.save(ctx.model, ctx.state, &self.config)?;
            tracing::info!(
                "Checkpoint saved for epoch {} to '{}'",
                ctx.state.epochs_done,
                self.manager.path().display()
            );
        }
        Ok(LoopSignal::Continue)
    }
}

// ─── MetricsLogging ───────────────────────────────────────────────────────────

pub struct MetricsLogging {
    logger: MetricsLogger,
}

impl MetricsLogging {
    pub fn new(logger: MetricsLogger) -> Self {
        Self { logger }
    }
}

impl<B: AutodiffBackend> Extension<B> for MetricsLogging {
    fn name(&self) -> &str {
        "metrics_logging"
    }

    /// Logs the record measured before training, if any. A resumed run
    /// already has its current record on file.
    fn before_training(&mut self, ctx: &mut LoopContext<'_, B>) -> Result<LoopSignal> {
        if ctx.state.epochs_done == 0 {
            self.on_epoch_end(ctx)?;
        }
        Ok(LoopSignal::Continue)
    }

    fn on_epoch_end(&mut self, ctx: &mut LoopContext<'_, B>) -> Result<LoopSignal> {
        if let Some(record) = ctx.state.current_record() {
            self.logger.log(record)?;
        }
        Ok(LoopSignal::Continue)
    }
}

// ─── Printing ─────────────────────────────────────────────────────────────────

pub struct Printing {
    num_epochs: usize,
}

impl Printing {
    pub fn new(num_epochs: usize) -> Self {
        Self { num_epochs }
    }

    fn summary(&self, record: &EpochRecord) -> String {
        let mut line = format!(
            "Epoch {:>3}/{} | iterations={}",
            record.epoch, self.num_epochs, record.iterations_done
        );
        if let Some(cost) = record.train_cost {
            line.push_str(&format!(" | train_cost={cost:.4}"));
        }
        for (name, value) in &record.metrics {
            line.push_str(&format!(" | {name}={value:.4}"));
        }
        line
    }
}

impl<B: AutodiffBackend> Extension<B> for Printing {
    fn name(&self) -> &str {
        "printing"
    }

    fn before_training(&mut self, ctx: &mut LoopContext<'_, B>) -> Result<LoopSignal> {
        if let Some(record) = ctx.state.current_record() {
            println!("{}", self.summary(record));
        }
        Ok(LoopSignal::Continue)
    }

    fn on_epoch_end(&mut self, ctx: &mut LoopContext<'_, B>) -> Result<LoopSignal> {
        let line = match ctx.state.current_record() {
            Some(record) => self.summary(record),
            None => format!(
                "Epoch {:>3}/{} | iterations={}",
                ctx.state.epochs_done, self.num_epochs, ctx.state.iterations_done
            ),
        };
        println!("{line}");
        tracing::debug!("{line}");
        Ok(LoopSignal::Continue)
    }
}
