// ============================================================
// Layer 5 - Main Loop
// ============================================================
// Drives training as a small state machine:
//
//   Init ──run()──▶ Running
//     before_training hooks
//     loop {
//       finish requested? ──yes──▶ break
//       for batch in training stream:
//           forward → cost → backward → update
//       epochs_done += 1
//       on_epoch_end hooks (in registration order)
//     }
//     after_training hooks
//   ──▶ Terminated
//
// Single-threaded: batch N+1 is fetched only after batch N's
// update is applied. Any error aborts the run immediately.

use burn::{
    data::dataloader::batcher::Batcher,
    data::dataset::Dataset,
    optim::Optimizer,
    tensor::backend::AutodiffBackend,
};

use crate::data::{
    batcher::{DigitBatch, DigitBatcher},
    stream::DataStream,
};
use crate::domain::{
    error::{Result, TrainError},
    sample::DigitSample,
    state::{LoopStatus, TrainingState},
};
use crate::ml::extensions::{Extension, LoopContext, LoopSignal};
use crate::ml::model::Mlp;
use crate::ml::optimizer::SteepestDescent;

/// What a finished run hands back.
pub struct LoopOutcome<B: AutodiffBackend> {
    pub model: Mlp<B>,
    pub state: TrainingState,
}

pub struct MainLoop<B: AutodiffBackend, O, D> {
    model:       Mlp<B>,
    data_stream: DataStream<D>,
    algorithm:   SteepestDescent<O>,
    extensions:  Vec<Box<dyn Extension<B>>>,
    state:       TrainingState,
    device:      B::Device,
}

impl<B, O, D> MainLoop<B, O, D>
where
    B: AutodiffBackend,
    O: Optimizer<Mlp<B>, B>,
    D: Dataset<DigitSample>,
{
    pub fn new(
        model:       Mlp<B>,
        data_stream: DataStream<D>,
        algorithm:   SteepestDescent<O>,
        device:      B::Device,
    ) -> Self {
        Self {
            model,
            data_stream,
            algorithm,
            extensions: Vec::new(),
            state:      TrainingState::new(),
            device,
        }
    }

    /// Appends an extension; hooks run in the order extensions were added.
    pub fn with_extension(mut self, extension: impl Extension<B> + 'static) -> Self {
        self.extensions.push(Box::new(extension));
        self
    }

    /// Starts from a restored state instead of a fresh one.
    pub fn with_state(mut self, state: TrainingState) -> Self {
        self.state = state;
        self
    }

    pub fn run(self) -> Result<LoopOutcome<B>> {
        let MainLoop {
            mut model,
            data_stream,
            mut algorithm,
            mut extensions,
            mut state,
            device,
        } = self;

        state.finish_requested = false;
        state.status = LoopStatus::Running;
        tracing::info!(
            "Entered the main loop: {} examples in {} batches of up to {}, lr={}, {} extensions",
            data_stream.num_examples(),
            data_stream.num_batches(),
            data_stream.batch_size(),
            algorithm.learning_rate(),
            extensions.len(),
        );

        {
            let mut ctx = LoopContext { model: &model, state: &mut state, device: &device };
            for extension in extensions.iter_mut() {
                if extension.before_training(&mut ctx)? == LoopSignal::Finish {
                    tracing::debug!("'{}' requested finish before training", extension.name());
                    ctx.state.request_finish();
                }
            }
        }

        // termination check precedes every epoch
        while !state.finish_requested {
            model = train_epoch(model, &data_stream, &mut algorithm, &mut state, &device)?;

            let mut ctx = LoopContext { model: &model, state: &mut state, device: &device };
            for extension in extensions.iter_mut() {
                if extension.on_epoch_end(&mut ctx)? == LoopSignal::Finish {
                    tracing::debug!(
                        "'{}' requested finish after epoch {}",
                        extension.name(),
                        ctx.state.epochs_done
                    );
                    ctx.state.request_finish();
                }
            }
        }

        {
            let mut ctx = LoopContext { model: &model, state: &mut state, device: &device };
            for extension in extensions.iter_mut() {
                extension.after_training(&mut ctx)?;
            }
        }

        state.status = LoopStatus::Terminated;
        tracing::info!(
            "Training finished after {} epochs, {} iterations",
            state.epochs_done,
            state.iterations_done
        );
        Ok(LoopOutcome { model, state })
    }
}

/// One full pass over the training stream; one update per batch.
fn train_epoch<B, O, D>(
    mut model: Mlp<B>,
    stream:    &DataStream<D>,
    algorithm: &mut SteepestDescent<O>,
    state:     &mut TrainingState,
    device:    &B::Device,
) -> Result<Mlp<B>>
where
    B: AutodiffBackend,
    O: Optimizer<Mlp<B>, B>,
    D: Dataset<DigitSample>,
{
    let mut cost_sum = 0.0f64;
    let mut seen     = 0usize;
    let mut batches  = 0usize;

    for samples in stream.epoch() {
        let batch: DigitBatch<B> =
            <DigitBatcher as Batcher<B, _, _>>::batch(&DigitBatcher, samples?, device);
        let rows = batch.rows();

        let output = model.forward_classification(batch.features, batch.targets);
        let cost = output.cost_value();
        if !cost.is_finite() {
            return Err(TrainError::computation(format!(
                "non-finite cost ({cost}) at iteration {}",
                state.iterations_done + 1
            )));
        }

        model = algorithm.step(output.cost, model);
        state.iterations_done += 1;
        // a short final batch counts by its rows, not as a full batch
        cost_sum += cost * rows as f64;
        seen     += rows;
        batches  += 1;
    }

    state.finish_epoch();
    if seen > 0 {
        state.record_train_cost(cost_sum / seen as f64);
    }
    tracing::debug!(
        "Epoch {} done: {} batches, {} iterations in total",
        state.epochs_done,
        batches,
        state.iterations_done
    );
    Ok(model)
}
