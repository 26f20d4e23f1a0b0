// ============================================================
// Layer 4 - Sequential Iteration Scheme
// ============================================================
// Decides which example indices make up each batch:
//
//   [0, B), [B, 2B), ..., [kB, N)
//
// No shuffling. When N is not a multiple of B the last range
// is shorter but still emitted, so one pass yields ceil(N / B)
// ranges covering every index exactly once.

use std::ops::Range;

use crate::domain::error::{Result, TrainError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequentialScheme {
    num_examples: usize,
    batch_size:   usize,
}

impl SequentialScheme {
    /// Fails with a configuration error when `batch_size` is zero.
    pub fn new(num_examples: usize, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(TrainError::invalid_config("batch size must be > 0"));
        }
        Ok(Self { num_examples, batch_size })
    }

    pub fn num_examples(&self) -> usize {
        self.num_examples
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn num_batches(&self) -> usize {
        self.num_examples.div_ceil(self.batch_size)
    }

    /// Index ranges for one pass, in order.
    pub fn batches(&self) -> impl Iterator<Item = Range<usize>> {
        let Self { num_examples, batch_size } = *self;
        (0..num_examples)
            .step_by(batch_size)
            .map(move |start| start..(start + batch_size).min(num_examples))
    }
}
