// ============================================================
// Layer 4 - Digit Batcher
// ============================================================
// Implements Burn's Batcher trait to stack a Vec<DigitSample>
// into two tensors:
//
//   features: [rows, width]  (Float)
//   targets:  [rows]         (Int)
//
// The stream has already checked that every sample has the
// same width and a label in range, so this step cannot fail.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::domain::sample::DigitSample;

/// A batch of samples ready for the forward pass.
#[derive(Debug, Clone)]
pub struct DigitBatch<B: Backend> {
    /// Shape: [rows, width]
    pub features: Tensor<B, 2>,

    /// Shape: [rows], one class index per row
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> DigitBatch<B> {
    pub fn rows(&self) -> usize {
        self.targets.dims()[0]
    }
}

/// Stateless: the device is supplied per call by the caller.
#[derive(Clone, Debug, Default)]
pub struct DigitBatcher;

impl<B: Backend> Batcher<B, DigitSample, DigitBatch<B>> for DigitBatcher {
    fn batch(&self, items: Vec<DigitSample>, device: &B::Device) -> DigitBatch<B> {
        let rows  = items.len();
        let width = items.first().map_or(0, DigitSample::width);

        let features_flat: Vec<f32> = items
            .iter()
            .flat_map(|s| s.pixels.iter().copied())
            .collect();

        // Burn's Int tensors are built from i32 slices
        let labels: Vec<i32> = items.iter().map(|s| s.label as i32).collect();

        let features = Tensor::<B, 1>::from_floats(features_flat.as_slice(), device)
            .reshape([rows, width]);
        let targets = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), device);

        DigitBatch { features, targets }
    }
}
