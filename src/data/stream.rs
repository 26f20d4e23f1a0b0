// ============================================================
// Layer 4 - Data Stream
// ============================================================
// Pairs a Burn Dataset with a SequentialScheme and hands out
// one validated Vec<DigitSample> per batch. Calling epoch()
// again starts a fresh pass from index 0, so the same stream
// serves every epoch of training or every evaluation round.
//
// Checks done per batch, before any tensor is built:
//   - every index resolves          → Dataset error
//   - every sample has the width    → Dataset error
//   - every label < num_classes     → Computation error

use std::ops::Range;

use burn::data::dataset::Dataset;

use crate::data::scheme::SequentialScheme;
use crate::domain::error::{Result, TrainError};
use crate::domain::sample::{DigitSample, MNIST_CLASSES, MNIST_PIXELS};

pub struct DataStream<D> {
    dataset:      D,
    scheme:       SequentialScheme,
    num_features: usize,
    num_classes:  usize,
}

impl<D: Dataset<DigitSample>> DataStream<D> {
    /// Sequential, unshuffled batches of `batch_size` over the whole
    /// dataset. Shape defaults to MNIST (784 features, 10 classes).
    pub fn sequential(dataset: D, batch_size: usize) -> Result<Self> {
        let scheme = SequentialScheme::new(dataset.len(), batch_size)?;
        Ok(Self {
            dataset,
            scheme,
            num_features: MNIST_PIXELS,
            num_classes:  MNIST_CLASSES,
        })
    }

    /// Overrides the expected feature width and class count.
    pub fn with_shape(mut self, num_features: usize, num_classes: usize) -> Self {
        self.num_features = num_features;
        self.num_classes  = num_classes;
        self
    }

    pub fn num_examples(&self) -> usize {
        self.scheme.num_examples()
    }

    pub fn num_batches(&self) -> usize {
        self.scheme.num_batches()
    }

    pub fn batch_size(&self) -> usize {
        self.scheme.batch_size()
    }

    /// Lazily yields the batches of one full pass.
    pub fn epoch(&self) -> impl Iterator<Item = Result<Vec<DigitSample>>> + '_ {
        self.scheme.batches().map(move |range| self.fetch(range))
    }

    fn fetch(&self, range: Range<usize>) -> Result<Vec<DigitSample>> {
        range
            .map(|index| {
                let sample = self.dataset.get(index).ok_or_else(|| {
                    TrainError::dataset(format!(
                        "index {index} missing from dataset of {} examples",
                        self.dataset.len()
                    ))
                })?;
                self.check(index, &sample)?;
                Ok(sample)
            })
            .collect()
    }

    fn check(&self, index: usize, sample: &DigitSample) -> Result<()> {
        if sample.width() != self.num_features {
            return Err(TrainError::dataset(format!(
                "example {index} has {} features, expected {}",
                sample.width(),
                self.num_features
            )));
        }
        if sample.label >= self.num_classes {
            return Err(TrainError::computation(format!(
                "example {index} has label {} outside [0, {})",
                sample.label, self.num_classes
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::DigitDataset;

    fn dataset(n: usize) -> DigitDataset {
        DigitDataset::new(
            (0..n)
                .map(|i| DigitSample::new(vec![i as f32, 0.0], i % 3))
                .collect(),
        )
    }

    #[test]
    fn one_pass_covers_every_example_in_order() {
        let stream = DataStream::sequential(dataset(11), 4)
            .unwrap()
            .with_shape(2, 3);

        let batches: Vec<Vec<DigitSample>> =
            stream.epoch().collect::<Result<_>>().unwrap();

        assert_eq!(batches.len(), 3);
        assert_eq!(stream.num_batches(), 3);
        assert_eq!(batches.iter().map(Vec::len).collect::<Vec<_>>(), vec![4, 4, 3]);

        let order: Vec<f32> = batches.iter().flatten().map(|s| s.pixels[0]).collect();
        let expected: Vec<f32> = (0..11).map(|i| i as f32).collect();
        assert_eq!(order, expected);
    }

    #[test]
    fn stream_restarts_each_epoch() {
        let stream = DataStream::sequential(dataset(5), 2)
            .unwrap()
            .with_shape(2, 3);
        let first: Vec<_> = stream.epoch().collect::<Result<Vec<_>>>().unwrap();
        let second: Vec<_> = stream.epoch().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn label_out_of_range_is_a_computation_error() {
        let ds = DigitDataset::new(vec![
            DigitSample::new(vec![0.0, 0.0], 1),
            DigitSample::new(vec![0.0, 0.0], 12),
        ]);
        let stream = DataStream::sequential(ds, 2).unwrap().with_shape(2, 10);

        let err = stream.epoch().next().unwrap().unwrap_err();
        assert!(matches!(err, TrainError::Computation(_)));
        assert!(err.to_string().contains("label 12"));
    }

    #[test]
    fn wrong_width_is_a_dataset_error() {
        let ds = DigitDataset::new(vec![DigitSample::new(vec![0.0; 5], 1)]);
        let stream = DataStream::sequential(ds, 1).unwrap();

        let err = stream.epoch().next().unwrap().unwrap_err();
        assert!(matches!(err, TrainError::Dataset(_)));
    }

    #[test]
    fn zero_batch_size_is_a_config_error() {
        let result = DataStream::sequential(dataset(3), 0);
        assert!(matches!(result, Err(TrainError::InvalidConfig(_))));
    }
}
