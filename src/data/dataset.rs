use burn::data::dataset::{
    transform::{Mapper, MapperDataset},
    vision::{MnistDataset, MnistItem},
    Dataset,
};

use crate::domain::sample::DigitSample;

/// In-memory dataset of labelled samples, used by the unit tests.
#[cfg(test)]
pub struct DigitDataset {
    samples: Vec<DigitSample>,
}

#[cfg(test)]
impl DigitDataset {
    pub fn new(samples: Vec<DigitSample>) -> Self {
        Self { samples }
    }
}

#[cfg(test)]
impl Dataset<DigitSample> for DigitDataset {
    fn get(&self, index: usize) -> Option<DigitSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// Flattens a 28x28 MNIST image row by row and scales it to [0, 1].
#[derive(Debug, Clone, Copy, Default)]
pub struct MnistToDigit;

impl Mapper<MnistItem, DigitSample> for MnistToDigit {
    fn map(&self, item: &MnistItem) -> DigitSample {
        let pixels = item
            .image
            .iter()
            .flat_map(|row| row.iter().map(|&p| p / 255.0))
            .collect();
        DigitSample::new(pixels, item.label as usize)
    }
}

/// One MNIST split seen as `DigitSample`s.
pub type MnistDigits = MapperDataset<MnistDataset, MnistToDigit, MnistItem>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

/// Opens an MNIST split. burn downloads the archive on first use
/// and reads it from its cache afterwards.
pub fn mnist(split: Split) -> MnistDigits {
    let raw = match split {
        Split::Train => MnistDataset::train(),
        Split::Test  => MnistDataset::test(),
    };
    tracing::info!("MNIST {:?} split: {} examples", split, raw.len());
    MapperDataset::new(raw, MnistToDigit)
}
