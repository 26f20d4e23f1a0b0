// ============================================================
// Layer 3 - DigitSample Domain Type
// ============================================================
// One labelled example: a flat feature vector and the index
// of its class. For MNIST the features are the 28x28 pixel
// intensities scaled to [0, 1] and the class is the digit.

use serde::{Deserialize, Serialize};

/// Number of pixels in one MNIST image (28 x 28).
pub const MNIST_PIXELS: usize = 28 * 28;

/// Number of digit classes in MNIST.
pub const MNIST_CLASSES: usize = 10;

/// A single labelled example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigitSample {
    /// Flat feature vector, row-major for images
    pub pixels: Vec<f32>,

    /// Class index, expected in [0, num_classes)
    pub label: usize,
}

impl DigitSample {
    pub fn new(pixels: Vec<f32>, label: usize) -> Self {
        Self { pixels, label }
    }

    /// Number of features in this sample
    pub fn width(&self) -> usize {
        self.pixels.len()
    }
}
