use burn::{
    module::Param,
    nn::{loss::CrossEntropyLossConfig, Linear, LinearConfig},
    prelude::*,
    tensor::ElementConversion,
};
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::domain::error::{self, TrainError};

/// Element-wise (or row-wise, for softmax) non-linearity applied after
/// a dense layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Identity,
    Tanh,
    Sigmoid,
    Relu,
    /// Normalises each row into a probability distribution
    Softmax,
}

impl Activation {
    pub fn apply<B: Backend>(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        match self {
            Activation::Identity => x,
            Activation::Tanh     => burn::tensor::activation::tanh(x),
            Activation::Sigmoid  => burn::tensor::activation::sigmoid(x),
            Activation::Relu     => burn::tensor::activation::relu(x),
            Activation::Softmax  => burn::tensor::activation::softmax(x, 1),
        }
    }

    // Module fields must be Modules themselves; a u8 is stored as a constant.
    fn to_id(self) -> u8 {
        match self {
            Activation::Identity => 0,
            Activation::Tanh     => 1,
            Activation::Sigmoid  => 2,
            Activation::Relu     => 3,
            Activation::Softmax  => 4,
        }
    }

    fn from_id(id: u8) -> Self {
        match id {
            1 => Activation::Tanh,
            2 => Activation::Sigmoid,
            3 => Activation::Relu,
            4 => Activation::Softmax,
            _ => Activation::Identity,
        }
    }
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally - do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct MlpConfig {
    /// Layer widths, input first, classes last, e.g. [784, 100, 10]
    pub widths: Vec<usize>,
    /// One activation per weight layer (widths.len() - 1)
    pub activations: Vec<Activation>,
    #[config(default = 0.0)]
    pub weights_mean: f64,
    #[config(default = 0.01)]
    pub weights_std: f64,
    #[config(default = 0.0)]
    pub biases_init: f64,
}

impl MlpConfig {
    /// Shape and initialisation checks. Every failure is a configuration error.
    pub fn validate(&self) -> error::Result<()> {
        if self.widths.len() < 2 {
            return Err(TrainError::invalid_config(format!(
                "an MLP needs an input and an output width, got {:?}",
                self.widths
            )));
        }
        if self.activations.len() != self.widths.len() - 1 {
            return Err(TrainError::invalid_config(format!(
                "{} activations given for {} widths, expected {}",
                self.activations.len(),
                self.widths.len(),
                self.widths.len() - 1
            )));
        }
        if let Some(i) = self.widths.iter().position(|&w| w == 0) {
            return Err(TrainError::invalid_config(format!("layer width {i} is zero")));
        }
        if self.activations.last() != Some(&Activation::Softmax) {
            return Err(TrainError::invalid_config(
                "the output activation must be softmax to produce class probabilities",
            ));
        }
        if !(self.weights_std.is_finite() && self.weights_std >= 0.0) {
            return Err(TrainError::invalid_config(format!(
                "weights std must be finite and >= 0, got {}",
                self.weights_std
            )));
        }
        if !self.weights_mean.is_finite() || !self.biases_init.is_finite() {
            return Err(TrainError::invalid_config("weights mean and bias init must be finite"));
        }
        Ok(())
    }

    /// Builds the network. Weights ~ N(mean, std²) from a seeded RNG,
    /// biases = `biases_init`.
    pub fn init<B: Backend>(&self, seed: u64, device: &B::Device) -> error::Result<Mlp<B>> {
        self.validate()?;

        let normal = Normal::new(self.weights_mean, self.weights_std)
            .map_err(|e| TrainError::invalid_config(format!("weights init: {e}")))?;
        let mut rng = StdRng::seed_from_u64(seed);

        let layers = self
            .widths
            .windows(2)
            .zip(&self.activations)
            .map(|(pair, &activation)| {
                let (d_in, d_out) = (pair[0], pair[1]);
                let weights: Vec<f32> = (0..d_in * d_out)
                    .map(|_| normal.sample(&mut rng) as f32)
                    .collect();

                let mut linear = LinearConfig::new(d_in, d_out).init(device);
                // burn stores the weight as [d_input, d_output]
                linear.weight = Param::from_tensor(
                    Tensor::<B, 1>::from_floats(weights.as_slice(), device).reshape([d_in, d_out]),
                );
                linear.bias = Some(Param::from_tensor(Tensor::<B, 1>::full(
                    [d_out],
                    self.biases_init,
                    device,
                )));

                Dense { linear, d_in, d_out, activation_id: activation.to_id() }
            })
            .collect();

        Ok(Mlp { layers })
    }
}

#[derive(Module, Debug)]
pub struct Dense<B: Backend> {
    linear:        Linear<B>,
    d_in:          usize,
    d_out:         usize,
    activation_id: u8,
}

impl<B: Backend> Dense<B> {
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        self.activation().apply(self.linear.forward(x))
    }

    pub fn activation(&self) -> Activation {
        Activation::from_id(self.activation_id)
    }
}

#[derive(Module, Debug)]
pub struct Mlp<B: Backend> {
    layers: Vec<Dense<B>>,
}

pub struct ClassificationOutput<B: Backend> {
    /// Mean categorical cross-entropy, shape [1]
    pub cost: Tensor<B, 1>,
    /// Output-layer probabilities, shape [rows, classes]
    pub probabilities: Tensor<B, 2>,
    pub targets:       Tensor<B, 1, Int>,
}

impl<B: Backend> ClassificationOutput<B> {
    pub fn cost_value(&self) -> f64 {
        self.cost.clone().into_scalar().elem::<f64>()
    }

    /// Rows whose arg-max prediction differs from the target.
    pub fn misclassified(&self) -> usize {
        // argmax(1) returns [rows, 1] - flatten before comparing with [rows]
        let predictions = self.probabilities.clone().argmax(1).flatten::<1>(0, 1);
        let correct: i64 = predictions
            .equal(self.targets.clone())
            .int()
            .sum()
            .into_scalar()
            .elem::<i64>();
        self.targets.dims()[0].saturating_sub(correct as usize)
    }
}

impl<B: Backend> Mlp<B> {
    /// x: [rows, input_width] → class scores before the output softmax.
    pub fn forward_logits(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        match self.layers.split_last() {
            Some((output, hidden)) => {
                let x = hidden.iter().fold(x, |x, layer| layer.forward(x));
                output.linear.forward(x)
            }
            None => x,
        }
    }

    /// x: [rows, input_width] → probabilities: [rows, classes]
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let logits = self.forward_logits(x);
        match self.layers.last() {
            Some(output) => output.activation().apply(logits),
            None => logits,
        }
    }

    /// Cross-entropy of the softmax output against integer targets.
    pub fn forward_classification(
        &self,
        features: Tensor<B, 2>,
        targets:  Tensor<B, 1, Int>,
    ) -> ClassificationOutput<B> {
        let probabilities = self.forward(features);
        // the output layer already applied softmax
        let ce = CrossEntropyLossConfig::new()
            .with_logits(false)
            .init(&probabilities.device());
        let cost = ce.forward(probabilities.clone(), targets.clone());
        ClassificationOutput { cost, probabilities, targets }
    }

    pub fn input_width(&self) -> usize {
        self.layers.first().map_or(0, |l| l.d_in)
    }

    pub fn num_classes(&self) -> usize {
        self.layers.last().map_or(0, |l| l.d_out)
    }

    pub fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.layers.iter().map(|l| l.d_in).collect();
        widths.push(self.num_classes());
        widths
    }

    pub fn activations(&self) -> Vec<Activation> {
        self.layers.iter().map(Dense::activation).collect()
    }
}
