// ============================================================
// Layer 5 - Steepest Descent Step Rule
// ============================================================
// θ = θ - lr * ∂cost/∂θ   for every trainable parameter
//
// Burn's Sgd with no momentum, no weight decay and no gradient
// clipping is exactly this rule; the wrapper owns the fixed
// learning rate and runs backward + update in one call.
//
// Reference: Burn Book §5 (Optimizers)

use burn::{
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer, SgdConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::domain::error::{Result, TrainError};

pub struct SteepestDescent<O> {
    learning_rate: f64,
    optim:         O,
}

impl<O> SteepestDescent<O> {
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Back-propagates `cost` and returns the updated module.
    pub fn step<B, M>(&mut self, cost: Tensor<B, 1>, module: M) -> M
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
        O: Optimizer<M, B>,
    {
        let grads = cost.backward();
        let grads = GradientsParams::from_grads(grads, &module);
        self.optim.step(self.learning_rate, module, grads)
    }
}

/// Fixed-rate gradient descent for module `M`.
///
/// Fails with a configuration error unless `learning_rate` is finite and > 0.
pub fn steepest_descent<B, M>(learning_rate: f64) -> Result<SteepestDescent<impl Optimizer<M, B>>>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    if !(learning_rate.is_finite() && learning_rate > 0.0) {
        return Err(TrainError::invalid_config(format!(
            "learning rate must be > 0, got {learning_rate}"
        )));
    }
    Ok(SteepestDescent {
        learning_rate,
        optim: SgdConfig::new().init::<B, M>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::{Activation, Mlp, MlpConfig};
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray>;

    #[test]
    fn non_positive_learning_rates_are_rejected() {
        for lr in [0.0, -0.1, f64::NAN, f64::INFINITY] {
            let result = steepest_descent::<TestBackend, Mlp<TestBackend>>(lr);
            assert!(matches!(result, Err(TrainError::InvalidConfig(_))), "lr = {lr}");
        }
    }

    #[test]
    fn a_step_descends_the_cost() {
        let device = Default::default();
        let model: Mlp<TestBackend> =
            MlpConfig::new(vec![2, 4, 2], vec![Activation::Tanh, Activation::Softmax])
                .with_weights_std(0.5)
                .init(3, &device)
                .unwrap();
        let mut rule = steepest_descent::<TestBackend, Mlp<TestBackend>>(0.5).unwrap();
        assert_eq!(rule.learning_rate(), 0.5);

        let x = Tensor::<TestBackend, 1>::from_floats([1.0, 0.0, 0.0, 1.0].as_slice(), &device)
            .reshape([2, 2]);
        let y = Tensor::<TestBackend, 1, Int>::from_ints([0, 1].as_slice(), &device);

        let before = model.forward_classification(x.clone(), y.clone());
        let cost_before = before.cost_value();
        let model = rule.step(before.cost, model);

        let cost_after = model.forward_classification(x, y).cost_value();
        assert!(cost_after < cost_before, "{cost_after} !< {cost_before}");
    }
}
