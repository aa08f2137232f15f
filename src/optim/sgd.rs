//! Stochastic Gradient Descent optimizer

use super::Optimizer;
use crate::Tensor;
use log::trace;
use ndarray::ArrayD;

/// SGD optimizer with optional momentum
pub struct SGD {
    lr: f32,
    momentum: f32,
    velocities: Vec<Option<ArrayD<f32>>>,
}

impl SGD {
    /// Create a new SGD optimizer
    pub fn new(lr: f32, momentum: f32) -> Self {
        Self {
            lr,
            momentum,
            velocities: Vec::new(),
        }
    }

    /// Initialize velocities if needed
    fn ensure_velocities(&mut self, params: &[Tensor]) {
        if self.velocities.is_empty() {
            self.velocities = params.iter().map(|_| None).collect();
        }
    }
}

impl Optimizer for SGD {
    fn step(&mut self, params: &[Tensor]) {
        self.ensure_velocities(params);

        for (i, param) in params.iter().enumerate() {
            // A parameter whose accumulator is still the ones identity has
            // not seen a backward pass; skip it rather than apply a bogus
            // delta.
            if !param.grad_ready() {
                continue;
            }
            let Some(grad) = param.grad() else { continue };
            trace!("sgd step on parameter {i}, shape {:?}", param.shape());

            if self.momentum > 0.0 {
                // v = momentum * v - lr * grad
                let velocity = match &self.velocities[i] {
                    Some(v) => v * self.momentum - &grad * self.lr,
                    None => &grad * (-self.lr),
                };
                param.update_add(&velocity);
                self.velocities[i] = Some(velocity);
            } else {
                // Simple SGD: param -= lr * grad
                param.update_sub(&(&grad * self.lr));
            }
        }
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }
}
