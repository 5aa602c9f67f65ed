//! Optimization Algorithms
//!
//! Stochastic gradient descent with learning-rate decay, momentum, and
//! optional Nesterov momentum. One optimizer instance is held per
//! parameterized layer; all instances in a network are clones of the single
//! configured optimizer.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Optimizer trait for weight updates
pub trait Optimizer: Send + Sync {
    /// Update weights given gradients
    fn update_weights(&mut self, weights: &mut Array2<f64>, gradients: &Array2<f64>);

    /// Update biases given gradients
    fn update_biases(&mut self, biases: &mut Array1<f64>, gradients: &Array1<f64>);

    /// Reset optimizer state (for new training run)
    fn reset(&mut self);

    /// Clone the optimizer for each layer
    fn clone_box(&self) -> Box<dyn Optimizer>;
}

/// Stochastic Gradient Descent with decay, momentum, and Nesterov momentum
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sgd {
    pub learning_rate: f64,
    /// Time-based decay: lr_t = lr / (1 + decay * t)
    pub decay: f64,
    pub momentum: f64,
    pub nesterov: bool,
    #[serde(skip)]
    iterations: usize,
    #[serde(skip)]
    velocity_w: Option<Array2<f64>>,
    #[serde(skip)]
    velocity_b: Option<Array1<f64>>,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            decay: 0.0,
            momentum: 0.0,
            nesterov: false,
            iterations: 0,
            velocity_w: None,
            velocity_b: None,
        }
    }

    pub fn with_decay(mut self, decay: f64) -> Self {
        self.decay = decay;
        self
    }

    pub fn with_momentum(mut self, momentum: f64) -> Self {
        self.momentum = momentum;
        self
    }

    pub fn with_nesterov(mut self, nesterov: bool) -> Self {
        self.nesterov = nesterov;
        self
    }

    /// Learning rate after `iterations` decay steps
    fn current_lr(&self) -> f64 {
        self.learning_rate / (1.0 + self.decay * self.iterations as f64)
    }
}

impl Optimizer for Sgd {
    fn update_weights(&mut self, weights: &mut Array2<f64>, gradients: &Array2<f64>) {
        // One optimizer step per batch; biases reuse the same step's rate
        self.iterations += 1;
        let lr = self.current_lr();

        if self.momentum > 0.0 {
            let v = self
                .velocity_w
                .get_or_insert_with(|| Array2::zeros(weights.dim()));
            *v = &*v * self.momentum - gradients * lr;
            if self.nesterov {
                *weights = &*weights + &(&*v * self.momentum - gradients * lr);
            } else {
                *weights = &*weights + &*v;
            }
        } else {
            *weights = &*weights - &(gradients * lr);
        }
    }

    fn update_biases(&mut self, biases: &mut Array1<f64>, gradients: &Array1<f64>) {
        let lr = self.current_lr();

        if self.momentum > 0.0 {
            let v = self
                .velocity_b
                .get_or_insert_with(|| Array1::zeros(biases.len()));
            *v = &*v * self.momentum - gradients * lr;
            if self.nesterov {
                *biases = &*biases + &(&*v * self.momentum - gradients * lr);
            } else {
                *biases = &*biases + &*v;
            }
        } else {
            *biases = &*biases - &(gradients * lr);
        }
    }

    fn reset(&mut self) {
        self.iterations = 0;
        self.velocity_w = None;
        self.velocity_b = None;
    }

    fn clone_box(&self) -> Box<dyn Optimizer> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sgd_update() {
        let mut optimizer = Sgd::new(0.01);
        let mut weights = Array2::ones((3, 2));
        let gradients = Array2::ones((3, 2));
        optimizer.update_weights(&mut weights, &gradients);

        assert_relative_eq!(weights[[0, 0]], 0.99, epsilon = 1e-10);
    }

    #[test]
    fn test_sgd_momentum_accumulates() {
        let mut optimizer = Sgd::new(0.1).with_momentum(0.9);
        let mut weights = Array2::zeros((1, 1));
        let gradients = Array2::ones((1, 1));

        // step 1: v = -0.1, w = -0.1
        optimizer.update_weights(&mut weights, &gradients);
        assert_relative_eq!(weights[[0, 0]], -0.1, epsilon = 1e-12);

        // step 2: v = 0.9 * -0.1 - 0.1 = -0.19, w = -0.29
        optimizer.update_weights(&mut weights, &gradients);
        assert_relative_eq!(weights[[0, 0]], -0.29, epsilon = 1e-12);
    }

    #[test]
    fn test_sgd_nesterov_lookahead() {
        let mut optimizer = Sgd::new(0.1).with_momentum(0.9).with_nesterov(true);
        let mut weights = Array2::zeros((1, 1));
        let gradients = Array2::ones((1, 1));

        // v = -0.1; w += 0.9 * v - lr * g = -0.19
        optimizer.update_weights(&mut weights, &gradients);
        assert_relative_eq!(weights[[0, 0]], -0.19, epsilon = 1e-12);
    }

    #[test]
    fn test_sgd_decay_shrinks_steps() {
        let mut optimizer = Sgd::new(1.0).with_decay(1.0);
        let mut weights = Array2::zeros((1, 1));
        let gradients = Array2::ones((1, 1));

        // t=1: lr = 1 / (1 + 1) = 0.5
        optimizer.update_weights(&mut weights, &gradients);
        assert_relative_eq!(weights[[0, 0]], -0.5, epsilon = 1e-12);

        // t=2: lr = 1 / 3
        optimizer.update_weights(&mut weights, &gradients);
        assert_relative_eq!(weights[[0, 0]], -0.5 - 1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut optimizer = Sgd::new(0.1).with_momentum(0.9).with_decay(0.5);
        let mut weights = Array2::zeros((2, 2));
        let gradients = Array2::ones((2, 2));
        optimizer.update_weights(&mut weights, &gradients);
        optimizer.reset();

        let mut fresh = Sgd::new(0.1).with_momentum(0.9).with_decay(0.5);
        let mut w2 = Array2::zeros((2, 2));
        fresh.update_weights(&mut w2, &gradients);

        let before = weights[[0, 0]];
        optimizer.update_weights(&mut weights, &gradients);
        // After reset the step matches a fresh optimizer's first step
        assert_relative_eq!(weights[[0, 0]] - before, w2[[0, 0]], epsilon = 1e-12);
    }
}
