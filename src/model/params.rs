//! Model Hyperparameters
//!
//! The configuration record supplied once at construction: input width,
//! trunk width, weight initialization, trunk activation, dropout, and the
//! SGD settings shared by every head.

use serde::{Deserialize, Serialize};

use super::ModelError;
use crate::nn::{ActivationType, WeightInit};

/// Hyperparameters of a multi-task network. Immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelParams {
    /// Number of input features
    pub n_inputs: usize,
    /// Width of the shared dense trunk
    pub n_hidden: usize,
    /// Weight initialization scheme
    pub init: WeightInit,
    /// Trunk activation
    pub activation: ActivationType,
    /// Dropout rate on the trunk output, in [0, 1)
    pub dropout: f64,
    /// SGD learning rate
    pub learning_rate: f64,
    /// SGD time-based learning-rate decay
    pub decay: f64,
    /// SGD momentum
    pub momentum: f64,
    /// Use Nesterov momentum
    pub nesterov: bool,
}

impl ModelParams {
    /// Defaults for a network over `n_inputs` features
    pub fn new(n_inputs: usize) -> Self {
        Self {
            n_inputs,
            n_hidden: 64,
            init: WeightInit::GlorotUniform,
            activation: ActivationType::ReLU,
            dropout: 0.0,
            learning_rate: 0.01,
            decay: 0.0,
            momentum: 0.0,
            nesterov: false,
        }
    }

    pub fn hidden(mut self, n_hidden: usize) -> Self {
        self.n_hidden = n_hidden;
        self
    }

    pub fn init(mut self, init: WeightInit) -> Self {
        self.init = init;
        self
    }

    pub fn activation(mut self, activation: ActivationType) -> Self {
        self.activation = activation;
        self
    }

    pub fn dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }

    pub fn learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn decay(mut self, decay: f64) -> Self {
        self.decay = decay;
        self
    }

    pub fn momentum(mut self, momentum: f64) -> Self {
        self.momentum = momentum;
        self
    }

    pub fn nesterov(mut self, nesterov: bool) -> Self {
        self.nesterov = nesterov;
        self
    }

    /// Check the record at construction time
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.n_inputs == 0 {
            return Err(ModelError::InvalidParams(
                "n_inputs must be positive".to_string(),
            ));
        }
        if self.n_hidden == 0 {
            return Err(ModelError::InvalidParams(
                "n_hidden must be positive".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ModelError::InvalidParams(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        if self.learning_rate <= 0.0 || !self.learning_rate.is_finite() {
            return Err(ModelError::InvalidParams(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.decay < 0.0 {
            return Err(ModelError::InvalidParams(format!(
                "decay must be non-negative, got {}",
                self.decay
            )));
        }
        if self.momentum < 0.0 {
            return Err(ModelError::InvalidParams(format!(
                "momentum must be non-negative, got {}",
                self.momentum
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(ModelParams::new(16).validate().is_ok());
    }

    #[test]
    fn test_zero_inputs_rejected() {
        let err = ModelParams::new(0).validate().unwrap_err();
        assert!(matches!(err, ModelError::InvalidParams(_)));
    }

    #[test]
    fn test_bad_dropout_rejected() {
        assert!(ModelParams::new(4).dropout(1.0).validate().is_err());
        assert!(ModelParams::new(4).dropout(-0.1).validate().is_err());
        assert!(ModelParams::new(4).dropout(0.5).validate().is_ok());
    }

    #[test]
    fn test_bad_learning_rate_rejected() {
        assert!(ModelParams::new(4).learning_rate(0.0).validate().is_err());
        assert!(ModelParams::new(4).learning_rate(-1.0).validate().is_err());
    }

    #[test]
    fn test_params_json_round_trip() {
        let params = ModelParams::new(10)
            .hidden(32)
            .dropout(0.25)
            .learning_rate(0.003)
            .momentum(0.9)
            .nesterov(true);
        let json = serde_json::to_string(&params).unwrap();
        let back: ModelParams = serde_json::from_str(&json).unwrap();
        assert_eq!(params, back);
    }
}
