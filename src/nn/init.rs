//! Weight Initialization Schemes
//!
//! Fan-in/fan-out scaled uniform initializers for dense layer weights.

use ndarray::Array2;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Weight initialization scheme for a dense layer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WeightInit {
    /// Uniform in ±sqrt(6 / (fan_in + fan_out))
    GlorotUniform,
    /// Uniform in ±sqrt(6 / fan_in)
    HeUniform,
    /// Uniform in ±sqrt(3 / fan_in)
    LecunUniform,
    /// All zeros (deterministic, mainly for tests)
    Zeros,
}

impl WeightInit {
    /// Sample a weight matrix of the given (fan_in, fan_out) shape
    pub fn sample(&self, shape: (usize, usize)) -> Array2<f64> {
        let (fan_in, fan_out) = shape;
        let limit = match self {
            WeightInit::GlorotUniform => (6.0 / (fan_in + fan_out) as f64).sqrt(),
            WeightInit::HeUniform => (6.0 / fan_in as f64).sqrt(),
            WeightInit::LecunUniform => (3.0 / fan_in as f64).sqrt(),
            WeightInit::Zeros => return Array2::zeros(shape),
        };
        Array2::random(shape, Uniform::new(-limit, limit))
    }
}

impl FromStr for WeightInit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "glorot_uniform" => Ok(WeightInit::GlorotUniform),
            "he_uniform" => Ok(WeightInit::HeUniform),
            "lecun_uniform" => Ok(WeightInit::LecunUniform),
            "zeros" => Ok(WeightInit::Zeros),
            other => Err(format!("unknown weight initialization: {other}")),
        }
    }
}
