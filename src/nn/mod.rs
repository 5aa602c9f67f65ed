//! Neural Network Engine
//!
//! Building blocks for shared-trunk, multi-headed feedforward networks:
//! - Activation functions (ReLU, Sigmoid, Tanh, Softmax, Linear)
//! - Weight initialization schemes
//! - Dense layers with forward and backward propagation
//! - SGD optimizer with decay, momentum, and Nesterov momentum
//! - The multi-output graph network with named heads and per-head losses

mod activation;
mod graph;
mod init;
mod layer;
mod optimizer;

pub use activation::{create_activation, Activation, ActivationType};
pub use graph::{
    GraphConfig, GraphError, GraphNetwork, HeadConfig, LayerWeights, LossKind, INPUT_NAME,
    TRUNK_NAME,
};
pub use init::WeightInit;
pub use layer::DenseLayer;
pub use optimizer::{Optimizer, Sgd};
