//! Model Layer
//!
//! The per-task interface over the network engine: task specifications,
//! validated hyperparameters, the multi-task wrapper with its data-shaping
//! calls, directory-based persistence, and the model-type registry.

mod multitask;
mod params;
mod persist;
mod registry;
mod task;

pub use multitask::{MultiTaskNetwork, WEIGHT_EPS};
pub use params::ModelParams;
pub use persist::{model_basename, META_FILENAME};
pub use registry::{ModelFactory, ModelRegistry, MULTITASK_DNN, SINGLETASK_DNN};
pub use task::{to_one_hot, TaskKind, TaskSpec};

use thiserror::Error;

use crate::nn::GraphError;

/// Errors raised by model construction, training, and persistence
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid architecture description: {0}")]
    Format(#[from] serde_json::Error),

    #[error("invalid weight blob: {0}")]
    Blob(#[from] bincode::Error),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("invalid model parameters: {0}")]
    InvalidParams(String),

    #[error("task specification must contain at least one task")]
    EmptyTaskSpec,

    #[error("unknown model type: {0:?}")]
    UnknownModelType(String),

    #[error("model has no network; construct with initialization or load one")]
    NotInitialized,
}
