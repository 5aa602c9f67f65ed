//! # Multi-Task Deep Neural Networks
//!
//! This library provides shared-trunk multi-headed MLPs for datasets with
//! several supervised targets per sample. Each task (a label column paired
//! with a classification or regression kind) gets its own named output head
//! on a common dense trunk; task identifiers are ordered lexicographically
//! and that order fixes every column-to-head mapping. Trained models persist
//! as an architecture description (JSON) plus a binary weight blob that
//! together rebuild an inference-identical network.
//!
//! ## Modules
//!
//! - `nn` - Network engine (layers, activations, SGD, the multi-output graph)
//! - `model` - Task specifications, the multi-task wrapper, persistence, registry
//! - `data` - CSV dataset loading into feature/label/weight arrays
//! - `metrics` - Per-task classification and regression metrics

pub mod data;
pub mod metrics;
pub mod model;
pub mod nn;

pub use data::Dataset;
pub use model::{
    MultiTaskNetwork, ModelError, ModelParams, ModelRegistry, TaskKind, TaskSpec,
};
pub use nn::GraphNetwork;
