//! Evaluation Metrics
//!
//! Per-task evaluation of trained models: classification metrics over hard
//! class predictions and regression metrics over continuous predictions.

mod classification;
mod regression;

pub use classification::{ClassificationMetrics, ConfusionMatrix};
pub use regression::RegressionMetrics;
