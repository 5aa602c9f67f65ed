//! Task Specifications
//!
//! A task is one supervised prediction target: a column of the label matrix
//! together with a kind (classification or regression). The kind carries the
//! per-task behavior table: head width and activation, loss function, label
//! transform, and prediction reducer. Task identifiers are kept in ascending
//! lexicographic order, and that order fixes the mapping between label/weight
//! columns and the network's named heads and outputs.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use super::ModelError;
use crate::nn::{ActivationType, LossKind};

/// Kind of one supervised task
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Binary label column; two-way softmax head
    Classification,
    /// Continuous target column; single linear unit head
    Regression,
}

impl TaskKind {
    /// Number of units in this task's output head
    pub fn head_width(&self) -> usize {
        match self {
            TaskKind::Classification => 2,
            TaskKind::Regression => 1,
        }
    }

    /// Activation of this task's output head
    pub fn head_activation(&self) -> ActivationType {
        match self {
            TaskKind::Classification => ActivationType::Softmax,
            TaskKind::Regression => ActivationType::Linear,
        }
    }

    /// Loss function attached to this task's output
    pub fn loss(&self) -> LossKind {
        match self {
            TaskKind::Classification => LossKind::BinaryCrossEntropy,
            TaskKind::Regression => LossKind::MeanSquaredError,
        }
    }

    /// Turn one label column into the target array the head trains against:
    /// one-hot [n, 2] for classification, the raw column as [n, 1] for
    /// regression.
    pub fn pack_labels(&self, column: ArrayView1<f64>) -> Array2<f64> {
        match self {
            TaskKind::Classification => to_one_hot(column),
            TaskKind::Regression => column.to_owned().insert_axis(Axis(1)),
        }
    }

    /// Reduce one head's raw predictions to a flat per-sample column:
    /// row-wise argmax over the class probabilities for classification, the
    /// squeezed scalar for regression.
    pub fn reduce_predictions(&self, pred: ArrayView2<f64>) -> Array1<f64> {
        match self {
            TaskKind::Classification => pred
                .axis_iter(Axis(0))
                .map(|row| argmax(row) as f64)
                .collect(),
            TaskKind::Regression => pred.index_axis(Axis(1), 0).to_owned(),
        }
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "classification" => Ok(TaskKind::Classification),
            "regression" => Ok(TaskKind::Regression),
            other => Err(format!("unknown task kind: {other}")),
        }
    }
}

fn argmax(row: ArrayView1<f64>) -> usize {
    let mut best = 0;
    for (j, &v) in row.iter().enumerate() {
        if v > row[best] {
            best = j;
        }
    }
    best
}

/// Transforms a binary label vector into one-hot encoding.
///
/// Returns an [n, 2] matrix with label 0 as [1, 0] and label 1 as [0, 1].
/// Any other value leaves its row all-zero, which removes that sample from
/// the loss the same way a zero sample weight does; a single warning is
/// logged when this happens.
pub fn to_one_hot(y: ArrayView1<f64>) -> Array2<f64> {
    let mut y_hot = Array2::zeros((y.len(), 2));
    let mut out_of_range = 0usize;
    for (index, &val) in y.iter().enumerate() {
        if val == 0.0 {
            y_hot[[index, 0]] = 1.0;
        } else if val == 1.0 {
            y_hot[[index, 1]] = 1.0;
        } else {
            out_of_range += 1;
        }
    }
    if out_of_range > 0 {
        log::warn!("{out_of_range} labels outside {{0, 1}} were one-hot encoded as all-zero rows");
    }
    y_hot
}

/// Mapping from task identifier to task kind, ordered lexicographically.
///
/// The sorted order is the single source of truth for column-to-name
/// mapping: task `i` in this order owns label column `y[:, i]`, weight
/// column `w[:, i]`, head `dense_head{i}`, and output `task{i}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct TaskSpec {
    tasks: BTreeMap<String, TaskKind>,
}

impl TaskSpec {
    /// Create a task specification; fails on an empty mapping
    pub fn new(tasks: BTreeMap<String, TaskKind>) -> Result<Self, ModelError> {
        if tasks.is_empty() {
            return Err(ModelError::EmptyTaskSpec);
        }
        Ok(Self { tasks })
    }

    /// Build a spec from (identifier, kind) pairs
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = (S, TaskKind)>,
        S: Into<String>,
    {
        Self::new(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks in ascending lexicographic order of identifier
    pub fn iter(&self) -> impl Iterator<Item = (&str, TaskKind)> + '_ {
        self.tasks.iter().map(|(id, &kind)| (id.as_str(), kind))
    }

    /// Task identifiers in sorted order
    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.tasks.keys().map(String::as_str)
    }

    /// Name of the i-th output in sorted-task order
    pub fn output_name(index: usize) -> String {
        format!("task{index}")
    }

    /// Name of the i-th head layer in sorted-task order
    pub fn head_name(index: usize) -> String {
        format!("dense_head{index}")
    }
}
