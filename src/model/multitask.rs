//! Multi-Task Network Wrapper
//!
//! Wraps a [`GraphNetwork`] behind a per-task interface: callers supply a
//! flat label matrix and weight matrix with one column per task, and the
//! wrapper converts between that representation and the name-to-array dicts
//! the network trains and predicts on. A single-task model is the one-task
//! special case of the same type, not a separate implementation.

use ndarray::{Array1, Array2, ArrayD, Axis};
use std::collections::HashMap;

use super::params::ModelParams;
use super::registry::MULTITASK_DNN;
use super::task::TaskSpec;
use super::ModelError;
use crate::nn::{GraphConfig, GraphNetwork, HeadConfig, Sgd, INPUT_NAME};

/// Added to every sample weight before a training step so no (sample, task)
/// pair carries exactly zero total weight.
pub const WEIGHT_EPS: f64 = 0.001;

/// Shared-trunk multi-headed MLP with one output head per task
pub struct MultiTaskNetwork {
    type_name: String,
    tasks: TaskSpec,
    params: ModelParams,
    graph: Option<GraphNetwork>,
}

impl std::fmt::Debug for MultiTaskNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiTaskNetwork")
            .field("type_name", &self.type_name)
            .field("tasks", &self.tasks)
            .field("params", &self.params)
            .field("graph", &self.graph.is_some())
            .finish()
    }
}

impl MultiTaskNetwork {
    /// Construct a model and build its network
    pub fn new(tasks: TaskSpec, params: ModelParams) -> Result<Self, ModelError> {
        Self::build(MULTITASK_DNN, tasks, params, true)
    }

    /// Construct without building the network; used by the load path, which
    /// replaces the network wholesale from persisted artifacts.
    pub(crate) fn build(
        type_name: &str,
        tasks: TaskSpec,
        params: ModelParams,
        initialize: bool,
    ) -> Result<Self, ModelError> {
        params.validate()?;
        let graph = if initialize {
            Some(GraphNetwork::from_config(graph_config(&tasks, &params)))
        } else {
            None
        };
        Ok(Self {
            type_name: type_name.to_string(),
            tasks,
            params,
            graph,
        })
    }

    /// Registered model-type name this instance was created under
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn tasks(&self) -> &TaskSpec {
        &self.tasks
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    /// The underlying network, if constructed or loaded
    pub fn raw(&self) -> Option<&GraphNetwork> {
        self.graph.as_ref()
    }

    /// Mutable access to the underlying network
    pub fn raw_mut(&mut self) -> Option<&mut GraphNetwork> {
        self.graph.as_mut()
    }

    pub(crate) fn install_raw(&mut self, graph: GraphNetwork) {
        self.graph = Some(graph);
    }

    fn graph_mut(&mut self) -> Result<&mut GraphNetwork, ModelError> {
        self.graph.as_mut().ok_or(ModelError::NotInitialized)
    }

    /// Package a feature matrix (and labels, when training) as the
    /// name-to-array dict the network consumes. Labels are one-hot encoded
    /// for classification tasks and passed through as a single column for
    /// regression tasks; the entry for task `i` in sorted order is keyed
    /// `task{i}`.
    pub fn pack_inputs(
        &self,
        x: &Array2<f64>,
        y: Option<&Array2<f64>>,
    ) -> HashMap<String, Array2<f64>> {
        let mut data = HashMap::with_capacity(1 + self.tasks.len());
        data.insert(INPUT_NAME.to_string(), x.clone());
        if let Some(y) = y {
            for (i, (_, kind)) in self.tasks.iter().enumerate() {
                data.insert(TaskSpec::output_name(i), kind.pack_labels(y.column(i)));
            }
        }
        data
    }

    /// Package a weight matrix as one per-sample weight vector per output
    pub fn pack_sample_weights(&self, w: &Array2<f64>) -> HashMap<String, Array1<f64>> {
        let mut weights = HashMap::with_capacity(self.tasks.len());
        for i in 0..self.tasks.len() {
            weights.insert(TaskSpec::output_name(i), w.column(i).to_owned());
        }
        weights
    }

    /// One optimizer step on a batch. Returns the network's reported loss.
    ///
    /// Every weight gets [`WEIGHT_EPS`] added before packaging, so a batch
    /// whose weights are all zero still has positive total weight.
    pub fn fit_on_batch(
        &mut self,
        x: &Array2<f64>,
        y: &Array2<f64>,
        w: &Array2<f64>,
    ) -> Result<f64, ModelError> {
        let w = w + WEIGHT_EPS;
        let data = self.pack_inputs(x, Some(y));
        let sample_weight = self.pack_sample_weights(&w);
        Ok(self.graph_mut()?.train_on_batch(&data, &sample_weight)?)
    }

    /// Predict on a batch.
    ///
    /// Classification outputs are reduced to the most likely class by
    /// row-wise argmax; regression outputs to their scalar prediction. The
    /// result has shape [n, t] with columns in sorted-task order, collapsed
    /// to [n] when there is a single task.
    pub fn predict_on_batch(&mut self, x: &Array2<f64>) -> Result<ArrayD<f64>, ModelError> {
        let data = self.pack_inputs(x, None);
        let preds = self.graph_mut()?.predict_on_batch(&data)?;

        let n_samples = x.nrows();
        let n_tasks = self.tasks.len();
        let mut y_pred = Array2::zeros((n_samples, n_tasks));
        for (i, (_, kind)) in self.tasks.iter().enumerate() {
            let name = TaskSpec::output_name(i);
            let pred = preds
                .get(&name)
                .ok_or_else(|| crate::nn::GraphError::MissingOutput(name.clone()))?;
            y_pred
                .column_mut(i)
                .assign(&kind.reduce_predictions(pred.view()));
        }

        Ok(if n_tasks == 1 {
            y_pred.index_axis_move(Axis(1), 0).into_dyn()
        } else {
            y_pred.into_dyn()
        })
    }
}

/// Derive the network architecture from a task specification and parameters:
/// shared trunk, then one head per task in sorted order.
fn graph_config(tasks: &TaskSpec, params: &ModelParams) -> GraphConfig {
    let heads = tasks
        .iter()
        .enumerate()
        .map(|(i, (_, kind))| HeadConfig {
            name: TaskSpec::head_name(i),
            output: TaskSpec::output_name(i),
            width: kind.head_width(),
            activation: kind.head_activation(),
            loss: kind.loss(),
        })
        .collect();

    GraphConfig {
        n_inputs: params.n_inputs,
        n_hidden: params.n_hidden,
        init: params.init,
        activation: params.activation,
        dropout: params.dropout,
        heads,
        optimizer: Sgd::new(params.learning_rate)
            .with_decay(params.decay)
            .with_momentum(params.momentum)
            .with_nesterov(params.nesterov),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::TaskKind;
    use crate::nn::{LossKind, WeightInit};
    use approx::assert_relative_eq;
    use ndarray::{arr2, Array2};

    fn two_task_model() -> MultiTaskNetwork {
        let tasks = TaskSpec::from_pairs([
            ("a", TaskKind::Classification),
            ("b", TaskKind::Regression),
        ])
        .unwrap();
        let params = ModelParams::new(3).hidden(8).learning_rate(0.1);
        MultiTaskNetwork::new(tasks, params).unwrap()
    }

    #[test]
    fn test_construction_builds_heads_in_task_order() {
        let model = two_task_model();
        let config = model.raw().unwrap().config();
        assert_eq!(config.heads.len(), 2);

        // "a" (classification) sorts first
        assert_eq!(config.heads[0].name, "dense_head0");
        assert_eq!(config.heads[0].output, "task0");
        assert_eq!(config.heads[0].width, 2);
        assert_eq!(config.heads[0].loss, LossKind::BinaryCrossEntropy);

        assert_eq!(config.heads[1].output, "task1");
        assert_eq!(config.heads[1].width, 1);
        assert_eq!(config.heads[1].loss, LossKind::MeanSquaredError);
    }

    #[test]
    fn test_pack_inputs_without_labels_is_input_only() {
        let model = two_task_model();
        let x = Array2::ones((5, 3));
        let data = model.pack_inputs(&x, None);
        assert_eq!(data.len(), 1);
        assert!(data.contains_key("input"));
    }

    #[test]
    fn test_pack_inputs_with_labels() {
        let model = two_task_model();
        let x = Array2::ones((4, 3));
        let y = arr2(&[[0.0, 1.5], [1.0, 2.0], [0.0, 0.5], [1.0, 3.0]]);
        let data = model.pack_inputs(&x, Some(&y));

        assert_eq!(data.len(), 3);
        // Classification column becomes one-hot
        assert_eq!(
            data["task0"],
            arr2(&[[1.0, 0.0], [0.0, 1.0], [1.0, 0.0], [0.0, 1.0]])
        );
        // Regression column passes through as [n, 1]
        assert_eq!(data["task1"], arr2(&[[1.5], [2.0], [0.5], [3.0]]));
    }

    #[test]
    fn test_pack_sample_weights_splits_columns() {
        let model = two_task_model();
        let w = arr2(&[[1.0, 0.0], [0.5, 2.0]]);
        let weights = model.pack_sample_weights(&w);
        assert_eq!(weights["task0"].to_vec(), vec![1.0, 0.5]);
        assert_eq!(weights["task1"].to_vec(), vec![0.0, 2.0]);
    }

    #[test]
    fn test_fit_applies_weight_epsilon() {
        // All-zero user weights would make every weighted loss 0/0; the
        // epsilon keeps the training step finite.
        let mut model = two_task_model();
        let x = Array2::ones((4, 3));
        let y = arr2(&[[0.0, 1.5], [1.0, 2.0], [0.0, 0.5], [1.0, 3.0]]);
        let w = Array2::zeros((4, 2));

        let loss = model.fit_on_batch(&x, &y, &w).unwrap();
        assert!(loss.is_finite());
    }

    #[test]
    fn test_single_task_prediction_collapses_to_vector() {
        let tasks = TaskSpec::from_pairs([("only", TaskKind::Regression)]).unwrap();
        let params = ModelParams::new(3).hidden(4).init(WeightInit::Zeros);
        let mut model = MultiTaskNetwork::new(tasks, params).unwrap();

        let x = Array2::ones((6, 3));
        let pred = model.predict_on_batch(&x).unwrap();
        assert_eq!(pred.shape(), &[6]);
    }

    #[test]
    fn test_two_task_prediction_shape() {
        let mut model = two_task_model();
        let x = Array2::ones((5, 3));
        let pred = model.predict_on_batch(&x).unwrap();
        assert_eq!(pred.shape(), &[5, 2]);
        // Classification column holds class indices
        for &v in pred.index_axis(Axis(1), 0).iter() {
            assert!(v == 0.0 || v == 1.0);
        }
    }

    #[test]
    fn test_uninitialized_model_errors() {
        let tasks = TaskSpec::from_pairs([("t", TaskKind::Regression)]).unwrap();
        let params = ModelParams::new(2);
        let mut model =
            MultiTaskNetwork::build("multitask_dnn", tasks, params, false).unwrap();

        let x = Array2::ones((1, 2));
        let err = model.predict_on_batch(&x).unwrap_err();
        assert!(matches!(err, ModelError::NotInitialized));
    }

    #[test]
    fn test_zero_init_regression_predicts_bias() {
        // With all-zero weights the network output is exactly the (zero)
        // bias, which pins down the numeric path end to end.
        let tasks = TaskSpec::from_pairs([("t", TaskKind::Regression)]).unwrap();
        let params = ModelParams::new(2).hidden(4).init(WeightInit::Zeros);
        let mut model = MultiTaskNetwork::new(tasks, params).unwrap();

        let x = arr2(&[[3.0, -1.0], [0.5, 2.5]]);
        let pred = model.predict_on_batch(&x).unwrap();
        for &v in pred.iter() {
            assert_relative_eq!(v, 0.0, epsilon = 1e-12);
        }
    }
}
