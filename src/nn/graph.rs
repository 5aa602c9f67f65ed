//! Multi-Output Graph Network
//!
//! A feedforward network with one shared dense trunk (plus dropout on its
//! output) and any number of named dense output heads, each with its own
//! loss function. Heads are independently connected to the trunk output and
//! exposed as distinct named outputs. Training and inference move data as
//! name-to-array maps, so callers address outputs by name rather than by
//! position.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use super::activation::ActivationType;
use super::init::WeightInit;
use super::layer::DenseLayer;
use super::optimizer::{Optimizer, Sgd};

/// Name of the single graph input in data dicts
pub const INPUT_NAME: &str = "input";

/// Name of the shared trunk layer in weight blobs
pub const TRUNK_NAME: &str = "dense";

const PROB_EPS: f64 = 1e-15;

/// Graph-level errors
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("data dict is missing the \"input\" entry")]
    MissingInput,

    #[error("data dict is missing target for output {0:?}")]
    MissingTarget(String),

    #[error("sample weights are missing entry for output {0:?}")]
    MissingWeight(String),

    #[error("predictions are missing output {0:?}")]
    MissingOutput(String),

    #[error("weight blob has no entry for layer {0:?}")]
    MissingLayer(String),

    #[error("layer {name:?} weights have shape {got:?}, expected {expected:?}")]
    ShapeMismatch {
        name: String,
        expected: (usize, usize),
        got: (usize, usize),
    },

    #[error("layer {name:?} biases have length {got}, expected {expected}")]
    BadBiases {
        name: String,
        expected: usize,
        got: usize,
    },
}

/// Loss function attached to one output head
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum LossKind {
    /// Mean squared error (regression heads)
    MeanSquaredError,
    /// Binary cross-entropy over a two-way softmax (classification heads)
    BinaryCrossEntropy,
}

impl LossKind {
    /// Weighted batch loss: sum(w_i * l_i) / sum(w_i), where l_i is the
    /// per-sample loss averaged over the head's output columns.
    pub fn weighted_loss(&self, pred: &Array2<f64>, target: &Array2<f64>, w: &Array1<f64>) -> f64 {
        let per_sample = match self {
            LossKind::MeanSquaredError => {
                let diff = pred - target;
                (&diff * &diff).mean_axis(Axis(1)).expect("nonempty head")
            }
            LossKind::BinaryCrossEntropy => {
                let p = pred.mapv(|v| v.clamp(PROB_EPS, 1.0 - PROB_EPS));
                let loss = target * &p.mapv(f64::ln) + &(1.0 - target) * &(1.0 - &p).mapv(f64::ln);
                -loss.mean_axis(Axis(1)).expect("nonempty head")
            }
        };
        (&per_sample * w).sum() / w.sum()
    }

    /// Weighted loss gradient, scaled per sample by w_i / sum(w).
    ///
    /// For BinaryCrossEntropy the gradient is the combined softmax +
    /// cross-entropy term (p - t) at the head's pre-activation; the softmax
    /// derivative in the layer is the identity to match.
    pub fn weighted_gradient(
        &self,
        pred: &Array2<f64>,
        target: &Array2<f64>,
        w: &Array1<f64>,
    ) -> Array2<f64> {
        let total = w.sum();
        let scale = w.mapv(|v| v / total).insert_axis(Axis(1));
        let grad = match self {
            LossKind::MeanSquaredError => {
                let width = pred.ncols() as f64;
                (pred - target) * (2.0 / width)
            }
            LossKind::BinaryCrossEntropy => pred - target,
        };
        grad * &scale
    }
}

/// Configuration of one named output head
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeadConfig {
    /// Layer name (e.g. "dense_head0")
    pub name: String,
    /// Output name the head is exposed under (e.g. "task0")
    pub output: String,
    /// Head width (number of output units)
    pub width: usize,
    pub activation: ActivationType,
    pub loss: LossKind,
}

/// Architecture description of a graph network.
///
/// Serialized as the model's `.json` artifact; rebuilding a network from it
/// (plus a weight blob) reproduces the original's inference behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphConfig {
    pub n_inputs: usize,
    pub n_hidden: usize,
    pub init: WeightInit,
    pub activation: ActivationType,
    pub dropout: f64,
    pub heads: Vec<HeadConfig>,
    pub optimizer: Sgd,
}

/// Serialized weights of one layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerWeights {
    pub name: String,
    pub weights: Array2<f64>,
    pub biases: Array1<f64>,
}

/// Shared-trunk multi-headed feedforward network
pub struct GraphNetwork {
    config: GraphConfig,
    trunk: DenseLayer,
    heads: Vec<DenseLayer>,
    // optimizers[0] is the trunk's, optimizers[1 + i] belongs to heads[i]
    optimizers: Vec<Box<dyn Optimizer>>,
}

impl GraphNetwork {
    /// Build a network with freshly initialized weights from a configuration
    pub fn from_config(config: GraphConfig) -> Self {
        let trunk = DenseLayer::new(
            config.n_inputs,
            config.n_hidden,
            config.activation,
            config.init,
        )
        .with_dropout(config.dropout);

        let heads: Vec<DenseLayer> = config
            .heads
            .iter()
            .map(|h| DenseLayer::new(config.n_hidden, h.width, h.activation, config.init))
            .collect();

        let optimizers: Vec<Box<dyn Optimizer>> = (0..heads.len() + 1)
            .map(|_| config.optimizer.clone_box())
            .collect();

        Self {
            config,
            trunk,
            heads,
            optimizers,
        }
    }

    /// The architecture description this network was built from
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// One optimizer step on a single batch.
    ///
    /// `data` holds the input under "input" and one target per output name;
    /// `sample_weight` holds one per-sample weight vector per output name.
    /// Returns the summed weighted loss over all heads.
    pub fn train_on_batch(
        &mut self,
        data: &HashMap<String, Array2<f64>>,
        sample_weight: &HashMap<String, Array1<f64>>,
    ) -> Result<f64, GraphError> {
        let x = data.get(INPUT_NAME).ok_or(GraphError::MissingInput)?;
        let trunk_out = self.trunk.forward(x, true);

        let mut total_loss = 0.0;
        let mut trunk_grad = Array2::zeros(trunk_out.dim());

        for (i, head) in self.heads.iter_mut().enumerate() {
            let cfg = &self.config.heads[i];
            let target = data
                .get(&cfg.output)
                .ok_or_else(|| GraphError::MissingTarget(cfg.output.clone()))?;
            let w = sample_weight
                .get(&cfg.output)
                .ok_or_else(|| GraphError::MissingWeight(cfg.output.clone()))?;

            let pred = head.forward(&trunk_out, true);
            total_loss += cfg.loss.weighted_loss(&pred, target, w);

            let grad = cfg.loss.weighted_gradient(&pred, target, w);
            let (input_grad, weight_grad, bias_grad) = head.backward(&grad);
            self.optimizers[1 + i].update_weights(&mut head.weights, &weight_grad);
            self.optimizers[1 + i].update_biases(&mut head.biases, &bias_grad);

            trunk_grad = trunk_grad + input_grad;
        }

        // Backprop into the shared trunk once, with the heads' summed gradients
        let (_, weight_grad, bias_grad) = self.trunk.backward(&trunk_grad);
        self.optimizers[0].update_weights(&mut self.trunk.weights, &weight_grad);
        self.optimizers[0].update_biases(&mut self.trunk.biases, &bias_grad);

        Ok(total_loss)
    }

    /// Forward inference: returns one prediction array per output name.
    /// Dropout is disabled.
    pub fn predict_on_batch(
        &mut self,
        data: &HashMap<String, Array2<f64>>,
    ) -> Result<HashMap<String, Array2<f64>>, GraphError> {
        let x = data.get(INPUT_NAME).ok_or(GraphError::MissingInput)?;
        let trunk_out = self.trunk.forward(x, false);

        let mut out = HashMap::with_capacity(self.heads.len());
        for (i, head) in self.heads.iter_mut().enumerate() {
            let pred = head.forward(&trunk_out, false);
            out.insert(self.config.heads[i].output.clone(), pred);
        }
        Ok(out)
    }

    /// Snapshot of all layer weights, trunk first
    pub fn weights(&self) -> Vec<LayerWeights> {
        let mut blob = Vec::with_capacity(self.heads.len() + 1);
        blob.push(LayerWeights {
            name: TRUNK_NAME.to_string(),
            weights: self.trunk.weights.clone(),
            biases: self.trunk.biases.clone(),
        });
        for (i, head) in self.heads.iter().enumerate() {
            blob.push(LayerWeights {
                name: self.config.heads[i].name.clone(),
                weights: head.weights.clone(),
                biases: head.biases.clone(),
            });
        }
        blob
    }

    /// Install layer weights from a blob, matching entries by layer name.
    /// Fails without modifying anything if a layer is missing or any shape
    /// disagrees with the architecture.
    pub fn set_weights(&mut self, blob: Vec<LayerWeights>) -> Result<(), GraphError> {
        let mut by_name: HashMap<String, LayerWeights> =
            blob.into_iter().map(|lw| (lw.name.clone(), lw)).collect();

        let mut names = vec![TRUNK_NAME.to_string()];
        names.extend(self.config.heads.iter().map(|h| h.name.clone()));

        // Validate the full blob before touching any layer
        for (idx, name) in names.iter().enumerate() {
            let layer = if idx == 0 { &self.trunk } else { &self.heads[idx - 1] };
            let lw = by_name
                .get(name)
                .ok_or_else(|| GraphError::MissingLayer(name.clone()))?;
            if lw.weights.dim() != layer.weights.dim() {
                return Err(GraphError::ShapeMismatch {
                    name: name.clone(),
                    expected: layer.weights.dim(),
                    got: lw.weights.dim(),
                });
            }
            if lw.biases.len() != layer.biases.len() {
                return Err(GraphError::BadBiases {
                    name: name.clone(),
                    expected: layer.biases.len(),
                    got: lw.biases.len(),
                });
            }
        }

        for (idx, name) in names.iter().enumerate() {
            let lw = by_name.remove(name).expect("validated above");
            let layer = if idx == 0 {
                &mut self.trunk
            } else {
                &mut self.heads[idx - 1]
            };
            layer.weights = lw.weights;
            layer.biases = lw.biases;
        }
        Ok(())
    }

    /// Total number of trainable parameters
    pub fn num_parameters(&self) -> usize {
        self.trunk.num_parameters() + self.heads.iter().map(|h| h.num_parameters()).sum::<usize>()
    }

    /// Human-readable layer summary
    pub fn describe(&self) -> String {
        let mut s = format!(
            "input({}) -> {}({}, {:?}, dropout {})",
            self.config.n_inputs,
            TRUNK_NAME,
            self.config.n_hidden,
            self.config.activation,
            self.config.dropout,
        );
        for h in &self.config.heads {
            s.push_str(&format!(
                "\n  {} -> {} ({} units, {:?}, {:?})",
                h.name, h.output, h.width, h.activation, h.loss
            ));
        }
        s.push_str(&format!("\ntotal parameters: {}", self.num_parameters()));
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{arr1, arr2};

    fn toy_config() -> GraphConfig {
        GraphConfig {
            n_inputs: 3,
            n_hidden: 8,
            init: WeightInit::GlorotUniform,
            activation: ActivationType::ReLU,
            dropout: 0.0,
            heads: vec![
                HeadConfig {
                    name: "dense_head0".to_string(),
                    output: "task0".to_string(),
                    width: 2,
                    activation: ActivationType::Softmax,
                    loss: LossKind::BinaryCrossEntropy,
                },
                HeadConfig {
                    name: "dense_head1".to_string(),
                    output: "task1".to_string(),
                    width: 1,
                    activation: ActivationType::Linear,
                    loss: LossKind::MeanSquaredError,
                },
            ],
            optimizer: Sgd::new(0.1),
        }
    }

    fn toy_batch() -> (HashMap<String, Array2<f64>>, HashMap<String, Array1<f64>>) {
        let mut data = HashMap::new();
        data.insert(
            INPUT_NAME.to_string(),
            arr2(&[
                [0.0, 0.1, 0.9],
                [0.1, 0.9, 0.0],
                [0.9, 0.0, 0.1],
                [0.8, 0.8, 0.8],
            ]),
        );
        data.insert(
            "task0".to_string(),
            arr2(&[[1.0, 0.0], [0.0, 1.0], [1.0, 0.0], [0.0, 1.0]]),
        );
        data.insert("task1".to_string(), arr2(&[[0.5], [1.0], [-0.5], [2.0]]));

        let mut weights = HashMap::new();
        weights.insert("task0".to_string(), arr1(&[1.0, 1.0, 1.0, 1.0]));
        weights.insert("task1".to_string(), arr1(&[1.0, 1.0, 1.0, 1.0]));
        (data, weights)
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = toy_config();
        let json = serde_json::to_string(&config).unwrap();
        let back: GraphConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn test_training_reduces_loss() {
        let mut net = GraphNetwork::from_config(toy_config());
        let (data, weights) = toy_batch();

        let initial = net.train_on_batch(&data, &weights).unwrap();
        let mut last = initial;
        for _ in 0..200 {
            last = net.train_on_batch(&data, &weights).unwrap();
        }
        assert!(
            last < initial,
            "loss did not decrease: {initial} -> {last}"
        );
    }

    #[test]
    fn test_predict_outputs_named_and_shaped() {
        let mut net = GraphNetwork::from_config(toy_config());
        let (data, _) = toy_batch();
        let input = {
            let mut d = HashMap::new();
            d.insert(INPUT_NAME.to_string(), data[INPUT_NAME].clone());
            d
        };

        let preds = net.predict_on_batch(&input).unwrap();
        assert_eq!(preds.len(), 2);
        assert_eq!(preds["task0"].dim(), (4, 2));
        assert_eq!(preds["task1"].dim(), (4, 1));
        // Softmax head rows are probability distributions
        for row in preds["task0"].axis_iter(Axis(0)) {
            assert_relative_eq!(row.sum(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_missing_target_is_an_error() {
        let mut net = GraphNetwork::from_config(toy_config());
        let (mut data, weights) = toy_batch();
        data.remove("task1");

        let err = net.train_on_batch(&data, &weights).unwrap_err();
        assert!(matches!(err, GraphError::MissingTarget(name) if name == "task1"));
    }

    #[test]
    fn test_set_weights_rejects_shape_mismatch() {
        let mut net = GraphNetwork::from_config(toy_config());
        let mut blob = net.weights();
        blob[0].weights = Array2::zeros((5, 5));

        let err = net.set_weights(blob).unwrap_err();
        assert!(matches!(err, GraphError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_set_weights_round_trip() {
        let mut a = GraphNetwork::from_config(toy_config());
        let mut b = GraphNetwork::from_config(toy_config());
        b.set_weights(a.weights()).unwrap();

        let (data, _) = toy_batch();
        let input = {
            let mut d = HashMap::new();
            d.insert(INPUT_NAME.to_string(), data[INPUT_NAME].clone());
            d
        };
        let pa = a.predict_on_batch(&input).unwrap();
        let pb = b.predict_on_batch(&input).unwrap();
        for name in ["task0", "task1"] {
            for (x, y) in pa[name].iter().zip(pb[name].iter()) {
                assert_relative_eq!(*x, *y, epsilon = 1e-12);
            }
        }
    }
}
