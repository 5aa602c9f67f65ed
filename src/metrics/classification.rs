//! Classification metrics for evaluating binary classifiers

use ndarray::ArrayView1;

/// Confusion matrix for binary classification
#[derive(Debug, Clone)]
pub struct ConfusionMatrix {
    /// True positives
    pub tp: usize,
    /// True negatives
    pub tn: usize,
    /// False positives
    pub fp: usize,
    /// False negatives
    pub fn_: usize,
}

impl ConfusionMatrix {
    /// Calculate confusion matrix from predictions
    pub fn from_predictions(y_true: ArrayView1<f64>, y_pred: ArrayView1<f64>) -> Self {
        let mut tp = 0;
        let mut tn = 0;
        let mut fp = 0;
        let mut fn_ = 0;

        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            let t_bool = t >= 0.5;
            let p_bool = p >= 0.5;

            match (t_bool, p_bool) {
                (true, true) => tp += 1,
                (false, false) => tn += 1,
                (false, true) => fp += 1,
                (true, false) => fn_ += 1,
            }
        }

        Self { tp, tn, fp, fn_ }
    }

    /// Total samples
    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }
}

/// Collection of classification metrics
#[derive(Debug, Clone)]
pub struct ClassificationMetrics {
    pub confusion_matrix: ConfusionMatrix,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl ClassificationMetrics {
    /// Calculate all metrics from hard class predictions
    pub fn from_predictions(y_true: ArrayView1<f64>, y_pred: ArrayView1<f64>) -> Self {
        let cm = ConfusionMatrix::from_predictions(y_true, y_pred);
        let total = cm.total() as f64;

        let accuracy = if total > 0.0 {
            (cm.tp + cm.tn) as f64 / total
        } else {
            0.0
        };
        let precision = if cm.tp + cm.fp > 0 {
            cm.tp as f64 / (cm.tp + cm.fp) as f64
        } else {
            0.0
        };
        let recall = if cm.tp + cm.fn_ > 0 {
            cm.tp as f64 / (cm.tp + cm.fn_) as f64
        } else {
            0.0
        };
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            confusion_matrix: cm,
            accuracy,
            precision,
            recall,
            f1,
        }
    }
}
