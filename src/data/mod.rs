//! Dataset Loading
//!
//! Loads a feature/label/weight table from CSV into the arrays the model
//! trains on. Each task identifier names one label column; an optional
//! `w_<task>` column carries that task's per-sample weights (defaulting to
//! 1.0). Every remaining column is a feature, in file order. Label and
//! weight columns are assembled in sorted-task order so that column `i`
//! always belongs to task `i`.

use ndarray::{Array2, Axis};
use std::path::Path;
use thiserror::Error;

use crate::model::TaskSpec;

/// Dataset loading errors
#[derive(Debug, Error)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing column {0:?}")]
    MissingColumn(String),

    #[error("row {row}: invalid number in column {col:?}: {value:?}")]
    BadValue {
        row: usize,
        col: String,
        value: String,
    },

    #[error("dataset has no feature columns")]
    NoFeatures,

    #[error("dataset has no rows")]
    Empty,
}

/// A loaded batch table: features, per-task labels, per-task weights
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Features, [n_samples, n_features]
    pub x: Array2<f64>,
    /// Labels, [n_samples, n_tasks], columns in sorted-task order
    pub y: Array2<f64>,
    /// Weights, [n_samples, n_tasks], columns in sorted-task order
    pub w: Array2<f64>,
    /// Feature column names in file order
    pub feature_names: Vec<String>,
}

impl Dataset {
    /// Load a dataset from a CSV file with a header row
    pub fn from_csv(path: &Path, tasks: &TaskSpec) -> Result<Self, DataError> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        // Resolve task label and weight columns first; the rest are features
        let mut label_cols = Vec::with_capacity(tasks.len());
        let mut weight_cols = Vec::with_capacity(tasks.len());
        for id in tasks.ids() {
            let col = headers
                .iter()
                .position(|h| h == id)
                .ok_or_else(|| DataError::MissingColumn(id.to_string()))?;
            label_cols.push(col);
            weight_cols.push(headers.iter().position(|h| h == &format!("w_{id}")));
        }

        let reserved: Vec<usize> = label_cols
            .iter()
            .copied()
            .chain(weight_cols.iter().flatten().copied())
            .collect();
        let feature_cols: Vec<usize> = (0..headers.len())
            .filter(|i| !reserved.contains(i))
            .collect();
        if feature_cols.is_empty() {
            return Err(DataError::NoFeatures);
        }

        let parse = |row: usize, record: &csv::StringRecord, col: usize| -> Result<f64, DataError> {
            let raw = &record[col];
            raw.trim().parse::<f64>().map_err(|_| DataError::BadValue {
                row,
                col: headers[col].clone(),
                value: raw.to_string(),
            })
        };

        let mut x_data = Vec::new();
        let mut y_data = Vec::new();
        let mut w_data = Vec::new();
        let mut n_rows = 0usize;

        for (row, record) in reader.records().enumerate() {
            let record = record?;
            for &col in &feature_cols {
                x_data.push(parse(row, &record, col)?);
            }
            for (i, &col) in label_cols.iter().enumerate() {
                y_data.push(parse(row, &record, col)?);
                w_data.push(match weight_cols[i] {
                    Some(wcol) => parse(row, &record, wcol)?,
                    None => 1.0,
                });
            }
            n_rows += 1;
        }
        if n_rows == 0 {
            return Err(DataError::Empty);
        }

        let x = Array2::from_shape_vec((n_rows, feature_cols.len()), x_data)
            .expect("row-major feature buffer matches shape");
        let y = Array2::from_shape_vec((n_rows, tasks.len()), y_data)
            .expect("row-major label buffer matches shape");
        let w = Array2::from_shape_vec((n_rows, tasks.len()), w_data)
            .expect("row-major weight buffer matches shape");

        Ok(Self {
            x,
            y,
            w,
            feature_names: feature_cols
                .iter()
                .map(|&i| headers[i].clone())
                .collect(),
        })
    }

    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    /// Row-select a minibatch by sample indices
    pub fn batch(&self, indices: &[usize]) -> (Array2<f64>, Array2<f64>, Array2<f64>) {
        (
            self.x.select(Axis(0), indices),
            self.y.select(Axis(0), indices),
            self.w.select(Axis(0), indices),
        )
    }
}
