//! Train a multi-task network on a CSV dataset
//!
//! Usage: cargo run --bin train -- --data assays.csv --task active=classification --task logp=regression --dir model_dir

use anyhow::{bail, Result};
use multitask_dnn::metrics::{ClassificationMetrics, RegressionMetrics};
use multitask_dnn::model::{ModelParams, ModelRegistry, TaskKind, TaskSpec, MULTITASK_DNN, SINGLETASK_DNN};
use multitask_dnn::nn::{ActivationType, WeightInit};
use multitask_dnn::Dataset;
use ndarray::{Array1, ArrayD, Axis};
use rand::seq::SliceRandom;
use std::path::PathBuf;

fn main() -> Result<()> {
    env_logger::init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    let mut data_path = None;
    let mut model_dir = PathBuf::from("model_dir");
    let mut tasks: Vec<(String, TaskKind)> = Vec::new();
    let mut epochs = 100usize;
    let mut batch_size = 32usize;
    let mut hidden = 64usize;
    let mut dropout = 0.0f64;
    let mut learning_rate = 0.01f64;
    let mut decay = 0.0f64;
    let mut momentum = 0.0f64;
    let mut nesterov = false;
    let mut init = WeightInit::GlorotUniform;
    let mut activation = ActivationType::ReLU;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--data" | "-d" => {
                data_path = args.get(i + 1).cloned();
                i += 2;
            }
            "--dir" | "-o" => {
                model_dir = args.get(i + 1).map(PathBuf::from).unwrap_or(model_dir);
                i += 2;
            }
            "--task" | "-t" => {
                let spec = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow::anyhow!("--task needs name=kind"))?;
                let (name, kind) = spec
                    .split_once('=')
                    .ok_or_else(|| anyhow::anyhow!("--task expects name=kind, got {spec:?}"))?;
                let kind: TaskKind = kind.parse().map_err(anyhow::Error::msg)?;
                tasks.push((name.to_string(), kind));
                i += 2;
            }
            "--epochs" | "-e" => {
                epochs = args.get(i + 1).and_then(|s| s.parse().ok()).unwrap_or(epochs);
                i += 2;
            }
            "--batch" | "-b" => {
                batch_size = args
                    .get(i + 1)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(batch_size);
                i += 2;
            }
            "--hidden" => {
                hidden = args.get(i + 1).and_then(|s| s.parse().ok()).unwrap_or(hidden);
                i += 2;
            }
            "--dropout" => {
                dropout = args.get(i + 1).and_then(|s| s.parse().ok()).unwrap_or(dropout);
                i += 2;
            }
            "--lr" => {
                learning_rate = args
                    .get(i + 1)
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(learning_rate);
                i += 2;
            }
            "--decay" => {
                decay = args.get(i + 1).and_then(|s| s.parse().ok()).unwrap_or(decay);
                i += 2;
            }
            "--momentum" => {
                momentum = args.get(i + 1).and_then(|s| s.parse().ok()).unwrap_or(momentum);
                i += 2;
            }
            "--nesterov" => {
                nesterov = true;
                i += 1;
            }
            "--init" => {
                if let Some(s) = args.get(i + 1) {
                    init = s.parse().map_err(anyhow::Error::msg)?;
                }
                i += 2;
            }
            "--activation" => {
                if let Some(s) = args.get(i + 1) {
                    activation = s.parse().map_err(anyhow::Error::msg)?;
                }
                i += 2;
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            _ => {
                i += 1;
            }
        }
    }

    let Some(data_path) = data_path else {
        print_help();
        bail!("--data is required");
    };
    if tasks.is_empty() {
        print_help();
        bail!("at least one --task name=kind is required");
    }

    let task_spec = TaskSpec::from_pairs(tasks)?;
    let dataset = Dataset::from_csv(data_path.as_ref(), &task_spec)?;
    println!(
        "Loaded {} samples, {} features, {} tasks from {}",
        dataset.n_samples(),
        dataset.n_features(),
        task_spec.len(),
        data_path
    );

    let params = ModelParams::new(dataset.n_features())
        .hidden(hidden)
        .init(init)
        .activation(activation)
        .dropout(dropout)
        .learning_rate(learning_rate)
        .decay(decay)
        .momentum(momentum)
        .nesterov(nesterov);

    let registry = ModelRegistry::with_builtins();
    let type_name = if task_spec.len() == 1 {
        SINGLETASK_DNN
    } else {
        MULTITASK_DNN
    };
    let mut model = registry.create(type_name, task_spec.clone(), params, true)?;
    if let Some(graph) = model.raw() {
        println!("{}", graph.describe());
    }

    // Minibatch training
    let n_samples = dataset.n_samples();
    let mut indices: Vec<usize> = (0..n_samples).collect();
    for epoch in 0..epochs {
        indices.shuffle(&mut rand::thread_rng());

        let mut total_loss = 0.0;
        let mut n_batches = 0;
        for chunk in indices.chunks(batch_size) {
            let (x, y, w) = dataset.batch(chunk);
            total_loss += model.fit_on_batch(&x, &y, &w)?;
            n_batches += 1;
        }

        if (epoch + 1) % 10 == 0 {
            println!(
                "Epoch {}/{}: loss = {:.6}",
                epoch + 1,
                epochs,
                total_loss / n_batches as f64
            );
        }
    }

    // Evaluate on the training table, task by task
    let preds = model.predict_on_batch(&dataset.x)?;
    for (i, (id, kind)) in task_spec.iter().enumerate() {
        let y_true = dataset.y.column(i);
        let y_pred = task_column(&preds, i, task_spec.len());
        match kind {
            TaskKind::Classification => {
                let m = ClassificationMetrics::from_predictions(y_true, y_pred.view());
                println!(
                    "{id}: accuracy {:.3}, precision {:.3}, recall {:.3}, f1 {:.3}",
                    m.accuracy, m.precision, m.recall, m.f1
                );
            }
            TaskKind::Regression => {
                let m = RegressionMetrics::calculate(y_true, y_pred.view());
                println!("{id}: rmse {:.4}, mae {:.4}, r2 {:.3}", m.rmse, m.mae, m.r2);
            }
        }
    }

    model.save(&model_dir)?;
    println!("Model saved to {}", model_dir.display());
    Ok(())
}

/// Column `i` of the prediction matrix, which collapses to a vector when
/// there is a single task
fn task_column(preds: &ArrayD<f64>, i: usize, n_tasks: usize) -> Array1<f64> {
    if n_tasks == 1 {
        preds.iter().copied().collect()
    } else {
        preds.index_axis(Axis(1), i).iter().copied().collect()
    }
}

fn print_help() {
    println!(
        "Train a multi-task network on a CSV dataset\n\
         \n\
         Usage: train --data <csv> --task <name=classification|regression> [--task ...]\n\
         \n\
         Options:\n\
           -d, --data <path>        CSV file with feature, task, and optional w_<task> columns\n\
           -o, --dir <path>         Output model directory (default: model_dir)\n\
           -t, --task <name=kind>   Task column and kind; repeatable\n\
           -e, --epochs <n>         Training epochs (default: 100)\n\
           -b, --batch <n>          Minibatch size (default: 32)\n\
               --hidden <n>         Trunk width (default: 64)\n\
               --dropout <p>        Trunk dropout rate (default: 0.0)\n\
               --lr <f>             Learning rate (default: 0.01)\n\
               --decay <f>          Learning-rate decay (default: 0.0)\n\
               --momentum <f>       SGD momentum (default: 0.0)\n\
               --nesterov           Use Nesterov momentum\n\
               --init <scheme>      glorot_uniform | he_uniform | lecun_uniform | zeros\n\
               --activation <name>  relu | sigmoid | tanh | linear | leaky_relu\n"
    );
}
