//! Model Persistence
//!
//! A saved model is a directory holding three artifacts with a shared base
//! filename: `model.meta` (registered type name, task specification, and
//! hyperparameters as JSON), `model.json` (the network architecture
//! description), and `model.h5` (the binary weight blob). Architecture and
//! weights are stored separately; together they reconstruct a network with
//! identical inference behavior. Writes are blocking and there is no
//! partial-write recovery.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::multitask::MultiTaskNetwork;
use super::params::ModelParams;
use super::registry::ModelRegistry;
use super::task::TaskSpec;
use super::ModelError;
use crate::nn::{GraphConfig, GraphNetwork, LayerWeights};

/// Filename of the model metadata artifact inside a model directory
pub const META_FILENAME: &str = "model.meta";

/// Shared base filename (extension-stripped) for the artifact pair
pub fn model_basename(dir: &Path) -> PathBuf {
    dir.join("model")
}

/// Metadata needed to rebuild a wrapper before its network is loaded
#[derive(Debug, Serialize, Deserialize)]
struct ModelMeta {
    model_type: String,
    tasks: TaskSpec,
    params: ModelParams,
}

impl MultiTaskNetwork {
    /// Save the model into `dir` (created if missing): metadata first, then
    /// the architecture description as `<base>.json` and the weight blob as
    /// `<base>.h5`, overwriting any existing weight file.
    pub fn save(&self, dir: &Path) -> Result<(), ModelError> {
        let graph = self.raw().ok_or(ModelError::NotInitialized)?;
        std::fs::create_dir_all(dir)?;

        let meta = ModelMeta {
            model_type: self.type_name().to_string(),
            tasks: self.tasks().clone(),
            params: self.params().clone(),
        };
        let mut meta_file = File::create(dir.join(META_FILENAME))?;
        meta_file.write_all(serde_json::to_string_pretty(&meta)?.as_bytes())?;

        let base = model_basename(dir);
        let arch_file = File::create(base.with_extension("json"))?;
        serde_json::to_writer_pretty(BufWriter::new(arch_file), graph.config())?;

        let weights_file = File::create(base.with_extension("h5"))?;
        bincode::serialize_into(BufWriter::new(weights_file), &graph.weights())?;

        log::info!("saved {} model to {}", self.type_name(), dir.display());
        Ok(())
    }

    /// Load a model from `dir`: rebuild the wrapper from its metadata via
    /// the registry, reconstruct the network from the architecture
    /// description, and install the persisted weights into it.
    pub fn load(dir: &Path, registry: &ModelRegistry) -> Result<Self, ModelError> {
        let meta_file = File::open(dir.join(META_FILENAME))?;
        let meta: ModelMeta = serde_json::from_reader(BufReader::new(meta_file))?;

        let mut model = registry.create(&meta.model_type, meta.tasks, meta.params, false)?;

        let base = model_basename(dir);
        let arch_file = File::open(base.with_extension("json"))?;
        let config: GraphConfig = serde_json::from_reader(BufReader::new(arch_file))?;
        let mut graph = GraphNetwork::from_config(config);

        let weights_file = File::open(base.with_extension("h5"))?;
        let blob: Vec<LayerWeights> = bincode::deserialize_from(BufReader::new(weights_file))?;
        graph.set_weights(blob)?;

        model.install_raw(graph);
        log::info!("loaded {} model from {}", model.type_name(), dir.display());
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::TaskKind;
    use approx::assert_relative_eq;
    use ndarray::{arr2, Array2};
    use tempfile::tempdir;

    fn trained_model() -> MultiTaskNetwork {
        let tasks = TaskSpec::from_pairs([
            ("activity", TaskKind::Classification),
            ("solubility", TaskKind::Regression),
        ])
        .unwrap();
        let params = ModelParams::new(3).hidden(8).learning_rate(0.1);
        let mut model = MultiTaskNetwork::new(tasks, params).unwrap();

        let x = arr2(&[
            [0.0, 0.1, 0.9],
            [0.1, 0.9, 0.0],
            [0.9, 0.0, 0.1],
            [0.8, 0.8, 0.8],
        ]);
        let y = arr2(&[[0.0, 1.5], [1.0, 2.0], [0.0, 0.5], [1.0, 3.0]]);
        let w = Array2::ones((4, 2));
        for _ in 0..20 {
            model.fit_on_batch(&x, &y, &w).unwrap();
        }
        model
    }

    #[test]
    fn test_save_writes_artifact_pair() {
        let dir = tempdir().unwrap();
        let model = trained_model();
        model.save(dir.path()).unwrap();

        assert!(dir.path().join("model.meta").exists());
        assert!(dir.path().join("model.json").exists());
        assert!(dir.path().join("model.h5").exists());

        // The architecture artifact is valid JSON describing the heads
        let arch = std::fs::read_to_string(dir.path().join("model.json")).unwrap();
        let config: crate::nn::GraphConfig = serde_json::from_str(&arch).unwrap();
        assert_eq!(config.heads.len(), 2);
    }

    #[test]
    fn test_round_trip_preserves_predictions() {
        let dir = tempdir().unwrap();
        let mut model = trained_model();
        model.save(dir.path()).unwrap();

        let registry = ModelRegistry::with_builtins();
        let mut loaded = MultiTaskNetwork::load(dir.path(), &registry).unwrap();
        assert_eq!(loaded.type_name(), model.type_name());
        assert_eq!(loaded.tasks(), model.tasks());

        let x = arr2(&[[0.2, 0.4, 0.6], [0.9, 0.1, 0.5]]);
        let original = model.predict_on_batch(&x).unwrap();
        let reloaded = loaded.predict_on_batch(&x).unwrap();
        assert_eq!(original.shape(), reloaded.shape());
        for (a, b) in original.iter().zip(reloaded.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_save_overwrites_existing_weights() {
        let dir = tempdir().unwrap();
        let model = trained_model();
        std::fs::write(dir.path().join("model.h5"), b"stale").unwrap();
        model.save(dir.path()).unwrap();

        let registry = ModelRegistry::with_builtins();
        assert!(MultiTaskNetwork::load(dir.path(), &registry).is_ok());
    }

    #[test]
    fn test_load_rejects_corrupt_architecture() {
        let dir = tempdir().unwrap();
        let model = trained_model();
        model.save(dir.path()).unwrap();
        std::fs::write(dir.path().join("model.json"), "{not json").unwrap();

        let registry = ModelRegistry::with_builtins();
        let err = MultiTaskNetwork::load(dir.path(), &registry).unwrap_err();
        assert!(matches!(err, ModelError::Format(_)));
    }

    #[test]
    fn test_load_rejects_mismatched_weights() {
        let dir_a = tempdir().unwrap();
        let dir_b = tempdir().unwrap();

        trained_model().save(dir_a.path()).unwrap();

        // A differently shaped model's blob must not load into this one
        let tasks = TaskSpec::from_pairs([("only", TaskKind::Regression)]).unwrap();
        let other = MultiTaskNetwork::new(tasks, ModelParams::new(7).hidden(16)).unwrap();
        other.save(dir_b.path()).unwrap();
        std::fs::copy(
            dir_b.path().join("model.h5"),
            dir_a.path().join("model.h5"),
        )
        .unwrap();

        let registry = ModelRegistry::with_builtins();
        let err = MultiTaskNetwork::load(dir_a.path(), &registry).unwrap_err();
        assert!(matches!(err, ModelError::Graph(_)));
    }

    #[test]
    fn test_load_missing_directory_is_io_error() {
        let registry = ModelRegistry::with_builtins();
        let err =
            MultiTaskNetwork::load(Path::new("/nonexistent/model/dir"), &registry).unwrap_err();
        assert!(matches!(err, ModelError::Io(_)));
    }
}
