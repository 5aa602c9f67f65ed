//! Model Type Registry
//!
//! An explicit map from registered type name to constructor, populated at
//! process initialization. The load path looks the persisted type name up
//! here to rebuild the right model; nothing is registered as an import-time
//! side effect.

use std::collections::HashMap;

use super::multitask::MultiTaskNetwork;
use super::params::ModelParams;
use super::task::TaskSpec;
use super::ModelError;

/// Registered name of the multi-task model type
pub const MULTITASK_DNN: &str = "multitask_dnn";

/// Registered name of the single-task model type. Same behavior as the
/// multi-task model restricted to exactly one task; it exists as a distinct
/// name, not distinct logic.
pub const SINGLETASK_DNN: &str = "singletask_dnn";

/// Constructor registered under a model-type name. The flag says whether to
/// build the network immediately or leave it for the load path to install.
pub type ModelFactory = fn(TaskSpec, ModelParams, bool) -> Result<MultiTaskNetwork, ModelError>;

/// Map from model-type name to constructor
pub struct ModelRegistry {
    factories: HashMap<String, ModelFactory>,
}

impl ModelRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with the built-in model types registered
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(MULTITASK_DNN, multitask_factory);
        registry.register(SINGLETASK_DNN, singletask_factory);
        registry
    }

    /// Register a constructor under a type name, replacing any previous one
    pub fn register(&mut self, name: &str, factory: ModelFactory) {
        self.factories.insert(name.to_string(), factory);
    }

    /// Registered type names
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.factories.keys().map(String::as_str)
    }

    /// Construct a model of the named type
    pub fn create(
        &self,
        name: &str,
        tasks: TaskSpec,
        params: ModelParams,
        initialize: bool,
    ) -> Result<MultiTaskNetwork, ModelError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ModelError::UnknownModelType(name.to_string()))?;
        factory(tasks, params, initialize)
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn multitask_factory(
    tasks: TaskSpec,
    params: ModelParams,
    initialize: bool,
) -> Result<MultiTaskNetwork, ModelError> {
    MultiTaskNetwork::build(MULTITASK_DNN, tasks, params, initialize)
}

fn singletask_factory(
    tasks: TaskSpec,
    params: ModelParams,
    initialize: bool,
) -> Result<MultiTaskNetwork, ModelError> {
    if tasks.len() != 1 {
        return Err(ModelError::InvalidParams(format!(
            "{SINGLETASK_DNN} requires exactly one task, got {}",
            tasks.len()
        )));
    }
    MultiTaskNetwork::build(SINGLETASK_DNN, tasks, params, initialize)
}
