//! Model registry.
//!
//! The registry is built once at startup from the built-in model catalog
//! (plus an optional directory of extra definitions) and is read-only
//! afterwards. Each entry carries its validation function directly, so
//! lookups never need to resolve code by name at request time.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::spec::ArgsSpec;
use crate::validation::{self, Args, ValidationWarning};

/// Signature shared by all model validation functions.
pub type ValidateFn = fn(&ArgsSpec, &Args, Option<&str>) -> Vec<ValidationWarning>;

const BUILTIN_MODELS: &[(&str, &str)] = &[
    ("carbon.json", include_str!("../models/carbon.json")),
    ("delineateit.json", include_str!("../models/delineateit.json")),
    ("sdr.json", include_str!("../models/sdr.json")),
];

/// Errors raised while building the registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Duplicate model: {0}")]
    Duplicate(String),

    #[error("Invalid model definition {name}: {source}")]
    InvalidDefinition {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Model {run_name} declares module {declared} but its args spec names {spec}")]
    ModuleMismatch {
        run_name: String,
        declared: String,
        spec: String,
    },

    #[error("Failed to read model catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// On-disk description of one model.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelDefinition {
    /// Key used by the command line and the workbench, e.g. `carbon`.
    pub run_name: String,
    pub human_name: String,
    /// Import path, e.g. `natcap.invest.carbon`.
    pub module: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub args_spec: Value,
}

/// A registered model.
#[derive(Debug, Clone)]
pub struct ModelEntry {
    pub run_name: String,
    pub human_name: String,
    pub module_name: String,
    pub aliases: Vec<String>,
    pub args_spec: ArgsSpec,
    raw_spec: Value,
    validate_fn: ValidateFn,
}

impl ModelEntry {
    /// The args spec exactly as declared.
    pub fn raw_spec(&self) -> &Value {
        &self.raw_spec
    }

    /// Run the model's validation function.
    pub fn validate(&self, args: &Args, limit_to: Option<&str>) -> Vec<ValidationWarning> {
        (self.validate_fn)(&self.args_spec, args, limit_to)
    }
}

/// Entry of the `/models` listing, keyed by human name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelListing {
    pub model_name: String,
    pub aliases: Vec<String>,
}

/// Immutable catalog of models keyed by run name.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: BTreeMap<String, ModelEntry>,
    modules: HashMap<String, String>,
    /// `/models` is keyed by human name, so these must be unique too.
    human_names: HashSet<String>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in models.
    pub fn builtin() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for (name, source) in BUILTIN_MODELS {
            let definition = parse_definition(name, source)?;
            registry.register(definition, validation::validate)?;
        }
        Ok(registry)
    }

    /// Built-in models plus every `*.json` definition in `catalog_dir`.
    pub fn load(catalog_dir: Option<&Path>) -> Result<Self, RegistryError> {
        let mut registry = Self::builtin()?;
        let Some(dir) = catalog_dir else {
            return Ok(registry);
        };

        let io_err = |source| RegistryError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            let source = fs::read_to_string(&path).map_err(|source| RegistryError::Io {
                path: path.clone(),
                source,
            })?;
            let definition = parse_definition(&path.display().to_string(), &source)?;
            tracing::info!(
                "Loaded model {} from {}",
                definition.run_name,
                path.display()
            );
            registry.register(definition, validation::validate)?;
        }
        Ok(registry)
    }

    /// Add a model. Run names, module names and human names must be unique.
    pub fn register(
        &mut self,
        definition: ModelDefinition,
        validate_fn: ValidateFn,
    ) -> Result<(), RegistryError> {
        if self.models.contains_key(&definition.run_name) {
            return Err(RegistryError::Duplicate(definition.run_name));
        }
        if self.modules.contains_key(&definition.module) {
            return Err(RegistryError::Duplicate(definition.module));
        }
        if self.human_names.contains(&definition.human_name) {
            return Err(RegistryError::Duplicate(definition.human_name));
        }

        let args_spec: ArgsSpec = serde_json::from_value(definition.args_spec.clone())
            .map_err(|source| RegistryError::InvalidDefinition {
                name: definition.run_name.clone(),
                source,
            })?;
        if args_spec.module != definition.module {
            return Err(RegistryError::ModuleMismatch {
                run_name: definition.run_name,
                declared: definition.module,
                spec: args_spec.module,
            });
        }

        self.modules
            .insert(definition.module.clone(), definition.run_name.clone());
        self.human_names.insert(definition.human_name.clone());
        self.models.insert(
            definition.run_name.clone(),
            ModelEntry {
                run_name: definition.run_name,
                human_name: definition.human_name,
                module_name: definition.module,
                aliases: definition.aliases,
                args_spec,
                raw_spec: definition.args_spec,
                validate_fn,
            },
        );
        Ok(())
    }

    /// Look up a model by run name.
    pub fn get(&self, run_name: &str) -> Option<&ModelEntry> {
        self.models.get(run_name)
    }

    /// Look up a model by module name.
    pub fn by_module(&self, module_name: &str) -> Option<&ModelEntry> {
        self.modules
            .get(module_name)
            .and_then(|run_name| self.models.get(run_name))
    }

    /// All models in run-name order.
    pub fn iter(&self) -> impl Iterator<Item = &ModelEntry> {
        self.models.values()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Listing served by `/models`: human name -> run name and aliases.
    pub fn model_list(&self) -> BTreeMap<String, ModelListing> {
        self.iter()
            .map(|entry| {
                (
                    entry.human_name.clone(),
                    ModelListing {
                        model_name: entry.run_name.clone(),
                        aliases: entry.aliases.clone(),
                    },
                )
            })
            .collect()
    }
}

fn parse_definition(name: &str, source: &str) -> Result<ModelDefinition, RegistryError> {
    serde_json::from_str(source).map_err(|source| RegistryError::InvalidDefinition {
        name: name.to_string(),
        source,
    })
}
