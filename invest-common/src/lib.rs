//! InVEST Common
//!
//! Model registry, argument specifications and validation, datastack I/O,
//! vector probing and script generation used by the workbench UI server.

pub mod datastack;
pub mod registry;
pub mod script;
pub mod spec;
pub mod validation;
pub mod vector;

pub use datastack::{DatastackError, DatastackType, ParameterSet};
pub use registry::{
    ModelDefinition, ModelEntry, ModelListing, ModelRegistry, RegistryError, ValidateFn,
};
pub use spec::{ArgSpec, ArgType, ArgsSpec, Requirement, ValidationOptions};
pub use validation::{Args, ValidationWarning};
pub use vector::VectorError;

/// Version written into parameter sets and generated scripts.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
