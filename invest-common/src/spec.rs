//! Argument specification types.
//!
//! An args spec declares every input a model accepts: its display name,
//! description, type and whether it is required. The router returns the raw
//! JSON document untouched; validation works off the typed form below.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared inputs of a single model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgsSpec {
    /// Human readable model name.
    pub model_name: String,
    /// Import path of the model, e.g. `natcap.invest.carbon`.
    pub module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userguide_html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args_with_spatial_overlap: Option<Value>,
    /// Inputs keyed by args key, in declaration order.
    pub args: IndexMap<String, ArgSpec>,
}

/// Declaration of one input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgSpec {
    pub name: String,
    #[serde(default)]
    pub about: String,
    #[serde(rename = "type")]
    pub arg_type: ArgType,
    #[serde(default)]
    pub required: Requirement,
    #[serde(default)]
    pub validation_options: ValidationOptions,
}

/// Kinds of input a model can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgType {
    Directory,
    File,
    Raster,
    Vector,
    Csv,
    Number,
    Ratio,
    Percent,
    Integer,
    Boolean,
    OptionString,
    FreestyleString,
}

impl ArgType {
    /// Whether values of this type name a location on disk.
    pub fn is_path(&self) -> bool {
        matches!(
            self,
            ArgType::Directory | ArgType::File | ArgType::Raster | ArgType::Vector | ArgType::Csv
        )
    }
}

impl std::fmt::Display for ArgType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ArgType::Directory => "directory",
            ArgType::File => "file",
            ArgType::Raster => "raster",
            ArgType::Vector => "vector",
            ArgType::Csv => "csv",
            ArgType::Number => "number",
            ArgType::Ratio => "ratio",
            ArgType::Percent => "percent",
            ArgType::Integer => "integer",
            ArgType::Boolean => "boolean",
            ArgType::OptionString => "option_string",
            ArgType::FreestyleString => "freestyle_string",
        };
        f.write_str(name)
    }
}

/// Whether an input must be provided.
///
/// Either a plain flag or a boolean expression over other args keys,
/// e.g. `"snap_points"` or `"not calc_sequestration"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Requirement {
    Always(bool),
    When(String),
}

impl Default for Requirement {
    fn default() -> Self {
        Requirement::Always(false)
    }
}

/// Extra per-type constraints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationOptions {
    /// Numeric condition such as `value > 0` or `value >= 0 and value <= 1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    /// Allowed values for `option_string` inputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    /// Directory inputs may name a directory that will be created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,
    /// Attribute fields a vector input must carry.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_fields: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_requirement_forms() {
        let always: Requirement = serde_json::from_value(json!(true)).unwrap();
        assert_eq!(always, Requirement::Always(true));

        let when: Requirement = serde_json::from_value(json!("snap_points")).unwrap();
        assert_eq!(when, Requirement::When("snap_points".to_string()));
    }

    #[test]
    fn test_arg_spec_defaults() {
        let spec: ArgSpec = serde_json::from_value(json!({
            "name": "Results suffix",
            "type": "freestyle_string"
        }))
        .unwrap();
        assert_eq!(spec.arg_type, ArgType::FreestyleString);
        assert_eq!(spec.required, Requirement::Always(false));
        assert!(spec.validation_options.options.is_none());
    }

    #[test]
    fn test_args_keep_declaration_order() {
        let spec: ArgsSpec = serde_json::from_value(json!({
            "model_name": "Test",
            "module": "natcap.invest.test",
            "args": {
                "workspace_dir": {"name": "Workspace", "type": "directory", "required": true},
                "b_input": {"name": "B", "type": "number"},
                "a_input": {"name": "A", "type": "number"}
            }
        }))
        .unwrap();
        let keys: Vec<&str> = spec.args.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["workspace_dir", "b_input", "a_input"]);
    }

    #[test]
    fn test_arg_type_display_matches_serde() {
        for ty in [ArgType::OptionString, ArgType::Csv, ArgType::FreestyleString] {
            let json = serde_json::to_value(ty).unwrap();
            assert_eq!(json, Value::String(ty.to_string()));
        }
    }
}
