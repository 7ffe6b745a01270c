//! Spec-driven argument validation.
//!
//! Every registered model validates through a function with the
//! [`ValidateFn`](crate::registry::ValidateFn) signature; [`validate`] is the
//! generic implementation that checks args against the model's [`ArgsSpec`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::spec::{ArgSpec, ArgType, ArgsSpec, Requirement};
use crate::vector::{self, VectorFormat};

/// Model arguments as sent by the workbench.
pub type Args = Map<String, Value>;

pub const MISSING_KEY: &str = "Key is missing from the args dict";
pub const MISSING_VALUE: &str = "Input is required but has no value";
pub const FILE_NOT_FOUND: &str = "File not found";
pub const DIR_NOT_FOUND: &str = "Directory not found";
pub const NOT_A_DIR: &str = "Path must be a directory";
pub const NOT_A_FILE: &str = "Path must be a file";
pub const NOT_A_PATH: &str = "Value must be a path";
pub const NOT_A_VECTOR: &str = "File could not be opened as a vector";
pub const NOT_A_STRING: &str = "Value must be a string";

/// One validation issue: the args keys involved and a message.
///
/// Serializes as `[["key", ...], "message"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationWarning(pub Vec<String>, pub String);

impl ValidationWarning {
    pub fn new(keys: Vec<String>, message: impl Into<String>) -> Self {
        Self(keys, message.into())
    }

    pub fn keys(&self) -> &[String] {
        &self.0
    }

    pub fn message(&self) -> &str {
        &self.1
    }
}

/// Validate `args` against `spec`.
///
/// When `limit_to` is given only that key is checked. Missing required keys
/// and required keys without a value are each reported as one grouped
/// warning; all other issues are reported per key.
pub fn validate(spec: &ArgsSpec, args: &Args, limit_to: Option<&str>) -> Vec<ValidationWarning> {
    let mut missing_keys = Vec::new();
    let mut missing_values = Vec::new();
    let mut invalid = Vec::new();

    let considered = spec
        .args
        .iter()
        .filter(|(key, _)| limit_to.map_or(true, |limit| limit == key.as_str()));

    for (key, arg_spec) in considered {
        let required = is_required(&arg_spec.required, args);
        match args.get(key) {
            None => {
                if required {
                    missing_keys.push(key.clone());
                }
            }
            Some(value) if is_empty(value) => {
                if required {
                    missing_values.push(key.clone());
                }
            }
            Some(value) => {
                if let Some(message) = check_value(arg_spec, value) {
                    invalid.push(ValidationWarning::new(vec![key.clone()], message));
                }
            }
        }
    }

    let mut warnings = Vec::new();
    if !missing_keys.is_empty() {
        missing_keys.sort();
        warnings.push(ValidationWarning::new(missing_keys, MISSING_KEY));
    }
    if !missing_values.is_empty() {
        missing_values.sort();
        warnings.push(ValidationWarning::new(missing_values, MISSING_VALUE));
    }
    warnings.extend(invalid);

    tracing::debug!(model = %spec.module, warnings = warnings.len(), "Validated args");
    warnings
}

/// Evaluate a requirement against the other args.
pub fn is_required(requirement: &Requirement, args: &Args) -> bool {
    match requirement {
        Requirement::Always(flag) => *flag,
        Requirement::When(expression) => evaluate_condition(expression, args),
    }
}

/// Evaluate `a`, `not a`, `a and b`, `a or b` over args truthiness.
///
/// `and` binds tighter than `or`.
fn evaluate_condition(expression: &str, args: &Args) -> bool {
    expression.split(" or ").any(|clause| {
        clause.split(" and ").all(|term| {
            let term = term.trim();
            match term.strip_prefix("not ") {
                Some(key) => !is_truthy(args.get(key.trim())),
                None => is_truthy(args.get(term)),
            }
        })
    })
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().map_or(false, |f| f != 0.0),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Check one non-empty value, returning a message when it is invalid.
fn check_value(arg_spec: &ArgSpec, value: &Value) -> Option<String> {
    let options = &arg_spec.validation_options;
    match arg_spec.arg_type {
        ArgType::Number | ArgType::Ratio | ArgType::Percent | ArgType::Integer => {
            let Some(number) = as_number(value) else {
                return Some(format!(
                    "Value \"{}\" could not be interpreted as a number",
                    display(value)
                ));
            };
            let range_message = match arg_spec.arg_type {
                ArgType::Integer if number.fract() != 0.0 => Some(format!(
                    "Value \"{}\" does not represent an integer",
                    display(value)
                )),
                ArgType::Ratio if !(0.0..=1.0).contains(&number) => Some(format!(
                    "Value \"{}\" should be a ratio between 0 and 1",
                    display(value)
                )),
                ArgType::Percent if !(0.0..=100.0).contains(&number) => Some(format!(
                    "Value \"{}\" should be a percent between 0 and 100",
                    display(value)
                )),
                _ => None,
            };
            range_message.or_else(|| {
                let expression = options.expression.as_deref()?;
                match evaluate_numeric_condition(expression, number) {
                    Some(true) => None,
                    Some(false) => Some(format!("Value does not meet condition {}", expression)),
                    None => {
                        tracing::warn!("Ignoring unparseable condition: {}", expression);
                        None
                    }
                }
            })
        }
        ArgType::Boolean => {
            let ok = match value {
                Value::Bool(_) => true,
                Value::Number(n) => matches!(n.as_f64(), Some(f) if f == 0.0 || f == 1.0),
                Value::String(s) => matches!(
                    s.trim().to_ascii_lowercase().as_str(),
                    "true" | "false" | "1" | "0"
                ),
                _ => false,
            };
            (!ok).then(|| {
                format!(
                    "Value \"{}\" could not be interpreted as a boolean",
                    display(value)
                )
            })
        }
        ArgType::OptionString => {
            let allowed = options.options.as_deref().unwrap_or_default();
            let given = display(value);
            (!allowed.iter().any(|option| *option == given))
                .then(|| format!("Value must be one of: {}", allowed.join(", ")))
        }
        ArgType::FreestyleString => match value {
            Value::String(_) | Value::Number(_) => None,
            _ => Some(NOT_A_STRING.to_string()),
        },
        ArgType::Directory => {
            let Value::String(path) = value else {
                return Some(NOT_A_PATH.to_string());
            };
            let path = Path::new(path);
            if path.exists() {
                (!path.is_dir()).then(|| NOT_A_DIR.to_string())
            } else if options.exists.unwrap_or(true) {
                Some(DIR_NOT_FOUND.to_string())
            } else {
                None
            }
        }
        ArgType::File | ArgType::Raster | ArgType::Csv => {
            let Value::String(path) = value else {
                return Some(NOT_A_PATH.to_string());
            };
            check_file(Path::new(path))
        }
        ArgType::Vector => {
            let Value::String(path) = value else {
                return Some(NOT_A_PATH.to_string());
            };
            let path = Path::new(path);
            check_file(path).or_else(|| check_vector(path, &options.required_fields))
        }
    }
}

fn check_file(path: &Path) -> Option<String> {
    if !path.exists() {
        Some(FILE_NOT_FOUND.to_string())
    } else if path.is_dir() {
        Some(NOT_A_FILE.to_string())
    } else {
        None
    }
}

/// Formats the probe cannot read are accepted as-is.
fn check_vector(path: &Path, required_fields: &[String]) -> Option<String> {
    VectorFormat::from_path(path)?;
    let columns = match vector::column_names(path) {
        Ok(columns) => columns,
        Err(e) => {
            tracing::debug!("Could not open vector {}: {}", path.display(), e);
            return Some(NOT_A_VECTOR.to_string());
        }
    };
    let missing = required_fields.iter().find(|field| {
        !columns
            .iter()
            .any(|column| column.eq_ignore_ascii_case(field))
    })?;
    Some(format!(
        "Expected the field \"{}\" but did not find it",
        missing
    ))
}

/// Evaluate `value OP literal [and value OP literal ...]`.
///
/// Returns `None` when the expression cannot be parsed.
fn evaluate_numeric_condition(expression: &str, value: f64) -> Option<bool> {
    let mut result = true;
    for clause in expression.split(" and ") {
        let tokens: Vec<&str> = clause.split_whitespace().collect();
        let [lhs, op, rhs] = tokens.as_slice() else {
            return None;
        };
        if *lhs != "value" {
            return None;
        }
        let rhs: f64 = rhs.parse().ok()?;
        let holds = match *op {
            ">" => value > rhs,
            ">=" => value >= rhs,
            "<" => value < rhs,
            "<=" => value <= rhs,
            "==" => value == rhs,
            "!=" => value != rhs,
            _ => return None,
        };
        result &= holds;
    }
    Some(result)
}
