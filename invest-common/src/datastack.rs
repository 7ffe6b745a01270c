//! Datastacks: saved model arguments plus metadata.
//!
//! Three on-disk forms are understood:
//! - parameter sets, JSON files with `args`, `model_name` and `invest_version`;
//! - archives, gzip-compressed tarballs holding a parameter set named
//!   [`DATASTACK_PARAMETER_FILENAME`];
//! - model logfiles, whose header lists the arguments of the run.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::{Number, Value};

use crate::validation::Args;
use crate::VERSION;

pub const DATASTACK_PARAMETER_FILENAME: &str = "parameters.invest.json";

const ARGS_MARKER: &str = "Arguments for InVEST ";
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Errors raised while reading or writing datastacks.
#[derive(Debug, thiserror::Error)]
pub enum DatastackError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid parameter set {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Archive {0} does not contain a parameter set")]
    MissingParameters(PathBuf),

    #[error("No arguments could be parsed from {0}")]
    NoArguments(PathBuf),
}

impl DatastackError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| DatastackError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn json(path: &Path) -> impl FnOnce(serde_json::Error) -> Self + '_ {
        move |source| DatastackError::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, DatastackError>;

/// Which form a datastack file took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatastackType {
    Archive,
    Json,
    Logfile,
}

impl std::fmt::Display for DatastackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatastackType::Archive => write!(f, "archive"),
            DatastackType::Json => write!(f, "json"),
            DatastackType::Logfile => write!(f, "logfile"),
        }
    }
}

/// Arguments of one model run and the model they belong to.
///
/// Field order matches the sorted key order of written parameter sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    pub args: Args,
    pub invest_version: String,
    /// Module name of the model, e.g. `natcap.invest.carbon`.
    pub model_name: String,
}

/// Detect the form of `path` and read its parameters.
///
/// Archives are recognized by their gzip header; anything else is tried as
/// a JSON parameter set and then as a logfile.
pub fn get_datastack_info(path: &Path) -> Result<(DatastackType, ParameterSet)> {
    if is_gzip(path)? {
        return Ok((DatastackType::Archive, extract_archive_parameters(path)?));
    }
    match extract_parameter_set(path) {
        Ok(params) => return Ok((DatastackType::Json, params)),
        Err(DatastackError::Json { .. }) => {}
        Err(e) => return Err(e),
    }
    Ok((DatastackType::Logfile, extract_parameters_from_logfile(path)?))
}

/// Write `args` for `model_name` as a parameter set at `path`.
///
/// String args naming existing files or directories are normalized and
/// written with forward slashes. With `relative`, they are rewritten
/// relative to the parameter set's directory.
pub fn build_parameter_set(
    args: &Args,
    model_name: &str,
    path: &Path,
    relative: bool,
) -> Result<()> {
    let cwd = std::env::current_dir().map_err(DatastackError::io(path))?;
    let base_dir = normalize(&cwd.join(path))
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| cwd.clone());

    let args = args
        .iter()
        .map(|(key, value)| {
            let value = map_strings(value, &|s: &str| {
                portable_path(s, &cwd, &base_dir, relative)
            });
            (key.clone(), value)
        })
        .collect();

    let params = ParameterSet {
        args,
        invest_version: VERSION.to_string(),
        model_name: model_name.to_string(),
    };

    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    params
        .serialize(&mut serializer)
        .map_err(DatastackError::json(path))?;
    fs::write(path, buf).map_err(DatastackError::io(path))?;

    tracing::debug!("Wrote parameter set for {} to {}", model_name, path.display());
    Ok(())
}

/// Read a parameter set, resolving relative paths against its directory.
pub fn extract_parameter_set(path: &Path) -> Result<ParameterSet> {
    let file = File::open(path).map_err(DatastackError::io(path))?;
    let mut params: ParameterSet =
        serde_json::from_reader(BufReader::new(file)).map_err(DatastackError::json(path))?;

    let cwd = std::env::current_dir().map_err(DatastackError::io(path))?;
    let base_dir = normalize(&cwd.join(path))
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or(cwd);

    params.args = params
        .args
        .iter()
        .map(|(key, value)| {
            let value = map_strings(value, &|s: &str| resolve_path(s, &base_dir));
            (key.clone(), value)
        })
        .collect();
    Ok(params)
}

/// Read the argument listing from a model logfile.
///
/// The listing starts at the line containing
/// `Arguments for InVEST <module> <version>:` and runs to the next blank
/// line, one `key value` pair per line.
pub fn extract_parameters_from_logfile(path: &Path) -> Result<ParameterSet> {
    let text = fs::read_to_string(path).map_err(DatastackError::io(path))?;
    let mut lines = text.lines();

    let header = lines
        .by_ref()
        .find_map(|line| line.find(ARGS_MARKER).map(|idx| &line[idx + ARGS_MARKER.len()..]))
        .ok_or_else(|| DatastackError::NoArguments(path.to_path_buf()))?;
    let mut header_parts = header.split_whitespace();
    let model_name = header_parts.next().unwrap_or_default().to_string();
    let invest_version = header_parts
        .next()
        .unwrap_or_default()
        .trim_end_matches(':')
        .to_string();

    let mut args = Args::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        let (key, value) = line
            .split_once(char::is_whitespace)
            .unwrap_or((line, ""));
        args.insert(key.to_string(), parse_literal(value.trim()));
    }

    if args.is_empty() || model_name.is_empty() {
        return Err(DatastackError::NoArguments(path.to_path_buf()));
    }
    Ok(ParameterSet {
        args,
        invest_version,
        model_name,
    })
}

/// Read the parameter set out of a `.tar.gz` datastack archive.
///
/// Paths inside the archive stay relative; nothing is extracted to disk.
pub fn extract_archive_parameters(path: &Path) -> Result<ParameterSet> {
    let file = File::open(path).map_err(DatastackError::io(path))?;
    let mut archive = tar::Archive::new(GzDecoder::new(BufReader::new(file)));

    for entry in archive.entries().map_err(DatastackError::io(path))? {
        let mut entry = entry.map_err(DatastackError::io(path))?;
        let is_parameters = {
            let entry_path = entry.path().map_err(DatastackError::io(path))?;
            let mut normal = entry_path
                .components()
                .filter(|c| !matches!(c, Component::CurDir));
            matches!(
                (normal.next(), normal.next()),
                (Some(Component::Normal(name)), None) if name == DATASTACK_PARAMETER_FILENAME
            )
        };
        if is_parameters {
            let mut text = String::new();
            entry
                .read_to_string(&mut text)
                .map_err(DatastackError::io(path))?;
            return serde_json::from_str(&text).map_err(DatastackError::json(path));
        }
    }
    Err(DatastackError::MissingParameters(path.to_path_buf()))
}

fn is_gzip(path: &Path) -> Result<bool> {
    let mut file = File::open(path).map_err(DatastackError::io(path))?;
    let mut magic = [0u8; 2];
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(magic == GZIP_MAGIC),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(DatastackError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Apply `f` to every string inside `value`, recursing into lists and maps.
fn map_strings(value: &Value, f: &dyn Fn(&str) -> Option<String>) -> Value {
    match value {
        Value::String(s) => Value::String(f(s).unwrap_or_else(|| s.clone())),
        Value::Array(items) => Value::Array(items.iter().map(|v| map_strings(v, f)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), map_strings(v, f)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn portable_path(value: &str, cwd: &Path, base_dir: &Path, relative: bool) -> Option<String> {
    if value.is_empty() || !Path::new(value).exists() {
        return None;
    }
    let normalized = normalize(Path::new(value));
    if relative {
        let absolute = normalize(&cwd.join(&normalized));
        if let Some(rel) = relative_to(&absolute, base_dir) {
            return Some(forward_slashes(&rel));
        }
    }
    Some(forward_slashes(&normalized))
}

fn resolve_path(value: &str, base_dir: &Path) -> Option<String> {
    if value.is_empty() || Path::new(value).is_absolute() {
        return None;
    }
    let candidate = base_dir.join(value);
    candidate
        .exists()
        .then(|| normalize(&candidate).display().to_string())
}

/// Lexically collapse `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// `target` expressed relative to `base`; `None` across prefixes (drives).
fn relative_to(target: &Path, base: &Path) -> Option<PathBuf> {
    let target: Vec<_> = target.components().collect();
    let base: Vec<_> = base.components().collect();
    if target.first() != base.first() {
        return None;
    }
    let common = target
        .iter()
        .zip(base.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..base.len() {
        rel.push("..");
    }
    for component in &target[common..] {
        rel.push(component.as_os_str());
    }
    if rel.as_os_str().is_empty() {
        rel.push(".");
    }
    Some(rel)
}

fn forward_slashes(path: &Path) -> String {
    path.to_string_lossy()
        .replace(std::path::MAIN_SEPARATOR, "/")
}

/// Interpret a logged value as a literal where possible.
fn parse_literal(raw: &str) -> Value {
    match raw {
        "True" => return Value::Bool(true),
        "False" => return Value::Bool(false),
        "None" => return Value::Null,
        _ => {}
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Some(n) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    let quoted = raw.len() >= 2
        && ((raw.starts_with('\'') && raw.ends_with('\''))
            || (raw.starts_with('"') && raw.ends_with('"')));
    if quoted {
        return Value::String(raw[1..raw.len() - 1].to_string());
    }
    Value::String(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use serde_json::json;
    use tempfile::TempDir;

    fn args(value: Value) -> Args {
        match value {
            Value::Object(map) => map,
            _ => panic!("args must be an object"),
        }
    }

    #[test]
    fn test_parameter_set_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("carbon.invest.json");
        let original = args(json!({
            "workspace_dir": "/nonexistent/workspace",
            "results_suffix": "run1",
            "do_valuation": true,
            "discount_rate": 7.5,
            "nested": {"list": [1, 2, "x"]}
        }));

        build_parameter_set(&original, "natcap.invest.carbon", &path, false).unwrap();
        let params = extract_parameter_set(&path).unwrap();

        assert_eq!(params.model_name, "natcap.invest.carbon");
        assert_eq!(params.invest_version, VERSION);
        assert_eq!(params.args, original);
    }

    #[test]
    fn test_parameter_set_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("p.invest.json");
        build_parameter_set(&args(json!({"b": 1, "a": 2})), "m", &path, false).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("{\n    \"args\": {\n        \"a\": 2,"));
        let args_pos = text.find("\"args\"").unwrap();
        let version_pos = text.find("\"invest_version\"").unwrap();
        let model_pos = text.find("\"model_name\"").unwrap();
        assert!(args_pos < version_pos && version_pos < model_pos);
    }

    #[test]
    fn test_relative_paths() {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("data");
        fs::create_dir(&data_dir).unwrap();
        let lulc = data_dir.join("lulc.tif");
        fs::write(&lulc, b"raster").unwrap();

        let saved_dir = dir.path().join("saved");
        fs::create_dir(&saved_dir).unwrap();
        let path = saved_dir.join("p.invest.json");

        let original = args(json!({"lulc_path": lulc.to_str().unwrap()}));
        build_parameter_set(&original, "natcap.invest.carbon", &path, true).unwrap();

        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["args"]["lulc_path"], "../data/lulc.tif");

        let params = extract_parameter_set(&path).unwrap();
        let resolved = PathBuf::from(params.args["lulc_path"].as_str().unwrap());
        assert_eq!(resolved, normalize(&lulc));
    }

    #[test]
    fn test_logfile() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("InVEST-carbon-log.txt");
        fs::write(
            &path,
            "07/20/2017 16:37:48  natcap.invest.ui.model INFO \
             Arguments for InVEST natcap.invest.carbon 3.3.0.post12:\n\
             calc_sequestration               True\n\
             discount_rate                    -7.1\n\
             lulc_cur_year                    2016\n\
             results_suffix                   'foo bar'\n\
             workspace_dir                    /Users/x/carbon workspace\n\
             \n\
             07/20/2017 16:37:48  natcap.invest.carbon INFO Starting\n",
        )
        .unwrap();

        let params = extract_parameters_from_logfile(&path).unwrap();
        assert_eq!(params.model_name, "natcap.invest.carbon");
        assert_eq!(params.invest_version, "3.3.0.post12");
        assert_eq!(
            Value::Object(params.args),
            json!({
                "calc_sequestration": true,
                "discount_rate": -7.1,
                "lulc_cur_year": 2016,
                "results_suffix": "foo bar",
                "workspace_dir": "/Users/x/carbon workspace"
            })
        );
    }

    #[test]
    fn test_logfile_without_arguments() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.txt");
        fs::write(&path, "nothing to see here\n").unwrap();
        assert!(matches!(
            extract_parameters_from_logfile(&path),
            Err(DatastackError::NoArguments(_))
        ));
    }

    fn write_archive(path: &Path, members: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        for (name, body) in members {
            let mut header = tar::Header::new_gnu();
            header.set_size(body.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, body.as_bytes()).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_get_datastack_info_detects_each_form() {
        let dir = TempDir::new().unwrap();
        let params = json!({
            "args": {"workspace_dir": "ws"},
            "invest_version": "3.9.0",
            "model_name": "natcap.invest.sdr.sdr"
        })
        .to_string();

        let archive = dir.path().join("stack.invs.tar.gz");
        write_archive(
            &archive,
            &[("data/dem.tif", "raster"), ("./parameters.invest.json", params.as_str())],
        );
        let (kind, info) = get_datastack_info(&archive).unwrap();
        assert_eq!(kind, DatastackType::Archive);
        assert_eq!(info.model_name, "natcap.invest.sdr.sdr");
        assert_eq!(info.args["workspace_dir"], "ws");

        let json_path = dir.path().join("p.invest.json");
        fs::write(&json_path, &params).unwrap();
        let (kind, _) = get_datastack_info(&json_path).unwrap();
        assert_eq!(kind, DatastackType::Json);

        let log_path = dir.path().join("log.txt");
        fs::write(
            &log_path,
            "Arguments for InVEST natcap.invest.sdr.sdr 3.9.0:\nworkspace_dir ws\n",
        )
        .unwrap();
        let (kind, info) = get_datastack_info(&log_path).unwrap();
        assert_eq!(kind, DatastackType::Logfile);
        assert_eq!(info.args["workspace_dir"], "ws");
    }

    #[test]
    fn test_archive_without_parameters() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("stack.invs.tar.gz");
        write_archive(&archive, &[("data/dem.tif", "raster")]);
        assert!(matches!(
            get_datastack_info(&archive),
            Err(DatastackError::MissingParameters(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            get_datastack_info(&dir.path().join("missing.json")),
            Err(DatastackError::Io { .. })
        ));
    }

    #[test]
    fn test_parse_literal() {
        assert_eq!(parse_literal("None"), Value::Null);
        assert_eq!(parse_literal("42"), json!(42));
        assert_eq!(parse_literal("0.25"), json!(0.25));
        assert_eq!(parse_literal("\"quoted\""), json!("quoted"));
        assert_eq!(parse_literal("nan"), json!("nan"));
        assert_eq!(parse_literal("plain text"), json!("plain text"));
    }

    #[test]
    fn test_relative_to() {
        assert_eq!(
            relative_to(Path::new("/a/b/c.tif"), Path::new("/a/d")),
            Some(PathBuf::from("../b/c.tif"))
        );
        assert_eq!(
            relative_to(Path::new("/a/b"), Path::new("/a/b")),
            Some(PathBuf::from("."))
        );
        assert_eq!(normalize(Path::new("a/./b/../c")), PathBuf::from("a/c"));
    }
}
