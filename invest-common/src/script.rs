//! Standalone Python scripts that run a model with saved arguments.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Local};
use serde_json::Value;

use crate::validation::Args;
use crate::VERSION;

/// Render the script for `pyname` with `args` as its argument dict.
pub fn render_script(
    modelname: &str,
    pyname: &str,
    args: &Args,
    generated_at: &DateTime<Local>,
) -> String {
    format!(
        "# coding=UTF-8\n\
         # -----------------------------------------------\n\
         # Generated by InVEST {version} on {today}\n\
         # Model: {modelname}\n\
         \n\
         import {pyname}\n\
         \n\
         args = {model_args}\n\
         \n\
         if __name__ == '__main__':\n\
         \x20   {pyname}.execute(args)\n",
        version = VERSION,
        today = generated_at.format("%a %b %e %H:%M:%S %Y"),
        modelname = modelname,
        pyname = pyname,
        model_args = format_args_dict(args),
    )
}

/// Render the script and write it to `path` as UTF-8.
pub fn save_to_python(
    path: &Path,
    modelname: &str,
    pyname: &str,
    args: &Args,
    generated_at: &DateTime<Local>,
) -> io::Result<()> {
    let script = render_script(modelname, pyname, args, generated_at);
    fs::write(path, script)?;
    tracing::debug!("Wrote {} script to {}", modelname, path.display());
    Ok(())
}

/// One key per line, trailing comma, closing brace on its own line.
fn format_args_dict(args: &Args) -> String {
    if args.is_empty() {
        return "{}".to_string();
    }
    let mut out = String::from("{\n");
    for (key, value) in args {
        let _ = writeln!(out, "    {}: {},", py_str(key), py_literal(value));
    }
    out.push('}');
    out
}

/// A JSON value as a Python literal.
fn py_literal(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => py_str(s),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(py_literal).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(map) => {
            let items: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", py_str(k), py_literal(v)))
                .collect();
            format!("{{{}}}", items.join(", "))
        }
    }
}

/// Quote a string the way Python's `repr` does.
fn py_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use tempfile::TempDir;

    fn args(value: Value) -> Args {
        match value {
            Value::Object(map) => map,
            _ => panic!("args must be an object"),
        }
    }

    fn timestamp() -> DateTime<Local> {
        Local.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap()
    }

    #[test]
    fn test_render_script() {
        let script = render_script(
            "carbon",
            "natcap.invest.carbon",
            &args(json!({
                "workspace_dir": "C:\\Users\\me\\ws",
                "do_valuation": true,
                "discount_rate": 7.5,
                "results_suffix": null
            })),
            &timestamp(),
        );

        let expected_args = "args = {\n\
            \x20   'discount_rate': 7.5,\n\
            \x20   'do_valuation': True,\n\
            \x20   'results_suffix': None,\n\
            \x20   'workspace_dir': 'C:\\\\Users\\\\me\\\\ws',\n\
            }\n";
        assert!(script.starts_with("# coding=UTF-8\n"));
        assert!(script.contains(&format!(
            "# Generated by InVEST {} on Thu Mar  4 05:06:07 2021\n",
            VERSION
        )));
        assert!(script.contains("# Model: carbon\n"));
        assert!(script.contains("\nimport natcap.invest.carbon\n"));
        assert!(script.contains(expected_args), "{}", script);
        assert!(
            script.ends_with("if __name__ == '__main__':\n    natcap.invest.carbon.execute(args)\n")
        );
    }

    #[test]
    fn test_empty_args() {
        let script = render_script("m", "pkg.m", &Args::new(), &timestamp());
        assert!(script.contains("args = {}\n"));
    }

    #[test]
    fn test_py_literals() {
        assert_eq!(py_str("it's"), "\"it's\"");
        assert_eq!(py_str("a'b\"c"), "'a\\'b\"c'");
        assert_eq!(py_str("line\nbreak"), "'line\\nbreak'");
        assert_eq!(py_str("caf\u{e9}"), "'caf\u{e9}'");
        assert_eq!(
            py_literal(&json!([1, "x", {"k": false}])),
            "[1, 'x', {'k': False}]"
        );
    }

    #[test]
    fn test_save_to_python() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run_carbon.py");
        save_to_python(
            &path,
            "carbon",
            "natcap.invest.carbon",
            &args(json!({"workspace_dir": "ws"})),
            &timestamp(),
        )
        .unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("    'workspace_dir': 'ws',\n"));
    }

    #[test]
    fn test_save_to_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("run.py");
        assert!(save_to_python(&path, "m", "pkg.m", &Args::new(), &timestamp()).is_err());
    }
}
