//! Output formatters for command reports.
//!
//! Every report is `Serialize`; the format decides only the presentation.

use crate::output::OutputFormat;
use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;

/// Formats `data` in the requested format.
///
/// # Errors
///
/// Returns an error if serialization fails.
///
/// # Examples
///
/// ```
/// use transform_cli::formatters::format_output;
/// use transform_cli::output::OutputFormat;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Kind {
///     ordinal: u32,
///     name: &'static str,
/// }
///
/// let output = format_output(&Kind { ordinal: 0, name: "Identity" }, OutputFormat::Json)?;
/// assert!(output.contains("\"name\": \"Identity\""));
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn format_output<T: Serialize>(data: &T, format: OutputFormat) -> Result<String> {
    let formatted = match format {
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::Text => serde_json::to_string(data)?,
        OutputFormat::Pretty => {
            let mut out = String::new();
            write_pretty(&mut out, &serde_json::to_value(data)?, 0);
            out
        }
    };
    Ok(formatted)
}

fn write_pretty(out: &mut String, value: &Value, indent: usize) {
    let pad = "  ".repeat(indent + 1);
    match value {
        Value::Null => out.push_str(&"null".dimmed().to_string()),
        Value::Bool(b) => out.push_str(&b.to_string().yellow().to_string()),
        Value::Number(n) => out.push_str(&n.to_string().cyan().to_string()),
        Value::String(s) => out.push_str(&format!("\"{}\"", s.green())),
        Value::Array(items) if items.is_empty() => out.push_str("[]"),
        Value::Object(fields) if fields.is_empty() => out.push_str("{}"),
        Value::Array(items) => {
            out.push_str("[\n");
            for (i, item) in items.iter().enumerate() {
                out.push_str(&pad);
                write_pretty(out, item, indent + 1);
                if i + 1 < items.len() {
                    out.push(',');
                }
                out.push('\n');
            }
            out.push_str(&"  ".repeat(indent));
            out.push(']');
        }
        Value::Object(fields) => {
            out.push_str("{\n");
            for (i, (key, field)) in fields.iter().enumerate() {
                out.push_str(&pad);
                out.push_str(&format!("\"{}\": ", key.blue().bold()));
                write_pretty(out, field, indent + 1);
                if i + 1 < fields.len() {
                    out.push(',');
                }
                out.push('\n');
            }
            out.push_str(&"  ".repeat(indent));
            out.push('}');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Report {
        kind: &'static str,
        changed: Vec<&'static str>,
        failed: u32,
        stats: Option<u32>,
    }

    fn report() -> Report {
        Report {
            kind: "TrueToFalse",
            changed: vec!["a.cs", "b.cs"],
            failed: 0,
            stats: None,
        }
    }

    #[test]
    fn test_json_format() {
        let output = format_output(&report(), OutputFormat::Json).unwrap();
        assert!(output.contains("\"kind\": \"TrueToFalse\""));
        assert!(output.contains('\n'));
    }

    #[test]
    fn test_text_format_is_compact() {
        let output = format_output(&report(), OutputFormat::Text).unwrap();
        assert!(!output.contains('\n'));
        assert!(output.contains("\"changed\":[\"a.cs\",\"b.cs\"]"));
    }

    #[test]
    fn test_pretty_format() {
        colored::control::set_override(false);
        let output = format_output(&report(), OutputFormat::Pretty).unwrap();
        assert!(output.contains("\"kind\": \"TrueToFalse\""));
        assert!(output.contains("\"failed\": 0"));
        assert!(output.contains("\"stats\": null"));
        assert!(output.contains("    \"a.cs\",\n"));
    }

    #[test]
    fn test_pretty_empty_containers() {
        colored::control::set_override(false);
        let output = format_output(&Vec::<u32>::new(), OutputFormat::Pretty).unwrap();
        assert_eq!(output, "[]");
    }
}
