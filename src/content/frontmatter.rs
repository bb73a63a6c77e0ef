//! Front matter extraction for content files.
//!
//! A content file is a metadata block followed by a body. The block is
//! delimited by `+++` (TOML) or `---` (YAML) on its own line:
//!
//! ```text
//! +++
//! title = "Hello"
//! +++
//!
//! Body text.
//! ```
//!
//! Extraction keeps the raw metadata text and its starting line so that
//! validation errors can point at the offending line in the source file.

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value};
use std::path::Path;

/// Metadata block syntax, decided by the opening delimiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaFormat {
    /// TOML front matter delimited by `+++`.
    Toml,
    /// YAML front matter delimited by `---`.
    Yaml,
}

impl MetaFormat {
    const fn delimiter(self) -> &'static str {
        match self {
            Self::Toml => "+++",
            Self::Yaml => "---",
        }
    }
}

/// A content file split into metadata and body.
#[derive(Debug, Clone)]
pub struct Extracted {
    /// Parsed metadata fields (empty when the file has no front matter).
    pub data: Map<String, Value>,
    /// Raw metadata block text, without delimiters.
    pub raw_meta: String,
    /// 1-based line number of the first metadata line in the source file.
    pub meta_line: usize,
    /// Body text after the closing delimiter.
    pub body: String,
}

/// Split a content file and parse its metadata block.
///
/// A file without a recognized opening delimiter is all body with empty
/// metadata. A missing closing delimiter or unparsable block is an error.
pub fn extract(content: &str, path: &Path) -> Result<Extracted> {
    let Some((format, open_line)) = detect_open(content) else {
        return Ok(Extracted {
            data: Map::new(),
            raw_meta: String::new(),
            meta_line: 1,
            body: content.to_owned(),
        });
    };

    let delimiter = format.delimiter();
    let mut meta_lines: Vec<&str> = Vec::new();
    let mut body_lines: Vec<&str> = Vec::new();
    let mut closed = false;

    for (idx, line) in content.lines().enumerate() {
        if idx <= open_line {
            continue;
        }
        // lines() keeps a trailing \r from CRLF endings; drop it
        let line = line.strip_suffix('\r').unwrap_or(line);
        if !closed && line == delimiter {
            closed = true;
            continue;
        }
        if closed {
            body_lines.push(line);
        } else {
            meta_lines.push(line);
        }
    }

    if !closed {
        bail!(
            "unterminated front matter in `{}`: missing closing `{delimiter}`",
            path.display()
        );
    }

    let raw_meta = meta_lines.join("\n");
    let data = parse_meta(format, &raw_meta, path)?;

    Ok(Extracted {
        data,
        raw_meta,
        // lines() is 0-based; metadata starts on the line after the delimiter
        meta_line: open_line + 2,
        body: body_lines.join("\n").trim_start().to_owned(),
    })
}

/// Find the opening delimiter: the first non-empty line must be exactly
/// `+++` or `---`. Returns the format and the 0-based line index.
fn detect_open(content: &str) -> Option<(MetaFormat, usize)> {
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        return match line {
            "+++" => Some((MetaFormat::Toml, idx)),
            "---" => Some((MetaFormat::Yaml, idx)),
            _ => None,
        };
    }
    None
}

/// Parse the raw metadata block into a JSON object.
fn parse_meta(format: MetaFormat, raw: &str, path: &Path) -> Result<Map<String, Value>> {
    let value = match format {
        MetaFormat::Toml => {
            let table: toml::Table = toml::from_str(raw)
                .with_context(|| format!("invalid TOML front matter in `{}`", path.display()))?;
            toml_to_json(toml::Value::Table(table))
        }
        MetaFormat::Yaml => {
            let yaml: serde_yaml::Value = serde_yaml::from_str(raw)
                .with_context(|| format!("invalid YAML front matter in `{}`", path.display()))?;
            yaml_to_json(yaml)
        }
    };

    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => bail!(
            "front matter in `{}` must be a table, found {}",
            path.display(),
            json_kind(&other)
        ),
    }
}

/// Convert a TOML value into JSON. Datetimes become their string form.
pub fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Convert a YAML value into JSON. Non-string mapping keys are stringified.
fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map_or(Value::Null, Value::Number)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => {
            Value::Array(items.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => Value::Object(
            mapping
                .into_iter()
                .map(|(k, v)| {
                    let key = match k {
                        serde_yaml::Value::String(s) => s,
                        other => yaml_to_json(other).to_string(),
                    };
                    (key, yaml_to_json(v))
                })
                .collect(),
        ),
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

/// Human-readable JSON value kind for error messages.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a table",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_front_matter() {
        let content = "+++\ntitle = \"Hello\"\ndraft = false\n+++\n\nBody text.";
        let extracted = extract(content, Path::new("a.md")).unwrap();

        assert_eq!(extracted.data["title"], "Hello");
        assert_eq!(extracted.data["draft"], false);
        assert_eq!(extracted.meta_line, 2);
        assert_eq!(extracted.body, "Body text.");
        assert!(extracted.raw_meta.contains("title = \"Hello\""));
    }

    #[test]
    fn test_yaml_front_matter() {
        let content = "---\ntitle: Hello\ntags:\n  - rust\n  - content\n---\nBody.";
        let extracted = extract(content, Path::new("a.md")).unwrap();

        assert_eq!(extracted.data["title"], "Hello");
        assert_eq!(
            extracted.data["tags"],
            serde_json::json!(["rust", "content"])
        );
        assert_eq!(extracted.body, "Body.");
    }

    #[test]
    fn test_no_front_matter() {
        let extracted = extract("Just a body.", Path::new("a.md")).unwrap();
        assert!(extracted.data.is_empty());
        assert_eq!(extracted.body, "Just a body.");
        assert_eq!(extracted.meta_line, 1);
    }

    #[test]
    fn test_leading_blank_lines_before_delimiter() {
        let content = "\n\n+++\ntitle = \"Late\"\n+++\nBody.";
        let extracted = extract(content, Path::new("a.md")).unwrap();
        assert_eq!(extracted.data["title"], "Late");
        // delimiter on line 3, metadata starts on line 4
        assert_eq!(extracted.meta_line, 4);
    }

    #[test]
    fn test_unterminated_block_is_error() {
        let content = "+++\ntitle = \"Broken\"\n\nBody without closing.";
        assert!(extract(content, Path::new("a.md")).is_err());
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let content = "+++\ntitle = = nope\n+++\nBody.";
        let err = extract(content, Path::new("bad.md")).unwrap_err();
        assert!(format!("{err:#}").contains("bad.md"));
    }

    #[test]
    fn test_empty_block() {
        let content = "+++\n+++\nBody.";
        let extracted = extract(content, Path::new("a.md")).unwrap();
        assert!(extracted.data.is_empty());
        assert_eq!(extracted.body, "Body.");
    }

    #[test]
    fn test_toml_datetime_becomes_string() {
        let content = "+++\ndate = 2024-05-01\n+++\n";
        let extracted = extract(content, Path::new("a.md")).unwrap();
        assert_eq!(extracted.data["date"], "2024-05-01");
    }

    #[test]
    fn test_delimiter_must_open_file() {
        // A delimiter after body text is body, not front matter
        let content = "Intro.\n+++\ntitle = \"x\"\n+++\n";
        let extracted = extract(content, Path::new("a.md")).unwrap();
        assert!(extracted.data.is_empty());
        assert_eq!(extracted.body, content);
    }

    #[test]
    fn test_crlf_delimiters() {
        let content = "+++\r\ntitle = \"Win\"\r\n+++\r\nBody.";
        let extracted = extract(content, Path::new("a.md")).unwrap();
        assert_eq!(extracted.data["title"], "Win");
    }
}
