//! Metadata schemas and validation.
//!
//! A document type may declare an ordered list of field specifications.
//! Validation walks the declared fields in order, applying per-kind
//! transforms (date normalization, scalar coercions), and fails on the
//! first field that cannot be validated. The resulting error carries the
//! file path, the field name and the field's source line so an editor can
//! jump straight to it.
//!
//! A schema is either a fixed specification or a factory that builds one
//! from a [`SchemaHelpers`] context; either way it is resolved once per
//! document before validation.

pub mod helpers;

use crate::content::frontmatter::{json_kind, toml_to_json};
use helpers::SchemaHelpers;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{
    borrow::Cow,
    fmt,
    path::{Path, PathBuf},
};
use thiserror::Error;

// ============================================================================
// Specification
// ============================================================================

/// Ordered field specifications for one document type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaSpec {
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

/// One declared metadata field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,

    /// Missing required fields fail validation.
    #[serde(default)]
    pub required: bool,

    /// Value used when the field is absent (validated like any other).
    #[serde(default)]
    pub default: Option<toml::Value>,

    /// Allowed values, `enum` kind only.
    #[serde(default)]
    pub values: Vec<String>,
}

/// Value kind of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    /// Calendar date, normalized to zero-padded `YYYY-MM-DD`.
    Date,
    /// List of strings; a lone string is wrapped.
    List,
    /// One of the spec's `values`.
    Enum,
}

/// Schema of a document type: a fixed spec, or a factory receiving the
/// helpers context (asset registration etc.) and returning one.
pub enum SchemaSource {
    Static(SchemaSpec),
    /// Programmatic schemas; never produced by the config loader.
    #[allow(dead_code)]
    Factory(Box<dyn Fn(&SchemaHelpers) -> SchemaSpec>),
}

impl SchemaSource {
    /// Resolve the effective spec. Called once per document.
    pub fn resolve<'a>(&'a self, helpers: &SchemaHelpers) -> Cow<'a, SchemaSpec> {
        match self {
            Self::Static(spec) => Cow::Borrowed(spec),
            Self::Factory(build) => Cow::Owned(build(helpers)),
        }
    }
}

impl fmt::Debug for SchemaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(spec) => f.debug_tuple("Static").field(spec).finish(),
            Self::Factory(_) => f.debug_tuple("Factory").finish_non_exhaustive(),
        }
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Schema validation failure. Fatal to the whole generation pass.
#[derive(Debug, Error)]
#[error("invalid document `{}`: field `{field}` at {line}:0: {message}", .path.display())]
pub struct ValidationError {
    pub path: PathBuf,
    pub field: String,
    /// 1-based source line of the field's key (block start if absent).
    pub line: usize,
    pub message: String,
}

/// Validate a metadata block against a spec.
///
/// Declared fields are processed in declaration order and always take the
/// transformed value; undeclared fields pass through unchanged after them.
/// `raw_meta`/`meta_line` locate field keys in the source file for error
/// reporting.
pub fn validate(
    spec: &SchemaSpec,
    meta: &Map<String, Value>,
    raw_meta: &str,
    meta_line: usize,
    path: &Path,
) -> Result<Map<String, Value>, ValidationError> {
    let mut out = Map::with_capacity(meta.len());

    for field in &spec.fields {
        let fail = |message: String| ValidationError {
            path: path.to_path_buf(),
            field: field.name.clone(),
            line: line_of_field(raw_meta, meta_line, &field.name),
            message,
        };

        let value = match meta.get(&field.name) {
            Some(value) => value.clone(),
            None => match &field.default {
                Some(default) => toml_to_json(default.clone()),
                None if field.required => {
                    return Err(fail("required field is missing".to_owned()));
                }
                None => continue,
            },
        };

        let transformed = transform(field, &value).map_err(fail)?;
        out.insert(field.name.clone(), transformed);
    }

    // Undeclared fields are carried through untouched, after declared ones
    let declared: Vec<&str> = spec.fields.iter().map(|f| f.name.as_str()).collect();
    for (key, value) in meta {
        if !declared.contains(&key.as_str()) {
            out.insert(key.clone(), value.clone());
        }
    }

    Ok(out)
}

/// Names of metadata fields not declared by the spec, in block order.
pub fn undeclared_fields<'a>(spec: &SchemaSpec, meta: &'a Map<String, Value>) -> Vec<&'a str> {
    meta.keys()
        .map(String::as_str)
        .filter(|key| !spec.fields.iter().any(|f| f.name == *key))
        .collect()
}

/// Check and transform one field value.
fn transform(field: &FieldSpec, value: &Value) -> Result<Value, String> {
    match field.kind {
        FieldKind::String => match value {
            Value::String(_) => Ok(value.clone()),
            // scalar-to-string coercion
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            other => Err(format!("expected a string, found {}", json_kind(other))),
        },
        FieldKind::Number => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(|f| {
                    // keep integers integral
                    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                        Some(Value::from(f as i64))
                    } else {
                        serde_json::Number::from_f64(f).map(Value::Number)
                    }
                })
                .ok_or_else(|| format!("expected a number, found string `{s}`")),
            other => Err(format!("expected a number, found {}", json_kind(other))),
        },
        FieldKind::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) => match s.trim() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(format!("expected a boolean, found string `{s}`")),
            },
            other => Err(format!("expected a boolean, found {}", json_kind(other))),
        },
        FieldKind::Date => match value {
            Value::String(s) => normalize_date(s)
                .map(Value::String)
                .ok_or_else(|| format!("`{s}` is not a valid date")),
            other => Err(format!("expected a date string, found {}", json_kind(other))),
        },
        FieldKind::List => match value {
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) => out.push(Value::String(s.clone())),
                        Value::Number(n) => out.push(Value::String(n.to_string())),
                        Value::Bool(b) => out.push(Value::String(b.to_string())),
                        other => {
                            return Err(format!(
                                "list entries must be scalars, found {}",
                                json_kind(other)
                            ));
                        }
                    }
                }
                Ok(Value::Array(out))
            }
            // lone string promoted to a single-entry list
            Value::String(s) => Ok(Value::Array(vec![Value::String(s.clone())])),
            other => Err(format!("expected a list, found {}", json_kind(other))),
        },
        FieldKind::Enum => match value {
            Value::String(s) if field.values.iter().any(|v| v == s) => Ok(value.clone()),
            Value::String(s) => Err(format!(
                "`{s}` is not one of [{}]",
                field.values.join(", ")
            )),
            other => Err(format!("expected a string, found {}", json_kind(other))),
        },
    }
}

/// Normalize a date string to zero-padded `YYYY-MM-DD`, preserving any
/// time suffix. Accepts unpadded components (`2024-5-1`).
fn normalize_date(input: &str) -> Option<String> {
    let input = input.trim();
    let (date_part, rest) = match input.find(['T', ' ']) {
        Some(pos) => input.split_at(pos),
        None => (input, ""),
    };

    let mut parts = date_part.split('-');
    let year: u32 = parts.next()?.parse().ok()?;
    let month: u32 = parts.next()?.parse().ok()?;
    let day: u32 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) || year > 9999 {
        return None;
    }

    Some(format!("{year:04}-{month:02}-{day:02}{rest}"))
}

/// Find the 1-based source line of a field key by scanning the raw
/// metadata text for a line starting with the key followed by `:` or `=`.
/// Falls back to the block's first line when the key is absent.
fn line_of_field(raw_meta: &str, meta_line: usize, field: &str) -> usize {
    for (idx, line) in raw_meta.lines().enumerate() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix(field)
            && rest.trim_start().starts_with([':', '='])
        {
            return meta_line + idx;
        }
    }
    meta_line
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(fields: Vec<FieldSpec>) -> SchemaSpec {
        SchemaSpec { fields }
    }

    fn field(name: &str, kind: FieldKind) -> FieldSpec {
        FieldSpec {
            name: name.to_owned(),
            kind,
            required: false,
            default: None,
            values: Vec::new(),
        }
    }

    fn meta(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test meta must be an object"),
        }
    }

    #[test]
    fn test_required_missing_fails() {
        let mut title = field("title", FieldKind::String);
        title.required = true;
        let err = validate(
            &spec(vec![title]),
            &meta(json!({})),
            "",
            2,
            Path::new("a.md"),
        )
        .unwrap_err();

        assert_eq!(err.field, "title");
        assert_eq!(err.line, 2);
        assert!(err.to_string().contains("a.md"));
    }

    #[test]
    fn test_error_line_points_at_key() {
        let raw = "title = \"ok\"\ncount = \"many\"";
        let err = validate(
            &spec(vec![field("count", FieldKind::Number)]),
            &meta(json!({"title": "ok", "count": "many"})),
            raw,
            2,
            Path::new("a.md"),
        )
        .unwrap_err();

        // "count" sits on the second metadata line; block starts at line 2
        assert_eq!(err.line, 3);
        assert!(err.to_string().contains("3:0"));
    }

    #[test]
    fn test_date_transform_differs_from_raw() {
        let out = validate(
            &spec(vec![field("date", FieldKind::Date)]),
            &meta(json!({"date": "2024-5-1"})),
            "date = 2024-5-1",
            2,
            Path::new("a.md"),
        )
        .unwrap();

        // transformed value wins over the raw block value
        assert_eq!(out["date"], "2024-05-01");
    }

    #[test]
    fn test_date_keeps_time_suffix() {
        assert_eq!(
            normalize_date("2024-5-1T08:30:00Z"),
            Some("2024-05-01T08:30:00Z".to_owned())
        );
    }

    #[test]
    fn test_date_rejects_invalid() {
        assert_eq!(normalize_date("yesterday"), None);
        assert_eq!(normalize_date("2024-13-01"), None);
        assert_eq!(normalize_date("2024-01"), None);
    }

    #[test]
    fn test_default_applied_and_transformed() {
        let mut date = field("date", FieldKind::Date);
        date.default = Some(toml::Value::String("2020-1-2".to_owned()));
        let out = validate(&spec(vec![date]), &meta(json!({})), "", 2, Path::new("a.md")).unwrap();
        assert_eq!(out["date"], "2020-01-02");
    }

    #[test]
    fn test_enum_accepts_declared_value() {
        let mut kind = field("kind", FieldKind::Enum);
        kind.values = vec!["news".to_owned(), "guide".to_owned()];
        let out = validate(
            &spec(vec![kind]),
            &meta(json!({"kind": "guide"})),
            "kind = \"guide\"",
            2,
            Path::new("a.md"),
        )
        .unwrap();
        assert_eq!(out["kind"], "guide");
    }

    #[test]
    fn test_enum_rejects_unknown_value() {
        let mut kind = field("kind", FieldKind::Enum);
        kind.values = vec!["news".to_owned()];
        let err = validate(
            &spec(vec![kind]),
            &meta(json!({"kind": "rant"})),
            "kind = \"rant\"",
            2,
            Path::new("a.md"),
        )
        .unwrap_err();
        assert!(err.message.contains("rant"));
    }

    #[test]
    fn test_list_wraps_lone_string() {
        let out = validate(
            &spec(vec![field("tags", FieldKind::List)]),
            &meta(json!({"tags": "rust"})),
            "",
            2,
            Path::new("a.md"),
        )
        .unwrap();
        assert_eq!(out["tags"], json!(["rust"]));
    }

    #[test]
    fn test_number_coercion_from_string() {
        let out = validate(
            &spec(vec![field("weight", FieldKind::Number)]),
            &meta(json!({"weight": "42"})),
            "",
            2,
            Path::new("a.md"),
        )
        .unwrap();
        assert_eq!(out["weight"], 42);
    }

    #[test]
    fn test_undeclared_fields_pass_through() {
        let out = validate(
            &spec(vec![field("title", FieldKind::String)]),
            &meta(json!({"title": "T", "custom": {"nested": true}})),
            "",
            2,
            Path::new("a.md"),
        )
        .unwrap();
        assert_eq!(out["custom"], json!({"nested": true}));
    }

    #[test]
    fn test_undeclared_fields_listed() {
        let schema = spec(vec![field("title", FieldKind::String)]);
        let meta_map = meta(json!({"title": "T", "extra": 1}));
        let unknown = undeclared_fields(&schema, &meta_map);
        assert_eq!(unknown, vec!["extra"]);
    }

    #[test]
    fn test_declared_order_decides_first_failure() {
        let mut first = field("alpha", FieldKind::Number);
        first.required = true;
        let mut second = field("beta", FieldKind::Number);
        second.required = true;

        // both missing: the first declared field is reported
        let err = validate(
            &spec(vec![first, second]),
            &meta(json!({})),
            "",
            2,
            Path::new("a.md"),
        )
        .unwrap_err();
        assert_eq!(err.field, "alpha");
    }

    #[test]
    fn test_factory_resolution() {
        let source = SchemaSource::Factory(Box::new(|_helpers| SchemaSpec {
            fields: vec![FieldSpec {
                name: "title".to_owned(),
                kind: FieldKind::String,
                required: true,
                default: None,
                values: Vec::new(),
            }],
        }));

        let queue = helpers::AssetQueue::new();
        let ctx = SchemaHelpers::new(Path::new("content"), &queue);
        let resolved = source.resolve(&ctx);
        assert_eq!(resolved.fields.len(), 1);
        assert_eq!(resolved.fields[0].name, "title");
    }
}
