//! Body compilation.
//!
//! The pipeline hands each document body to a [`Bundler`] together with
//! its resolved format, validated metadata and the configured options.
//! The bundler either produces compiled code or a non-empty error list;
//! the caller treats the first error as fatal to the run.
//!
//! The built-in [`CmarkBundler`] compiles the markdown family:
//!
//! - `Markdown` - plain CommonMark
//! - `Mdx` - CommonMark plus the extended syntax set (tables, footnotes,
//!   strikethrough, task lists)
//! - `Mdoc` - `{{ field }}` placeholders substituted from the document's
//!   metadata, then compiled like `Mdx`

use crate::format::BodyFormat;
use pulldown_cmark::{Options, Parser, html};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Compilation request for one document body.
pub struct BundleRequest<'a> {
    pub format: BodyFormat,
    pub raw_body: &'a str,
    pub metadata: &'a Map<String, Value>,
    pub options: &'a BundlerOptions,
}

/// Bundler options from the `[build.bundler]` config section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BundlerOptions {
    /// Treat plain markdown as the extended format.
    pub markdown_extended: bool,
    /// Smart quotes and dashes in extended output.
    pub smart_punctuation: bool,
}

/// One body compilation error.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct BundleError {
    pub message: String,
}

impl BundleError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Compiles a document body into its portable output code.
pub trait Bundler {
    fn bundle(&self, request: &BundleRequest<'_>) -> Result<String, Vec<BundleError>>;
}

// ============================================================================
// Built-in markdown bundler
// ============================================================================

/// pulldown-cmark based bundler for the markdown family.
#[derive(Debug, Default)]
pub struct CmarkBundler;

impl Bundler for CmarkBundler {
    fn bundle(&self, request: &BundleRequest<'_>) -> Result<String, Vec<BundleError>> {
        match request.format {
            BodyFormat::Markdown => Ok(render(request.raw_body, Options::empty())),
            BodyFormat::Mdx => Ok(render(
                request.raw_body,
                extended_options(request.options),
            )),
            BodyFormat::Mdoc => {
                let expanded = expand_placeholders(request.raw_body, request.metadata)?;
                Ok(render(&expanded, extended_options(request.options)))
            }
        }
    }
}

fn extended_options(options: &BundlerOptions) -> Options {
    let mut opts = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS;
    if options.smart_punctuation {
        opts |= Options::ENABLE_SMART_PUNCTUATION;
    }
    opts
}

fn render(body: &str, options: Options) -> String {
    let parser = Parser::new_ext(body, options);
    let mut out = String::with_capacity(body.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

// ============================================================================
// Mdoc placeholder expansion
// ============================================================================

/// Substitute `{{ field }}` placeholders with scalar metadata values.
///
/// Every unresolvable placeholder is reported, so an author sees all of
/// them in one run rather than one per run.
fn expand_placeholders(
    body: &str,
    metadata: &Map<String, Value>,
) -> Result<String, Vec<BundleError>> {
    let mut out = String::with_capacity(body.len());
    let mut errors = Vec::new();
    let mut rest = body;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];

        let Some(end) = after_open.find("}}") else {
            errors.push(BundleError::new("unterminated `{{` placeholder"));
            out.push_str(&rest[start..]);
            rest = "";
            break;
        };

        let key = after_open[..end].trim();
        match metadata.get(key) {
            Some(Value::String(s)) => out.push_str(s),
            Some(Value::Number(n)) => out.push_str(&n.to_string()),
            Some(Value::Bool(b)) => out.push_str(&b.to_string()),
            Some(other) => errors.push(BundleError::new(format!(
                "placeholder `{key}` is not a scalar ({})",
                crate::content::frontmatter::json_kind(other)
            ))),
            None => errors.push(BundleError::new(format!(
                "unknown placeholder `{key}`"
            ))),
        }

        rest = &after_open[end + 2..];
    }
    out.push_str(rest);

    if errors.is_empty() { Ok(out) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request<'a>(
        format: BodyFormat,
        body: &'a str,
        metadata: &'a Map<String, Value>,
        options: &'a BundlerOptions,
    ) -> BundleRequest<'a> {
        BundleRequest {
            format,
            raw_body: body,
            metadata,
            options,
        }
    }

    fn meta(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test meta must be an object"),
        }
    }

    #[test]
    fn test_markdown_renders_html() {
        let metadata = meta(json!({}));
        let options = BundlerOptions::default();
        let code = CmarkBundler
            .bundle(&request(
                BodyFormat::Markdown,
                "# Title\n\nSome *emphasis*.",
                &metadata,
                &options,
            ))
            .unwrap();

        assert!(code.contains("<h1>Title</h1>"));
        assert!(code.contains("<em>emphasis</em>"));
    }

    #[test]
    fn test_plain_markdown_has_no_tables() {
        let metadata = meta(json!({}));
        let options = BundlerOptions::default();
        let table = "| a | b |\n|---|---|\n| 1 | 2 |";
        let code = CmarkBundler
            .bundle(&request(BodyFormat::Markdown, table, &metadata, &options))
            .unwrap();
        assert!(!code.contains("<table>"));
    }

    #[test]
    fn test_mdx_enables_tables() {
        let metadata = meta(json!({}));
        let options = BundlerOptions::default();
        let table = "| a | b |\n|---|---|\n| 1 | 2 |";
        let code = CmarkBundler
            .bundle(&request(BodyFormat::Mdx, table, &metadata, &options))
            .unwrap();
        assert!(code.contains("<table>"));
    }

    #[test]
    fn test_mdoc_substitutes_metadata() {
        let metadata = meta(json!({"title": "Lode", "version": 3}));
        let options = BundlerOptions::default();
        let code = CmarkBundler
            .bundle(&request(
                BodyFormat::Mdoc,
                "# {{ title }} v{{version}}",
                &metadata,
                &options,
            ))
            .unwrap();
        assert!(code.contains("<h1>Lode v3</h1>"));
    }

    #[test]
    fn test_mdoc_unknown_placeholder_fails() {
        let metadata = meta(json!({}));
        let options = BundlerOptions::default();
        let errors = CmarkBundler
            .bundle(&request(
                BodyFormat::Mdoc,
                "Hello {{ missing }} and {{ also_missing }}",
                &metadata,
                &options,
            ))
            .unwrap_err();

        // all failures reported, not just the first encountered
        assert_eq!(errors.len(), 2);
        assert!(errors[0].to_string().contains("missing"));
    }

    #[test]
    fn test_mdoc_non_scalar_placeholder_fails() {
        let metadata = meta(json!({"tags": ["a", "b"]}));
        let options = BundlerOptions::default();
        let errors = CmarkBundler
            .bundle(&request(BodyFormat::Mdoc, "{{ tags }}", &metadata, &options))
            .unwrap_err();
        assert!(errors[0].to_string().contains("not a scalar"));
    }

    #[test]
    fn test_mdoc_unterminated_placeholder_fails() {
        let metadata = meta(json!({}));
        let options = BundlerOptions::default();
        let errors = CmarkBundler
            .bundle(&request(BodyFormat::Mdoc, "broken {{ title", &metadata, &options))
            .unwrap_err();
        assert!(errors[0].to_string().contains("unterminated"));
    }

    #[test]
    fn test_expand_without_placeholders_is_identity() {
        let metadata = meta(json!({}));
        let body = "no substitution here";
        assert_eq!(expand_placeholders(body, &metadata).unwrap(), body);
    }
}
