//! Body format detection.
//!
//! Maps a content file's extension (or an explicit per-type override) to
//! the format its body is compiled as.
//!
//! | Extension | Format |
//! |-----------|--------|
//! | `.md`, `.markdown`, `.mdown` | `Markdown` |
//! | `.mdx` | `Mdx` (component-extended markdown) |
//! | `.mdoc` | `Mdoc` (templated markdown) |
//! | anything else | [`FormatError::UnknownExtension`] |

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Plain-markdown extensions (all resolve to [`BodyFormat::Markdown`]).
const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown", "mdown"];

/// Format a document body is compiled as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyFormat {
    /// Plain CommonMark.
    Markdown,
    /// Markdown with the extended syntax set (tables, footnotes, ...).
    Mdx,
    /// Markdown with `{{ field }}` metadata substitution.
    Mdoc,
}

impl BodyFormat {
    /// Short name used in artifacts and logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Mdx => "mdx",
            Self::Mdoc => "mdoc",
        }
    }
}

/// Format detection failure.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("cannot detect body format of `{}`: unknown extension", .0.display())]
    UnknownExtension(PathBuf),
}

/// Resolve the body format for a file.
///
/// An explicit override always wins; otherwise the extension decides.
/// Unknown extensions are an error so that a stray file in a content
/// directory is surfaced instead of silently skipped.
pub fn resolve(path: &Path, format_override: Option<BodyFormat>) -> Result<BodyFormat, FormatError> {
    if let Some(format) = format_override {
        return Ok(format);
    }

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();

    if MARKDOWN_EXTENSIONS.contains(&ext) {
        Ok(BodyFormat::Markdown)
    } else if ext == "mdx" {
        Ok(BodyFormat::Mdx)
    } else if ext == "mdoc" {
        Ok(BodyFormat::Mdoc)
    } else {
        Err(FormatError::UnknownExtension(path.to_path_buf()))
    }
}
