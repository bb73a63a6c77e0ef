//! Document type definitions from `[[types]]` tables.

use super::defaults;
use crate::format::BodyFormat;
use crate::schema::{FieldSpec, SchemaSource};
use educe::Educe;
use serde::Deserialize;
use std::path::PathBuf;

/// One declared document type.
///
/// # Example
/// ```toml
/// [[types]]
/// name = "post"
/// patterns = ["**/*.md", "**/*.mdx"]
///
/// [[types.fields]]
/// name = "title"
/// kind = "string"
/// required = true
/// ```
#[derive(Debug, Educe, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct TypeDef {
    /// Type name; also the subdirectory of the content dir holding its files.
    pub name: String,

    /// Glob patterns selecting this type's files, relative to its directory.
    #[serde(default = "defaults::types::patterns")]
    #[educe(Default = defaults::types::patterns())]
    pub patterns: Vec<String>,

    /// Body format override; when unset the file extension decides.
    #[serde(default)]
    pub format: Option<BodyFormat>,

    /// Inline metadata schema, in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldSpec>,

    /// External schema file (`[[fields]]` tables); alternative to inline
    /// fields and watched as a configuration dependency.
    #[serde(default)]
    pub schema_file: Option<PathBuf>,

    /// Version-control options for file discovery.
    #[serde(default)]
    pub git: GitOptions,

    /// Resolved schema; populated by the config loader (inline fields or
    /// schema file) or set programmatically to a factory.
    #[serde(skip)]
    pub schema: Option<SchemaSource>,
}

/// `[types.git]` - version-control options for file discovery.
#[derive(Debug, Clone, Educe, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct GitOptions {
    /// Exclude paths matched by the content directory's `.gitignore`.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub respect_ignore: bool,
}
