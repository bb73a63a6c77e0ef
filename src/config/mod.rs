//! Project configuration management for `lode.toml`.
//!
//! # Sections
//!
//! | Section      | Purpose                                          |
//! |--------------|--------------------------------------------------|
//! | `[build]`    | Content/output paths, bundler options            |
//! | `[[types]]`  | Document type definitions (patterns, schema)     |
//!
//! # Example
//!
//! ```toml
//! [build]
//! content = "content"
//! output = ".lode"
//!
//! [build.bundler]
//! markdown_extended = true
//!
//! [[types]]
//! name = "post"
//! patterns = ["**/*.md", "**/*.mdx"]
//!
//! [[types.fields]]
//! name = "title"
//! kind = "string"
//! required = true
//! ```
//!
//! The loaded config owns everything a generation pass needs and is
//! replaced wholesale when a configuration dependency file changes in
//! dev mode. `dependency_paths` enumerates those files for the watcher.

pub mod defaults;
mod error;
mod types;

pub use error::ConfigError;
pub use types::{GitOptions, TypeDef};

use crate::bundler::BundlerOptions;
use crate::cli::Cli;
use crate::schema::{SchemaSource, SchemaSpec};
use anyhow::{Context, Result, bail};
use educe::Educe;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing lode.toml
#[derive(Debug, Educe, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct LodeConfig {
    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory (the config file's directory)
    #[serde(skip)]
    root: PathBuf,

    /// External schema files loaded for types (configuration dependencies)
    #[serde(skip)]
    schema_files: Vec<PathBuf>,

    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Document type definitions
    #[serde(default)]
    pub types: Vec<TypeDef>,
}

/// `[build]` section in lode.toml.
#[derive(Debug, Clone, Educe, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Content source directory, relative to the project root.
    #[serde(default = "defaults::build::content")]
    #[educe(Default = defaults::build::content())]
    pub content: PathBuf,

    /// Output directory for generated artifacts.
    #[serde(default = "defaults::build::output")]
    #[educe(Default = defaults::build::output())]
    pub output: PathBuf,

    /// Body bundler options.
    #[serde(default)]
    pub bundler: BundlerOptions,
}

impl LodeConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: LodeConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from file path, resolving type schemas.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        let mut config = Self::from_str(&content)?;

        config.config_path = absolutize(path);
        config.root = config
            .config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.resolve_schemas()?;

        Ok(config)
    }

    /// Apply CLI path overrides.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(content) = &cli.content {
            self.build.content = content.clone();
        }
        if let Some(output) = &cli.output {
            self.build.output = output.clone();
        }
    }

    /// Check invariants that TOML parsing cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.types.is_empty() {
            bail!(ConfigError::Validation(
                "no document types declared; add a [[types]] table".to_owned()
            ));
        }

        let mut seen = Vec::with_capacity(self.types.len());
        for def in &self.types {
            if def.name.is_empty() {
                bail!(ConfigError::Validation(
                    "document type with empty name".to_owned()
                ));
            }
            if seen.contains(&def.name.as_str()) {
                bail!(ConfigError::Validation(format!(
                    "duplicate document type `{}`",
                    def.name
                )));
            }
            seen.push(def.name.as_str());

            if let Some(SchemaSource::Static(spec)) = &def.schema {
                for field in &spec.fields {
                    if field.kind == crate::schema::FieldKind::Enum && field.values.is_empty() {
                        bail!(ConfigError::Validation(format!(
                            "type `{}`: enum field `{}` declares no values",
                            def.name, field.name
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Turn inline fields or an external schema file into each type's
    /// resolved schema source.
    fn resolve_schemas(&mut self) -> Result<()> {
        let root = self.root.clone();
        for def in &mut self.types {
            if let Some(schema_file) = &def.schema_file {
                if !def.fields.is_empty() {
                    bail!(ConfigError::Validation(format!(
                        "type `{}` declares both inline fields and a schema_file",
                        def.name
                    )));
                }
                let path = root.join(schema_file);
                let content = fs::read_to_string(&path)
                    .map_err(|err| ConfigError::Io(path.clone(), err))
                    .with_context(|| format!("loading schema for type `{}`", def.name))?;
                let spec: SchemaSpec = toml::from_str(&content)
                    .map_err(ConfigError::Toml)
                    .with_context(|| format!("parsing schema file {}", path.display()))?;
                def.schema = Some(SchemaSource::Static(spec));
                self.schema_files.push(path);
            } else if !def.fields.is_empty() {
                let fields = std::mem::take(&mut def.fields);
                def.schema = Some(SchemaSource::Static(SchemaSpec { fields }));
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Resolved paths
    // ------------------------------------------------------------------------

    /// Get the project root directory
    pub fn get_root(&self) -> &Path {
        &self.root
    }

    pub fn content_dir(&self) -> PathBuf {
        self.root.join(&self.build.content)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.build.output)
    }

    pub fn generated_dir(&self) -> PathBuf {
        self.output_dir().join("generated")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.output_dir().join("assets")
    }

    pub fn cache_path(&self) -> PathBuf {
        self.output_dir().join("cache.json")
    }

    /// Files whose change invalidates the whole configuration: the config
    /// file itself plus every external schema file it pulled in.
    pub fn dependency_paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![self.config_path.clone()];
        paths.extend(self.schema_files.iter().cloned());
        paths
    }
}

/// Make a path absolute against the current directory without requiring
/// it to exist.
fn absolutize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}
