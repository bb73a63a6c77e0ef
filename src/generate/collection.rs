//! Document type processing.
//!
//! Compiles one document type's file set end-to-end:
//!
//! ```text
//! discover() ──► per file: fingerprint ──► cache hit? ──► reuse document
//!                                 │
//!                                 └─ miss: read ──► front matter ──►
//!                                    schema validate ──► resolve format ──►
//!                                    bundle body ──► write artifact ──►
//!                                    update cache entry
//!                │
//!                └──► index.json + index.mjs (discovery order)
//! ```
//!
//! Files are processed strictly in discovery order, one at a time; the
//! collection artifacts are built from that order, and the cache is
//! mutated in place as each file completes. Any validation, format or
//! bundling failure aborts the whole pass so partial state never reaches
//! the output.

use crate::bundler::{BundleRequest, Bundler};
use crate::cache::{Cache, CacheEntry};
use crate::config::{ConfigError, LodeConfig, TypeDef};
use crate::content::frontmatter;
use crate::content::ident::DocumentIdent;
use crate::format::{self, BodyFormat};
use crate::generate::{Summary, discover::discover, output};
use crate::log;
use crate::schema::{self, helpers::SchemaHelpers};
use anyhow::{Context, Result, bail};
use serde_json::{Map, Value, json};
use std::{fs, path::Path};

/// Process one document type, returning its pass summary.
pub fn process_type(
    def: &TypeDef,
    config: &LodeConfig,
    cache: &mut Cache,
    helpers: &SchemaHelpers,
    bundler: &dyn Bundler,
) -> Result<Summary> {
    if def.patterns.is_empty() {
        bail!(ConfigError::Validation(format!(
            "type `{}` has an empty pattern list",
            def.name
        )));
    }

    let content_dir = config.content_dir();
    let type_dir = content_dir.join(&def.name);
    let files = discover(&content_dir, def)?;

    let out_dir = config.generated_dir().join(&def.name);
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let mut summary = Summary::default();
    let mut documents = Vec::with_capacity(files.len());
    let mut idents = Vec::with_capacity(files.len());

    for path in &files {
        let relative = path
            .strip_prefix(&type_dir)
            .with_context(|| format!("file escaped type directory: {}", path.display()))?;
        let ident = DocumentIdent::from_relative(relative);
        let hash = crate::cache::fingerprint(path)?;

        let hit = cache
            .get(path)
            .filter(|entry| entry.hash == hash && entry.type_name == def.name)
            .map(|entry| entry.document.clone());

        let document = match hit {
            Some(document) => {
                summary.cached += 1;
                document
            }
            None => {
                let document = compile_document(path, &ident, def, config, helpers, bundler)?;
                output::write_document(&out_dir, &ident, &document)?;
                cache.set(
                    path,
                    CacheEntry {
                        hash,
                        type_name: def.name.clone(),
                        document: document.clone(),
                    },
                );
                summary.generated += 1;
                document
            }
        };

        summary.total += 1;
        documents.push(document);
        idents.push(ident);
    }

    output::write_collection_index(&out_dir, &documents)?;
    output::write_import_module(&out_dir, &def.name, &idents)?;

    Ok(summary)
}

/// Compile one source file into its document data.
fn compile_document(
    path: &Path,
    ident: &DocumentIdent,
    def: &TypeDef,
    config: &LodeConfig,
    helpers: &SchemaHelpers,
    bundler: &dyn Bundler,
) -> Result<Value> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let extracted = frontmatter::extract(&raw, path)?;

    // Schema is resolved once per document, then either the transformed
    // data or the raw metadata block becomes the document's data.
    let data = match &def.schema {
        Some(source) => {
            let spec = source.resolve(helpers);
            let unknown = schema::undeclared_fields(&spec, &extracted.data);
            if !unknown.is_empty() {
                log!("schema"; "{}: undeclared fields [{}]", ident.id, unknown.join(", "));
            }
            schema::validate(
                &spec,
                &extracted.data,
                &extracted.raw_meta,
                extracted.meta_line,
                path,
            )?
        }
        None => extracted.data.clone(),
    };

    let format = resolve_format(path, def, config)?;

    let request = BundleRequest {
        format,
        raw_body: &extracted.body,
        metadata: &data,
        options: &config.build.bundler,
    };
    let code = match bundler.bundle(&request) {
        Ok(code) => code,
        Err(errors) => {
            let first = errors
                .into_iter()
                .next()
                .map_or_else(|| "unknown bundler failure".to_owned(), |e| e.message);
            bail!("failed to bundle `{}`: {first}", path.display());
        }
    };

    Ok(assemble(ident, &def.name, data, format, &extracted.body, code))
}

/// Resolve the body format: per-type override, then extension, then the
/// global plain-markdown promotion.
fn resolve_format(path: &Path, def: &TypeDef, config: &LodeConfig) -> Result<BodyFormat> {
    let format = format::resolve(path, def.format)?;
    if format == BodyFormat::Markdown && config.build.bundler.markdown_extended {
        return Ok(BodyFormat::Mdx);
    }
    Ok(format)
}

/// Merge validated data with the computed document fields.
fn assemble(
    ident: &DocumentIdent,
    type_name: &str,
    data: Map<String, Value>,
    format: BodyFormat,
    raw_body: &str,
    code: String,
) -> Value {
    let mut document = data;
    document.insert("_id".to_owned(), Value::String(ident.id.clone()));
    document.insert("slug".to_owned(), Value::String(ident.slug.clone()));
    document.insert("type".to_owned(), Value::String(type_name.to_owned()));
    document.insert(
        "body".to_owned(),
        json!({
            "format": format.name(),
            "raw": raw_body,
            "code": code,
        }),
    );
    Value::Object(document)
}
