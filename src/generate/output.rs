//! Output artifact writers.
//!
//! Everything the pipeline emits lands under the output directory:
//!
//! ```text
//! {output}/
//!     package.json                  fixed entry scaffolding
//!     cache.json                    persistent compilation cache
//!     assets/                       flushed asset files
//!     generated/
//!         index.mjs                 re-exports every type collection
//!         {type}/
//!             {mangled id}.json     one per document
//!             index.json            all documents, discovery order
//!             index.mjs             import-and-reexport module
//! ```

use crate::content::ident::{DocumentIdent, IdentAllocator, collection_symbol};
use anyhow::{Context, Result};
use serde_json::Value;
use std::{fs, path::Path};

/// Header line for generated module source files.
const GENERATED_HEADER: &str = "// Generated by lode. Do not edit.";

/// Write one document's artifact into the type's generated directory.
pub fn write_document(type_dir: &Path, ident: &DocumentIdent, document: &Value) -> Result<()> {
    let path = type_dir.join(ident.artifact_file_name());
    let json = serde_json::to_string_pretty(document)?;
    fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))
}

/// Write the collection index: every document's data, discovery order.
pub fn write_collection_index(type_dir: &Path, documents: &[Value]) -> Result<()> {
    let path = type_dir.join("index.json");
    let json = serde_json::to_string_pretty(documents)?;
    fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))
}

/// Write the generated import module for a type: one import per document
/// artifact under a stable identifier, then the exported collection array
/// referencing them in the same order.
pub fn write_import_module(
    type_dir: &Path,
    type_name: &str,
    idents: &[DocumentIdent],
) -> Result<()> {
    let mut allocator = IdentAllocator::new();
    let mut imports = String::new();
    let mut names = Vec::with_capacity(idents.len());

    for ident in idents {
        let name = allocator.allocate(&ident.id);
        imports.push_str(&format!(
            "import {name} from './{}' with {{ type: 'json' }}\n",
            ident.artifact_file_name()
        ));
        names.push(name);
    }

    let module = format!(
        "{GENERATED_HEADER}\n{imports}\nexport const {} = [{}]\n",
        collection_symbol(type_name),
        names.join(", ")
    );

    let path = type_dir.join("index.mjs");
    fs::write(&path, module).with_context(|| format!("failed to write {}", path.display()))
}

/// Write the static entry artifacts: the output package marker and the
/// root module re-exporting every type's collection.
pub fn write_entry_artifacts(
    output_dir: &Path,
    generated_dir: &Path,
    type_names: &[&str],
) -> Result<()> {
    let package = output_dir.join("package.json");
    fs::write(&package, "{\n  \"type\": \"module\"\n}\n")
        .with_context(|| format!("failed to write {}", package.display()))?;

    let mut module = format!("{GENERATED_HEADER}\n");
    for name in type_names {
        module.push_str(&format!(
            "export {{ {} }} from './{name}/index.mjs'\n",
            collection_symbol(name)
        ));
    }

    let path = generated_dir.join("index.mjs");
    fs::write(&path, module).with_context(|| format!("failed to write {}", path.display()))
}
