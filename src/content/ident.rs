//! Document identity and generated-code naming.
//!
//! Every document is identified by its path relative to the type
//! directory. From that one string this module derives everything the
//! output artifacts need:
//!
//! | Derived | `blog/Guide One.md` |
//! |---------|---------------------|
//! | id | `blog/Guide One.md` (unchanged) |
//! | slug | `blog/guide-one` |
//! | artifact file name | `blog__Guide One.md.json` |
//! | import identifier | `blog__guide_one_md` |
//!
//! A trailing `index` path segment is dropped from the slug, so
//! `blog/index.md` addresses `blog`.

use rustc_hash::FxHashSet;
use std::path::Path;

/// Identity of one document within its type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentIdent {
    /// Original relative path, separators normalized to `/`.
    pub id: String,
    /// Per-segment slugified path, extension stripped.
    pub slug: String,
}

impl DocumentIdent {
    /// Derive identity from a path relative to the type directory.
    pub fn from_relative(relative: &Path) -> Self {
        let id = normalize_separators(relative);
        Self {
            slug: slug_of(&id),
            id,
        }
    }

    /// File name of the per-document artifact: the id with path
    /// separators mangled into `__`, plus the `.json` extension.
    pub fn artifact_file_name(&self) -> String {
        format!("{}.json", mangle_id(&self.id))
    }
}

/// Replace platform separators with `/` so ids are stable across hosts.
fn normalize_separators(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Mangle an id into a single filesystem-safe token.
pub fn mangle_id(id: &str) -> String {
    id.replace('/', "__")
}

/// Compute the slug for an id: strip the extension, drop a trailing
/// `index` segment, then slugify each remaining segment.
fn slug_of(id: &str) -> String {
    // Strip the extension from the final segment only; directory names
    // containing dots stay intact.
    let (dir, name) = id.rsplit_once('/').map_or(("", id), |(d, n)| (d, n));
    let name = name.rsplit_once('.').map_or(name, |(stem, _)| stem);

    let mut segments: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
    if name != "index" && !name.is_empty() {
        segments.push(name);
    }

    segments
        .iter()
        .map(|s| slug::slugify(s))
        .collect::<Vec<_>>()
        .join("/")
}

// ============================================================================
// Generated-module identifiers
// ============================================================================

/// Allocates unique ECMAScript identifiers for generated import modules.
///
/// Identifiers are a pure function of each relative path; when two paths
/// collapse to the same name, a numeric suffix keeps them distinct in the
/// order the documents were discovered.
#[derive(Debug, Default)]
pub struct IdentAllocator {
    used: FxHashSet<String>,
}

impl IdentAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an identifier for a document id.
    pub fn allocate(&mut self, id: &str) -> String {
        let base = js_identifier(id);
        if self.used.insert(base.clone()) {
            return base;
        }
        for n in 2.. {
            let candidate = format!("{base}_{n}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
        }
        unreachable!()
    }
}

/// Build a valid ECMAScript identifier from an arbitrary id string.
///
/// Non-alphanumeric runs become a single `_`; an identifier may not start
/// with a digit or be empty.
fn js_identifier(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    let mut last_was_sep = false;

    for c in id.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_was_sep = false;
        } else if !out.is_empty() && !last_was_sep {
            out.push('_');
            last_was_sep = true;
        }
    }

    while out.ends_with('_') {
        out.pop();
    }

    if out.is_empty() {
        return "doc".to_owned();
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

// ============================================================================
// Type-name symbols
// ============================================================================

/// Exported collection symbol for a type name: `post` -> `allPosts`.
pub fn collection_symbol(type_name: &str) -> String {
    format!("all{}", pascal_case(&pluralize(type_name)))
}

/// Pluralize an English type name. Names already ending in `s` are kept.
pub fn pluralize(name: &str) -> String {
    if name.ends_with('s') {
        return name.to_owned();
    }
    if let Some(stem) = name.strip_suffix('y') {
        // consonant + y -> ies ("category" -> "categories"), vowel + y -> +s
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            return format!("{stem}ies");
        }
    }
    if name.ends_with('x') || name.ends_with("ch") || name.ends_with("sh") {
        return format!("{name}es");
    }
    format!("{name}s")
}

/// Singularize an English type name (inverse of [`pluralize`]).
#[allow(dead_code)] // Naming surface for library callers
pub fn singularize(name: &str) -> String {
    if let Some(stem) = name.strip_suffix("ies") {
        return format!("{stem}y");
    }
    if let Some(stem) = name.strip_suffix("es")
        && (stem.ends_with('x') || stem.ends_with("ch") || stem.ends_with("sh"))
    {
        return stem.to_owned();
    }
    name.strip_suffix('s').unwrap_or(name).to_owned()
}

/// Upper-camel-case a name split on `-`, `_` and whitespace.
fn pascal_case(name: &str) -> String {
    name.split(['-', '_', ' '])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Return "s" suffix for plural counts
#[inline]
pub fn plural_s(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_id_preserves_relative_path() {
        let ident = DocumentIdent::from_relative(&PathBuf::from("blog/Guide One.md"));
        assert_eq!(ident.id, "blog/Guide One.md");
    }

    #[test]
    fn test_slug_per_segment() {
        let ident = DocumentIdent::from_relative(&PathBuf::from("blog/Guide One.md"));
        assert_eq!(ident.slug, "blog/guide-one");
    }

    #[test]
    fn test_slug_drops_trailing_index() {
        let ident = DocumentIdent::from_relative(&PathBuf::from("blog/index.md"));
        assert_eq!(ident.slug, "blog");
    }

    #[test]
    fn test_slug_root_index_is_empty() {
        let ident = DocumentIdent::from_relative(&PathBuf::from("index.md"));
        assert_eq!(ident.slug, "");
    }

    #[test]
    fn test_slug_keeps_dotted_directories() {
        let ident = DocumentIdent::from_relative(&PathBuf::from("v1.2/notes.md"));
        assert_eq!(ident.slug, "v1-2/notes");
    }

    #[test]
    fn test_slug_unicode() {
        let ident = DocumentIdent::from_relative(&PathBuf::from("Überblick.md"));
        assert_eq!(ident.slug, "uberblick");
    }

    #[test]
    fn test_artifact_file_name_mangles_separators() {
        let ident = DocumentIdent::from_relative(&PathBuf::from("blog/Guide One.md"));
        assert_eq!(ident.artifact_file_name(), "blog__Guide One.md.json");
    }

    #[test]
    fn test_artifact_file_name_flat() {
        let ident = DocumentIdent::from_relative(&PathBuf::from("hello.md"));
        assert_eq!(ident.artifact_file_name(), "hello.md.json");
    }

    #[test]
    fn test_js_identifier_basic() {
        assert_eq!(js_identifier("blog/Guide One.md"), "blog_guide_one_md");
    }

    #[test]
    fn test_js_identifier_digit_prefix() {
        assert_eq!(js_identifier("2024/recap.md"), "_2024_recap_md");
    }

    #[test]
    fn test_js_identifier_empty_input() {
        assert_eq!(js_identifier("---"), "doc");
    }

    #[test]
    fn test_allocator_dedupes() {
        let mut alloc = IdentAllocator::new();
        // "a-b.md" and "a b.md" collapse to the same identifier
        let first = alloc.allocate("a-b.md");
        let second = alloc.allocate("a b.md");
        assert_eq!(first, "a_b_md");
        assert_eq!(second, "a_b_md_2");
        assert_eq!(alloc.allocate("a+b.md"), "a_b_md_3");
    }

    #[test]
    fn test_collection_symbol() {
        assert_eq!(collection_symbol("post"), "allPosts");
        assert_eq!(collection_symbol("posts"), "allPosts");
        assert_eq!(collection_symbol("category"), "allCategories");
        assert_eq!(collection_symbol("blog-post"), "allBlogPosts");
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("post"), "posts");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("branch"), "branches");
        assert_eq!(pluralize("essay"), "essays");
        assert_eq!(pluralize("docs"), "docs");
    }

    #[test]
    fn test_singularize() {
        assert_eq!(singularize("posts"), "post");
        assert_eq!(singularize("categories"), "category");
        assert_eq!(singularize("boxes"), "box");
        assert_eq!(singularize("post"), "post");
    }

    #[test]
    fn test_plural_s() {
        assert_eq!(plural_s(0), "s");
        assert_eq!(plural_s(1), "");
        assert_eq!(plural_s(5), "s");
    }
}
