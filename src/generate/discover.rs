//! Content file discovery.
//!
//! Enumerates the files of one document type: everything under
//! `{content}/{type}` matching the type's glob patterns, excluding
//!
//! - dot-files and dot-directories (editor/OS droppings),
//! - files whose name starts with the `_` ignore marker,
//! - anything matched by the content directory's `.gitignore`
//!   (when the type's git options ask for it),
//! - non-regular files.
//!
//! The returned list is sorted by relative path. That order is
//! authoritative: collection artifacts preserve it exactly.

use crate::config::TypeDef;
use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::{
    fs,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

/// Prefix marking a file as excluded from discovery.
const IGNORE_MARKER: char = '_';

/// Enumerate the absolute paths of one type's content files, sorted by
/// relative path.
pub fn discover(content_dir: &Path, def: &TypeDef) -> Result<Vec<PathBuf>> {
    let type_dir = content_dir.join(&def.name);
    if !type_dir.is_dir() {
        return Ok(Vec::new());
    }

    let patterns = build_globset(&def.patterns)
        .with_context(|| format!("invalid patterns for type `{}`", def.name))?;

    let ignore = if def.git.respect_ignore {
        IgnoreMatcher::load(content_dir)
    } else {
        IgnoreMatcher::empty()
    };

    let mut found: Vec<(PathBuf, PathBuf)> = Vec::new();

    let walk = WalkDir::new(&type_dir).into_iter().filter_entry(|entry| {
        // prune hidden directories entirely; hidden files fall out below
        !(entry.file_type().is_dir() && is_hidden(entry.file_name()))
    });

    for entry in walk.filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name();
        if is_hidden(name) || starts_with_marker(name) {
            continue;
        }

        let path = entry.into_path();
        let Ok(relative) = path.strip_prefix(&type_dir) else {
            continue;
        };
        if !patterns.is_match(relative) {
            continue;
        }

        // gitignore rules are rooted at the content directory
        if let Ok(rel_to_content) = path.strip_prefix(content_dir) {
            let rel = rel_to_content.to_string_lossy().replace('\\', "/");
            if ignore.matches(&rel, false) {
                continue;
            }
        }

        found.push((relative.to_path_buf(), path));
    }

    found.sort_by(|(a, _), (b, _)| a.cmp(b));
    Ok(found.into_iter().map(|(_, path)| path).collect())
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}

fn starts_with_marker(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with(IGNORE_MARKER))
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

// ============================================================================
// Gitignore matching
// ============================================================================

// Constants for gix::ignore::search::pattern::Mode (which is private)
// See: https://github.com/Byron/gitoxide/blob/main/gix-ignore/src/search/pattern.rs
const MODE_NO_SUB_DIR: u32 = 1 << 0; // Pattern has no internal slash (matches basename unless absolute)
const MODE_MUST_MATCH_DIR: u32 = 1 << 2; // Pattern ends with slash (must match directory)
const MODE_NEGATIVE: u32 = 1 << 3; // Pattern starts with ! (negation)
const MODE_ABSOLUTE: u32 = 1 << 4; // Pattern starts with / (rooted at gitignore location)

/// Matches paths against `.gitignore` patterns.
///
/// Handles negation (`!`), directory-only patterns (trailing `/`),
/// rooted patterns (leading `/`) and basename vs path-relative matching.
pub struct IgnoreMatcher {
    // (pattern_text, mode_bits)
    patterns: Vec<(gix::bstr::BString, u32)>,
}

impl IgnoreMatcher {
    /// Matcher with no rules; nothing is ignored.
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Load `.gitignore` from a directory. Missing file means no rules.
    pub fn load(dir: &Path) -> Self {
        match fs::read(dir.join(".gitignore")) {
            Ok(bytes) => Self::parse(&bytes),
            Err(_) => Self::empty(),
        }
    }

    /// Parse gitignore bytes into patterns
    pub fn parse(gitignore: &[u8]) -> Self {
        let patterns = gix::ignore::parse(gitignore)
            .map(|(pattern, _, _)| (pattern.text, pattern.mode.bits()))
            .collect();
        Self { patterns }
    }

    /// Check whether a path (relative to the gitignore's directory, `/`
    /// separated) is ignored. Iterates patterns in order, last match wins.
    pub fn matches(&self, path: &str, is_dir: bool) -> bool {
        use gix::bstr::ByteSlice;
        use gix::glob::wildmatch;

        let mut is_ignored = false;
        for (text, mode) in &self.patterns {
            // "build/" must not match a plain file named "build"
            if (mode & MODE_MUST_MATCH_DIR != 0) && !is_dir {
                continue;
            }

            let mut match_path = path;
            let is_absolute = mode & MODE_ABSOLUTE != 0;
            let has_internal_slash = mode & MODE_NO_SUB_DIR == 0;

            // A non-rooted pattern without a slash matches the basename:
            // "*.log" matches "post/error.log", "/root.log" only the root.
            if !has_internal_slash && !is_absolute {
                match_path = path.rsplit_once('/').map_or(match_path, |(_, name)| name);
            }

            let is_match = wildmatch(
                text.as_bstr(),
                match_path.into(),
                wildmatch::Mode::NO_MATCH_SLASH_LITERAL,
            );

            if is_match {
                is_ignored = mode & MODE_NEGATIVE == 0;
            }
        }
        is_ignored
    }
}
