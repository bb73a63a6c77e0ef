//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// Common Defaults
// ============================================================================

pub fn r#true() -> bool {
    true
}

// ============================================================================
// [build] Section Defaults
// ============================================================================

pub mod build {
    use std::path::PathBuf;

    pub fn content() -> PathBuf {
        "content".into()
    }

    pub fn output() -> PathBuf {
        ".lode".into()
    }
}

// ============================================================================
// [[types]] Defaults
// ============================================================================

pub mod types {
    /// Markdown-family patterns used when a type declares none.
    pub fn patterns() -> Vec<String> {
        [
            "**/*.md",
            "**/*.markdown",
            "**/*.mdown",
            "**/*.mdx",
            "**/*.mdoc",
        ]
        .map(str::to_owned)
        .to_vec()
    }
}
