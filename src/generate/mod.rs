//! Generation pass orchestration.
//!
//! One pass compiles every declared document type:
//!
//! ```text
//! run()
//!     │
//!     ├── ensure output directories
//!     ├── write entry artifacts (package.json, generated/index.mjs)
//!     ├── process_type() per declared type ──► per-type artifacts
//!     ├── flush queued assets
//!     ├── persist the cache
//!     └── report aggregate counts
//! ```
//!
//! The pass owns no state of its own: the config and cache are borrowed
//! from the caller, which is what lets the watch loop re-run passes
//! against the same in-memory cache.

pub mod assets;
pub mod collection;
pub mod discover;
pub mod output;

use crate::bundler::{Bundler, CmarkBundler};
use crate::cache::Cache;
use crate::config::LodeConfig;
use crate::content::ident::plural_s;
use crate::log;
use crate::schema::helpers::{AssetQueue, SchemaHelpers};
use anyhow::{Context, Result};
use std::fs;
use std::ops::AddAssign;

/// Aggregate counts for one generation pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    /// Documents served from the cache.
    pub cached: usize,
    /// Documents recompiled this pass.
    pub generated: usize,
    /// All documents seen.
    pub total: usize,
}

impl AddAssign for Summary {
    fn add_assign(&mut self, other: Self) {
        self.cached += other.cached;
        self.generated += other.generated;
        self.total += other.total;
    }
}

/// Run one generation pass with the built-in bundler.
pub fn run(config: &LodeConfig, cache: &mut Cache) -> Result<Summary> {
    run_with_bundler(config, cache, &CmarkBundler)
}

/// Run one generation pass with a caller-provided bundler.
pub fn run_with_bundler(
    config: &LodeConfig,
    cache: &mut Cache,
    bundler: &dyn Bundler,
) -> Result<Summary> {
    for dir in [config.generated_dir(), config.assets_dir()] {
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let type_names: Vec<&str> = config.types.iter().map(|d| d.name.as_str()).collect();
    output::write_entry_artifacts(&config.output_dir(), &config.generated_dir(), &type_names)?;

    let content_dir = config.content_dir();
    let asset_queue = AssetQueue::new();
    let helpers = SchemaHelpers::new(&content_dir, &asset_queue);

    let mut summary = Summary::default();
    for def in &config.types {
        let type_summary = collection::process_type(def, config, cache, &helpers, bundler)?;
        log!(
            "generate";
            "{}: {} compiled, {} cached",
            def.name, type_summary.generated, type_summary.cached
        );
        summary += type_summary;
    }

    assets::flush(&asset_queue, &config.assets_dir())?;
    cache.save()?;

    log!(
        "generate";
        "{} document{} total ({} compiled, {} cached)",
        summary.total, plural_s(summary.total), summary.generated, summary.cached
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn setup(config_toml: &str) -> (TempDir, LodeConfig) {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("lode.toml");
        fs::write(&config_path, config_toml).unwrap();
        let config = LodeConfig::from_path(&config_path).unwrap();
        (dir, config)
    }

    fn write_file(dir: &TempDir, rel: &str, content: &str) -> PathBuf {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    const TWO_TYPES: &str = "[[types]]\nname = \"post\"\n\n[[types]]\nname = \"page\"";

    #[test]
    fn test_full_pass_writes_everything() {
        let (dir, config) = setup(TWO_TYPES);
        write_file(&dir, "content/post/a.md", "+++\n+++\nA");
        write_file(&dir, "content/page/about.md", "+++\n+++\nAbout");

        let mut cache = Cache::load(config.cache_path());
        let summary = run(&config, &mut cache).unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.generated, 2);

        let out = config.output_dir();
        assert!(out.join("package.json").exists());
        assert!(out.join("cache.json").exists());
        assert!(out.join("generated/index.mjs").exists());
        assert!(out.join("generated/post/index.json").exists());
        assert!(out.join("generated/page/index.json").exists());
        assert!(out.join("assets").is_dir());
    }

    #[test]
    fn test_idempotent_second_pass() {
        let (dir, config) = setup(TWO_TYPES);
        write_file(&dir, "content/post/a.md", "+++\n+++\nA");
        write_file(&dir, "content/page/b.md", "+++\n+++\nB");

        let mut cache = Cache::load(config.cache_path());
        run(&config, &mut cache).unwrap();

        let second = run(&config, &mut cache).unwrap();
        assert_eq!(second.generated, 0);
        assert_eq!(second.cached, second.total);
        assert_eq!(second.total, 2);
    }

    #[test]
    fn test_cache_survives_process_restart() {
        let (dir, config) = setup(TWO_TYPES);
        write_file(&dir, "content/post/a.md", "+++\n+++\nA");

        let mut cache = Cache::load(config.cache_path());
        run(&config, &mut cache).unwrap();
        drop(cache);

        // a fresh load of the persisted store still serves hits
        let mut cache = Cache::load(config.cache_path());
        let summary = run(&config, &mut cache).unwrap();
        assert_eq!(summary.generated, 0);
        assert_eq!(summary.cached, 1);
    }

    #[test]
    fn test_summary_aggregates_across_types() {
        let (dir, config) = setup(TWO_TYPES);
        write_file(&dir, "content/post/a.md", "+++\n+++\nA");
        write_file(&dir, "content/post/b.md", "+++\n+++\nB");
        write_file(&dir, "content/page/c.md", "+++\n+++\nC");

        let mut cache = Cache::load(config.cache_path());
        let summary = run(&config, &mut cache).unwrap();
        assert_eq!(summary.total, 3);
    }

    #[test]
    fn test_summary_add_assign() {
        let mut a = Summary {
            cached: 1,
            generated: 2,
            total: 3,
        };
        a += Summary {
            cached: 4,
            generated: 5,
            total: 9,
        };
        assert_eq!(a.cached, 5);
        assert_eq!(a.generated, 7);
        assert_eq!(a.total, 12);
    }
}
