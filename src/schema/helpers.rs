//! Helpers context handed to schema factories.
//!
//! Factories use it to register shared asset files (copied into
//! `{output}/assets/` when the pass flushes) and to turn a content-relative
//! asset path into the URL documents should reference.

use std::{
    cell::RefCell,
    path::{Path, PathBuf},
};

/// Asset files queued during a pass, flushed by the orchestrator.
///
/// The pipeline is single-threaded, so interior mutability is enough here.
#[derive(Debug, Default)]
pub struct AssetQueue {
    files: RefCell<Vec<PathBuf>>,
}

impl AssetQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a source file for copying into the assets output directory.
    pub fn push(&self, source: PathBuf) {
        let mut files = self.files.borrow_mut();
        if !files.contains(&source) {
            files.push(source);
        }
    }

    /// Take all queued files, leaving the queue empty.
    pub fn drain(&self) -> Vec<PathBuf> {
        self.files.borrow_mut().drain(..).collect()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.files.borrow().is_empty()
    }
}

/// Context available while resolving a schema for one document.
pub struct SchemaHelpers<'a> {
    content_dir: &'a Path,
    assets: &'a AssetQueue,
}

impl<'a> SchemaHelpers<'a> {
    pub fn new(content_dir: &'a Path, assets: &'a AssetQueue) -> Self {
        Self {
            content_dir,
            assets,
        }
    }

    /// The root of the content tree being compiled.
    #[allow(dead_code)] // factory surface
    pub fn content_dir(&self) -> &Path {
        self.content_dir
    }

    /// Register a content-relative asset and return its served URL.
    pub fn asset_url(&self, relative: &str) -> String {
        self.assets.push(self.content_dir.join(relative));
        let name = relative.rsplit('/').next().unwrap_or(relative);
        format!("/assets/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_url_queues_and_maps() {
        let queue = AssetQueue::new();
        let helpers = SchemaHelpers::new(Path::new("/site/content"), &queue);

        let url = helpers.asset_url("images/cover.png");
        assert_eq!(url, "/assets/cover.png");

        let queued = queue.drain();
        assert_eq!(queued, vec![PathBuf::from("/site/content/images/cover.png")]);
    }

    #[test]
    fn test_queue_dedupes() {
        let queue = AssetQueue::new();
        let helpers = SchemaHelpers::new(Path::new("/c"), &queue);
        helpers.asset_url("a.png");
        helpers.asset_url("a.png");
        assert_eq!(queue.drain().len(), 1);
    }

    #[test]
    fn test_drain_empties_queue() {
        let queue = AssetQueue::new();
        queue.push(PathBuf::from("/x"));
        assert!(!queue.is_empty());
        queue.drain();
        assert!(queue.is_empty());
    }
}
