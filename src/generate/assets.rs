//! Asset flushing.
//!
//! Schema helpers queue asset files while documents compile; at the end
//! of the pass the queue is flushed by copying each file into
//! `{output}/assets/` under its base name.

use crate::log;
use crate::schema::helpers::AssetQueue;
use anyhow::{Context, Result};
use std::{fs, path::Path};

/// Copy every queued asset into the assets output directory.
pub fn flush(queue: &AssetQueue, assets_dir: &Path) -> Result<()> {
    let files = queue.drain();
    if files.is_empty() {
        return Ok(());
    }

    for source in &files {
        let Some(name) = source.file_name() else {
            continue;
        };
        let dest = assets_dir.join(name);
        fs::copy(source, &dest).with_context(|| {
            format!(
                "failed to copy asset {} to {}",
                source.display(),
                dest.display()
            )
        })?;
    }

    log!("assets"; "flushed {} file{}", files.len(), crate::content::ident::plural_s(files.len()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_flush_copies_queued_files() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("cover.png");
        fs::write(&source, b"img").unwrap();
        let assets_dir = dir.path().join("out/assets");
        fs::create_dir_all(&assets_dir).unwrap();

        let queue = AssetQueue::new();
        queue.push(source);
        flush(&queue, &assets_dir).unwrap();

        assert!(assets_dir.join("cover.png").exists());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_flush_empty_queue_is_noop() {
        let dir = TempDir::new().unwrap();
        // assets dir absent on purpose: nothing should be touched
        flush(&AssetQueue::new(), &dir.path().join("missing")).unwrap();
    }

    #[test]
    fn test_flush_missing_source_fails() {
        let dir = TempDir::new().unwrap();
        let assets_dir = dir.path().join("assets");
        fs::create_dir_all(&assets_dir).unwrap();

        let queue = AssetQueue::new();
        queue.push(PathBuf::from("/no/such/file.png"));
        assert!(flush(&queue, &assets_dir).is_err());
    }
}
