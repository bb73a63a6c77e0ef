//! File system watcher for dev mode.
//!
//! Monitors the content directory and the configuration dependency files
//! and re-runs generation passes on change.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                       Event Loop                           │
//! │                                                            │
//! │  ┌──────────┐    ┌──────────┐    ┌──────────────────────┐  │
//! │  │ notify   │───▶│ Debouncer│───▶│   handle_changes()   │  │
//! │  │ events   │    │ (300ms)  │    │                      │  │
//! │  └──────────┘    └──────────┘    │  config dependency?  │  │
//! │                                  │  └─▶ return Restart  │  │
//! │                                  │  content change?     │  │
//! │                                  │  └─▶ invalidate +    │  │
//! │                                  │      full pass       │  │
//! │                                  └──────────────────────┘  │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Events and regenerations are handled on the caller's thread, so only
//! one pass is ever in flight. A `Restart` hands control back to the
//! outer loop in `main`, which drops this watcher before re-resolving
//! configuration; a `Shutdown` means the event channel died.
//!
//! Errors raised by a watch-triggered pass are logged here and the loop
//! keeps running: one bad edit must not kill the process.

use crate::cache::Cache;
use crate::config::LodeConfig;
use crate::generate;
use crate::log;
use anyhow::{Context, Result};
use notify::{
    Event, EventKind, RecursiveMode, Watcher,
    event::{CreateKind, RemoveKind},
};
use rustc_hash::FxHashSet;
use std::{
    env,
    path::{Path, PathBuf},
    sync::mpsc,
    time::{Duration, Instant},
};

// =============================================================================
// Constants
// =============================================================================

const DEBOUNCE_MS: u64 = 300;

/// Why the watch loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// A configuration dependency changed; rebuild config and cache from
    /// scratch and watch again.
    Restart,
    /// The event channel disconnected; stop for good.
    Shutdown,
}

// =============================================================================
// Path Utilities
// =============================================================================

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

/// Normalize a path to absolute form for reliable comparison.
///
/// Cache keys and dependency paths are derived from the canonicalized
/// config location, so watcher paths must be normalized the same way.
fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

// =============================================================================
// Debounce State
// =============================================================================

/// Batches rapid file events with a settle window, so a write in
/// progress does not trigger a premature regeneration.
struct Debouncer {
    pending: FxHashSet<PathBuf>,
    last_event: Option<Instant>,
}

impl Debouncer {
    fn new() -> Self {
        Self {
            pending: FxHashSet::default(),
            last_event: None,
        }
    }

    fn add(&mut self, event: Event) {
        for path in event.paths {
            if !is_temp_file(&path) {
                self.pending.insert(path);
            }
        }
        self.last_event = Some(Instant::now());
    }

    fn ready(&self) -> bool {
        !self.pending.is_empty()
            && self
                .last_event
                .is_some_and(|t| t.elapsed() >= Duration::from_millis(DEBOUNCE_MS))
    }

    fn take(&mut self) -> Vec<PathBuf> {
        self.last_event = None;
        self.pending.drain().collect()
    }

    fn timeout(&self) -> Duration {
        if self.pending.is_empty() {
            Duration::from_secs(60)
        } else {
            Duration::from_millis(DEBOUNCE_MS)
        }
    }
}

// =============================================================================
// Event Handling
// =============================================================================

/// File events worth reacting to: modifications, file creation and file
/// removal. Directory add/remove events and events carrying no path are
/// ignored.
fn is_relevant(event: &Event) -> bool {
    if event.paths.is_empty() {
        return false;
    }
    matches!(
        event.kind,
        EventKind::Modify(_)
            | EventKind::Create(CreateKind::File | CreateKind::Any)
            | EventKind::Remove(RemoveKind::File | RemoveKind::Any)
    )
}

/// What a batch of changes asks the loop to do next.
enum Action {
    Continue,
    Restart,
}

/// Process a debounced batch of changed paths.
///
/// A configuration dependency change wins over everything else in the
/// batch: the whole process state is about to be rebuilt, so there is no
/// point compiling against the old config first.
fn handle_changes(
    paths: &[PathBuf],
    dependencies: &FxHashSet<PathBuf>,
    config: &LodeConfig,
    cache: &mut Cache,
) -> Action {
    if paths.is_empty() {
        return Action::Continue;
    }

    let root = config.get_root();
    let mut invalidated = 0usize;

    for path in paths {
        let path = normalize_path(path);
        if dependencies.contains(&path) {
            return Action::Restart;
        }
        if cache.invalidate(&path) {
            invalidated += 1;
        }
        log!("watch"; "{}", path.strip_prefix(root).unwrap_or(&path).display());
    }

    // Only the invalidated files recompute; everything else is a cache hit
    match generate::run(config, cache) {
        Ok(summary) => {
            log!(
                "watch";
                "regenerated {} of {} ({} invalidated)",
                summary.generated, summary.total, invalidated
            );
        }
        Err(err) => {
            // keep watching; a later edit can fix the input
            log!("error"; "regeneration failed: {err:#}");
        }
    }

    Action::Continue
}

// =============================================================================
// Public API
// =============================================================================

/// Watch the content directory and configuration dependencies, re-running
/// generation passes until a restart or shutdown condition. Blocking.
pub fn watch(config: &LodeConfig, cache: &mut Cache) -> Result<WatchOutcome> {
    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx).context("Failed to create file watcher")?;

    let content_dir = config.content_dir();
    if content_dir.exists() {
        watcher
            .watch(&content_dir, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", content_dir.display()))?;
    }

    let mut dependencies = FxHashSet::default();
    for dep in config.dependency_paths() {
        if dep.exists() {
            watcher
                .watch(&dep, RecursiveMode::NonRecursive)
                .with_context(|| format!("Failed to watch {}", dep.display()))?;
        }
        dependencies.insert(normalize_path(&dep));
    }

    log_watch_summary(config, &content_dir);

    let mut debouncer = Debouncer::new();

    loop {
        match rx.recv_timeout(debouncer.timeout()) {
            Ok(Ok(event)) if is_relevant(&event) => debouncer.add(event),
            Ok(Ok(_)) => {}
            Ok(Err(e)) => log!("watch"; "error: {e}"),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if debouncer.ready()
                    && let Action::Restart =
                        handle_changes(&debouncer.take(), &dependencies, config, cache)
                {
                    return Ok(WatchOutcome::Restart);
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => return Ok(WatchOutcome::Shutdown),
        }
    }
}

/// Log watched paths, relative to the project root.
fn log_watch_summary(config: &LodeConfig, content_dir: &Path) {
    let root = config.get_root();
    let rel = |p: &Path| {
        p.strip_prefix(root)
            .unwrap_or(p)
            .display()
            .to_string()
    };

    log!("watch"; "content: {}/", rel(content_dir));
    let deps: Vec<String> = config
        .dependency_paths()
        .iter()
        .map(|p| rel(p))
        .collect();
    log!("watch"; "config: {}", deps.join(", "));
}

// =============================================================================
// Tests
// =============================================================================
