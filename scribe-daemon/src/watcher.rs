//! Real-time file watcher (deprecated in favour of the git hook and the
//! periodic sweep).
//!
//! The notify callback does nothing but forward events into an unbounded
//! channel; [`watch_loop`] drains that channel on a task, filters events and
//! drives the debouncer.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::event::{CreateKind, RemoveKind};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use scribe_core::{Config, ProjectLayout};
use scribe_sync::IgnoreOracle;

use crate::debouncer::Debouncer;
use crate::error::DaemonError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchAction {
    /// `.git/HEAD` or a ref moved: a checkout or commit is rewriting files.
    HeadMoved,
    /// A source file changed inside this (absolute) directory.
    Notify(PathBuf),
}

/// Decide what each path of `event` means for the debouncer. Paths that do
/// not matter produce nothing.
pub fn classify_event(
    layout: &ProjectLayout,
    config: &Config,
    ignore: &dyn IgnoreOracle,
    event: &Event,
) -> Vec<WatchAction> {
    if matches!(
        event.kind,
        EventKind::Access(_)
            | EventKind::Create(CreateKind::Folder)
            | EventKind::Remove(RemoveKind::Folder)
    ) {
        return Vec::new();
    }
    let mut actions = Vec::new();
    for path in &event.paths {
        let Some(action) = classify_path(layout, config, ignore, path) else {
            continue;
        };
        if !actions.contains(&action) {
            actions.push(action);
        }
    }
    actions
}

fn classify_path(
    layout: &ProjectLayout,
    config: &Config,
    ignore: &dyn IgnoreOracle,
    path: &Path,
) -> Option<WatchAction> {
    let git_dir = layout.git_dir();
    if path.starts_with(&git_dir) {
        let moved = path == git_dir.join("HEAD") || path.starts_with(git_dir.join("refs"));
        return moved.then_some(WatchAction::HeadMoved);
    }
    if layout.is_internal(config, path) || path.is_dir() {
        return None;
    }
    let rel = layout.relative(path)?;
    if !layout.in_scope(config, &rel) || ignore.is_ignored(&rel) {
        return None;
    }
    path.parent().map(|dir| WatchAction::Notify(dir.to_path_buf()))
}

/// Watch the project recursively until `shutdown` resolves. Pending
/// directories are dropped on shutdown.
pub async fn watch_loop(
    layout: &ProjectLayout,
    config: &Config,
    ignore: &dyn IgnoreOracle,
    debouncer: &Debouncer,
    shutdown: impl Future<Output = ()>,
) -> Result<(), DaemonError> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut watcher: RecommendedWatcher = notify::recommended_watcher(move |event| {
        let _ = event_tx.send(event);
    })?;
    watcher.watch(layout.root(), RecursiveMode::Recursive)?;
    tracing::info!(root = %layout.root().display(), "watching for changes");

    let suppression = config.git_suppression_window();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("watcher shutting down");
                break;
            }
            event = event_rx.recv() => {
                let Some(event) = event else {
                    tracing::warn!("watcher event channel closed");
                    break;
                };
                match event {
                    Ok(event) => dispatch(layout, config, ignore, debouncer, suppression, &event),
                    Err(err) => tracing::warn!(error = %err, "watcher error"),
                }
            }
        }
    }

    debouncer.cancel();
    drop(watcher);
    Ok(())
}

fn dispatch(
    layout: &ProjectLayout,
    config: &Config,
    ignore: &dyn IgnoreOracle,
    debouncer: &Debouncer,
    suppression: Duration,
    event: &Event,
) {
    for action in classify_event(layout, config, ignore, event) {
        match action {
            WatchAction::HeadMoved => {
                tracing::debug!("git HEAD moved; holding debouncer");
                debouncer.hold(suppression);
            }
            WatchAction::Notify(dir) => {
                tracing::trace!(dir = %dir.display(), "change");
                debouncer.notify(dir);
            }
        }
    }
}
