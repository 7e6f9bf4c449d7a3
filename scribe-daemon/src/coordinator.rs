//! Every way an update can be triggered funnels through
//! [`TriggerCoordinator`]: one-shot sweeps, the periodic watch loop, the
//! real-time watcher and the git hook. All of them share one orchestrator,
//! so they share its directory locks.

use std::collections::BTreeSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio::runtime::Handle;

use scribe_core::types::{FileOutcome, UpdateStats};
use scribe_core::{Config, ProjectLayout};
use scribe_sync::{DirectoryLocks, IgnoreOracle, Orchestrator, Services};

use crate::cursor::CursorStore;
use crate::debouncer::Debouncer;
use crate::error::DaemonError;
use crate::gate::{self, GateDecision};
use crate::scheduler::Scheduler;
use crate::{hook, watcher};

pub struct TriggerCoordinator {
    orchestrator: Orchestrator,
    ignore: Arc<dyn IgnoreOracle>,
    cursor: CursorStore,
    locks: Arc<DirectoryLocks>,
}

impl TriggerCoordinator {
    pub fn new(layout: ProjectLayout, config: Config, services: Services) -> Result<Self, DaemonError> {
        let cursor = CursorStore::new(layout.cursor_path());
        let ignore = Arc::clone(&services.ignore);
        let locks = Arc::new(DirectoryLocks::new());
        let orchestrator = Orchestrator::new(layout, config, services, Arc::clone(&locks))?;
        Ok(Self {
            orchestrator,
            ignore,
            cursor,
            locks,
        })
    }

    pub fn layout(&self) -> &ProjectLayout {
        self.orchestrator.layout()
    }

    pub fn config(&self) -> &Config {
        self.orchestrator.config()
    }

    pub fn cursor(&self) -> &CursorStore {
        &self.cursor
    }

    pub fn locks(&self) -> &Arc<DirectoryLocks> {
        &self.locks
    }

    /// Full, ungated pass over the configured scope.
    pub fn sweep(&self) -> Result<UpdateStats, DaemonError> {
        let stats = self.orchestrator.update_scope(&[], log_failure)?;
        tracing::info!(
            regenerated = stats.regenerated(),
            unchanged = stats.unchanged,
            failed = stats.failed,
            "sweep finished"
        );
        Ok(stats)
    }

    /// One gated sweep. `Ok(None)` when the gate found nothing newer than
    /// the previous attempt.
    pub fn run_once(&self) -> Result<Option<UpdateStats>, DaemonError> {
        let decision = gate::check(self.layout(), self.config(), &self.cursor, Utc::now())?;
        match &decision {
            GateDecision::Unchanged => {
                tracing::info!("nothing modified since the last sweep; skipping");
                return Ok(None);
            }
            GateDecision::Changed(path) => {
                tracing::debug!(path = %path.display(), "modification found since last sweep")
            }
            GateDecision::FirstSweep | GateDecision::Disabled => {}
        }
        self.sweep().map(Some)
    }

    /// Process the files committed in `rev`. The hook script rotates the
    /// log before starting this run.
    pub fn run_hook(&self, rev: &str) -> Result<UpdateStats, DaemonError> {
        let files = hook::changed_files(self.layout().root(), rev)?;
        tracing::info!(rev, files = files.len(), "processing commit");
        let stats = self.orchestrator.update_changed(&files);
        tracing::info!(
            rev,
            regenerated = stats.regenerated(),
            failed = stats.failed,
            "commit processed"
        );
        Ok(stats)
    }

    /// Debouncer callback: refresh the files directly inside `dirs`.
    pub fn update_directories(&self, dirs: BTreeSet<PathBuf>) -> Result<UpdateStats, DaemonError> {
        let dirs: Vec<PathBuf> = dirs.into_iter().collect();
        let stats = self.orchestrator.update_directories(&dirs);
        tracing::info!(
            dirs = dirs.len(),
            regenerated = stats.regenerated(),
            failed = stats.failed,
            "directories refreshed"
        );
        if stats.has_failures() {
            return Err(DaemonError::Callback(format!(
                "{} file(s) failed in {} director(ies)",
                stats.failed,
                dirs.len()
            )));
        }
        Ok(stats)
    }

    /// Gated sweep every `sweep_interval` until ctrl-c.
    pub async fn run_watch(self: Arc<Self>) -> Result<(), DaemonError> {
        self.run_watch_until(ctrl_c()).await
    }

    pub async fn run_watch_until(
        self: Arc<Self>,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), DaemonError> {
        let interval = self.config().sweep_interval();
        tracing::info!(interval_secs = interval.as_secs(), "periodic sweep started");
        let coordinator = Arc::clone(&self);
        let scheduler = Scheduler::start(interval, move || coordinator.run_once().map(|_| ()));
        shutdown.await;
        scheduler.stop();
        scheduler.join().await;
        tracing::info!("periodic sweep stopped");
        Ok(())
    }

    /// Real-time watcher until ctrl-c. Requires `watchdog_enabled`.
    pub async fn run_watchdog(self: Arc<Self>) -> Result<(), DaemonError> {
        self.run_watchdog_until(ctrl_c()).await
    }

    pub async fn run_watchdog_until(
        self: Arc<Self>,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), DaemonError> {
        if !self.config().watchdog_enabled {
            return Err(DaemonError::WatchdogDisabled);
        }
        tracing::warn!(
            "the real-time watcher is deprecated; prefer `scribe hook install` or `scribe watch`"
        );
        let coordinator = Arc::clone(&self);
        let debouncer = Debouncer::new(self.config().debounce_delay(), Handle::current(), move |dirs| {
            coordinator.update_directories(dirs).map(|_| ())
        });
        watcher::watch_loop(
            self.layout(),
            self.config(),
            self.ignore.as_ref(),
            &debouncer,
            shutdown,
        )
        .await
    }
}

fn log_failure(path: &Path, outcome: &FileOutcome) {
    if let FileOutcome::Failed(reason) = outcome {
        tracing::warn!(path = %path.display(), reason = %reason, "update failed");
    }
}

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c; shutting down");
    }
}
