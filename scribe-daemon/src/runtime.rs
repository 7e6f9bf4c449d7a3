//! Blocking entry points for callers without a tokio runtime of their own.

use std::future::Future;
use std::sync::Arc;

use crate::coordinator::TriggerCoordinator;
use crate::error::{io_err, DaemonError};

fn block_on<F>(future: F) -> Result<F::Output, DaemonError>
where
    F: Future,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io_err("tokio-runtime", err))?;
    Ok(runtime.block_on(future))
}

/// Periodic gated sweeps until ctrl-c.
pub fn watch_blocking(coordinator: Arc<TriggerCoordinator>) -> Result<(), DaemonError> {
    block_on(coordinator.run_watch())?
}

/// Real-time watcher until ctrl-c.
pub fn watchdog_blocking(coordinator: Arc<TriggerCoordinator>) -> Result<(), DaemonError> {
    block_on(coordinator.run_watchdog())?
}
