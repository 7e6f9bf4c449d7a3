//! Fixed-interval runner: sleep, run, and only then start the next sleep,
//! so two runs never overlap.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::DaemonError;

pub struct Scheduler {
    stop_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Must be called from within a tokio runtime.
    pub fn start<F>(interval: Duration, callback: F) -> Self
    where
        F: Fn() -> Result<(), DaemonError> + Send + Sync + 'static,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run_loop(interval, Arc::new(callback), stop_rx));
        Self {
            stop_tx,
            task: Mutex::new(Some(task)),
        }
    }

    /// Idempotent. Interrupts a pending sleep; a running callback finishes.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }

    /// Wait for the loop to drain after `stop`.
    pub async fn join(&self) {
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                tracing::error!(error = %err, "scheduler loop ended abnormally");
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_loop<F>(interval: Duration, callback: Arc<F>, mut stop_rx: watch::Receiver<bool>)
where
    F: Fn() -> Result<(), DaemonError> + Send + Sync + 'static,
{
    loop {
        if *stop_rx.borrow_and_update() {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = stop_rx.changed() => {
                // A closed channel means the scheduler handle is gone.
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
                continue;
            }
        }

        let run = Arc::clone(&callback);
        match tokio::task::spawn_blocking(move || run()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::error!(error = %err, "scheduled run failed"),
            Err(err) if err.is_panic() => tracing::error!("scheduled run panicked"),
            Err(err) => tracing::error!(error = %err, "scheduled run did not complete"),
        }
    }
    tracing::debug!("scheduler stopped");
}
