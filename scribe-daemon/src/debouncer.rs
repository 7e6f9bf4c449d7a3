//! Coalesces bursts of directory notifications into one callback.
//!
//! Every `notify` restarts a single timer and adds its directory to the
//! pending set; when the timer survives `delay` without another notify, the
//! whole set is handed to the callback on the blocking pool. `hold` pushes
//! the fire time out while git is rewriting the working tree.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::DaemonError;

type BatchCallback = dyn Fn(BTreeSet<PathBuf>) -> Result<(), DaemonError> + Send + Sync;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebouncerState {
    Idle,
    Armed,
    /// The callback is running.
    Fired,
    Cancelled,
}

/// Cheap to clone; clones share one timer and pending set.
#[derive(Clone)]
pub struct Debouncer {
    inner: Arc<Inner>,
}

struct Inner {
    delay: Duration,
    runtime: Handle,
    callback: Box<BatchCallback>,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    pending: BTreeSet<PathBuf>,
    timer: Option<JoinHandle<()>>,
    generation: u64,
    hold_until: Option<Instant>,
    firing: usize,
    cancelled: bool,
}

impl Debouncer {
    /// Timers are spawned on `runtime`, so `notify` may be called from
    /// threads that are not part of it.
    pub fn new<F>(delay: Duration, runtime: Handle, callback: F) -> Self
    where
        F: Fn(BTreeSet<PathBuf>) -> Result<(), DaemonError> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                delay,
                runtime,
                callback: Box::new(callback),
                state: Mutex::new(State::default()),
            }),
        }
    }

    pub fn notify(&self, dir: PathBuf) {
        let mut state = self.inner.lock();
        if state.cancelled {
            return;
        }
        state.pending.insert(dir);
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.generation += 1;
        let generation = state.generation;
        let inner = Arc::clone(&self.inner);
        state.timer = Some(self.inner.runtime.spawn(inner.fire_after_quiet(generation)));
    }

    /// Defer firing until `window` has elapsed from now.
    pub fn hold(&self, window: Duration) {
        let mut state = self.inner.lock();
        if state.cancelled {
            return;
        }
        let until = Instant::now() + window;
        state.hold_until = Some(state.hold_until.map_or(until, |prev| prev.max(until)));
    }

    /// Drop pending directories and stop the timer. A callback that is
    /// already running is left to finish.
    pub fn cancel(&self) {
        let mut state = self.inner.lock();
        state.cancelled = true;
        state.pending.clear();
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
    }

    pub fn state(&self) -> DebouncerState {
        let state = self.inner.lock();
        if state.cancelled {
            DebouncerState::Cancelled
        } else if state.firing > 0 {
            DebouncerState::Fired
        } else if state.timer.is_some() {
            DebouncerState::Armed
        } else {
            DebouncerState::Idle
        }
    }

    pub fn pending(&self) -> BTreeSet<PathBuf> {
        self.inner.lock().pending.clone()
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn fire_after_quiet(self: Arc<Self>, generation: u64) {
        tokio::time::sleep(self.delay).await;

        let batch = loop {
            let hold_until = {
                let mut state = self.lock();
                if state.generation != generation || state.cancelled {
                    return;
                }
                match state.hold_until {
                    Some(until) if until > Instant::now() => until,
                    _ => {
                        state.hold_until = None;
                        state.timer = None;
                        state.firing += 1;
                        break std::mem::take(&mut state.pending);
                    }
                }
            };
            tokio::time::sleep_until(hold_until).await;
        };

        let dirs = batch.len();
        let inner = Arc::clone(&self);
        let result = tokio::task::spawn_blocking(move || (inner.callback)(batch)).await;
        match result {
            Ok(Ok(())) => tracing::debug!(dirs, "debounced batch processed"),
            Ok(Err(err)) => tracing::error!(dirs, error = %err, "debounced batch failed"),
            Err(err) if err.is_panic() => tracing::error!(dirs, "debounced batch panicked"),
            Err(err) => tracing::error!(dirs, error = %err, "debounced batch did not complete"),
        }
        self.lock().firing -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn recording(delay: Duration) -> (Debouncer, mpsc::UnboundedReceiver<BTreeSet<PathBuf>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let debouncer = Debouncer::new(delay, Handle::current(), move |batch| {
            let _ = tx.send(batch);
            Ok(())
        });
        (debouncer, rx)
    }

    fn set(dirs: &[&str]) -> BTreeSet<PathBuf> {
        dirs.iter().map(PathBuf::from).collect()
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn burst_of_notifications_fires_once_with_union() {
        let (debouncer, mut rx) = recording(Duration::from_millis(500));

        for dir in ["X", "Y", "X", "Z", "Y"] {
            debouncer.notify(PathBuf::from(dir));
            tokio::time::advance(Duration::from_millis(100)).await;
        }
        assert_eq!(debouncer.state(), DebouncerState::Armed);

        let batch = rx.recv().await.unwrap();
        assert_eq!(batch, set(&["X", "Y", "Z"]));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err(), "expected exactly one callback");
        assert_eq!(debouncer.state(), DebouncerState::Idle);
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn each_notify_restarts_the_timer() {
        let (debouncer, mut rx) = recording(Duration::from_millis(500));

        debouncer.notify(PathBuf::from("a"));
        tokio::time::advance(Duration::from_millis(400)).await;
        debouncer.notify(PathBuf::from("b"));
        tokio::time::advance(Duration::from_millis(400)).await;
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err(), "fired before the quiet period elapsed");

        assert_eq!(rx.recv().await.unwrap(), set(&["a", "b"]));
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn hold_defers_firing() {
        let (debouncer, mut rx) = recording(Duration::from_millis(100));
        let start = Instant::now();

        debouncer.hold(Duration::from_secs(2));
        debouncer.notify(PathBuf::from("src"));

        assert_eq!(rx.recv().await.unwrap(), set(&["src"]));
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn cancel_drops_pending_and_ignores_later_notifies() {
        let (debouncer, mut rx) = recording(Duration::from_millis(100));

        debouncer.notify(PathBuf::from("a"));
        debouncer.cancel();
        debouncer.notify(PathBuf::from("b"));
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(rx.try_recv().is_err());
        assert!(debouncer.pending().is_empty());
        assert_eq!(debouncer.state(), DebouncerState::Cancelled);
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn failing_callback_leaves_debouncer_usable() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let debouncer = Debouncer::new(Duration::from_millis(100), Handle::current(), move |batch| {
            let first = batch.contains(&PathBuf::from("boom"));
            let _ = tx.send(batch);
            if first {
                panic!("generator exploded");
            }
            Err(DaemonError::Callback("still failing".into()))
        });

        debouncer.notify(PathBuf::from("boom"));
        assert_eq!(rx.recv().await.unwrap(), set(&["boom"]));

        debouncer.notify(PathBuf::from("next"));
        assert_eq!(rx.recv().await.unwrap(), set(&["next"]));
    }

    #[test]
    fn notify_from_a_foreign_thread() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_time()
            .build()
            .unwrap();
        let (tx, rx) = std::sync::mpsc::channel();
        let debouncer = Debouncer::new(Duration::from_millis(20), runtime.handle().clone(), move |batch| {
            let _ = tx.send(batch);
            Ok(())
        });

        let remote = debouncer.clone();
        std::thread::spawn(move || remote.notify(PathBuf::from("pkg")))
            .join()
            .unwrap();

        let batch = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(batch, set(&["pkg"]));
    }
}
