//! Update triggers for scribe: the sweep cursor and its skip-if-unchanged
//! gate, the debouncer, the fixed-interval scheduler, the (deprecated)
//! real-time watcher, the git post-commit hook and hook-log rotation.
//!
//! [`TriggerCoordinator`] is the entry point the CLI drives.

pub mod coordinator;
pub mod cursor;
pub mod debouncer;
mod error;
pub mod gate;
pub mod hook;
pub mod log_rotation;
mod logging;
mod runtime;
pub mod scheduler;
pub mod watcher;

pub use coordinator::TriggerCoordinator;
pub use cursor::{CursorStore, SweepCursor};
pub use debouncer::{Debouncer, DebouncerState};
pub use error::DaemonError;
pub use gate::GateDecision;
pub use hook::{InstallOutcome, UninstallOutcome};
pub use logging::{init_tracing, LOG_JSON_ENV};
pub use runtime::{watch_blocking, watchdog_blocking};
pub use scheduler::Scheduler;
