//! Process-wide tracing subscriber.

use tracing_subscriber::{fmt, EnvFilter};

/// Set to `1` (or `true`) for JSON log lines instead of human-readable ones.
pub const LOG_JSON_ENV: &str = "SCRIBE_LOG_JSON";

/// Install the `fmt` subscriber. Honors `RUST_LOG`, defaulting to `info`.
/// Records emitted through the `log` facade are forwarded as well. Calling
/// this more than once is harmless.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = if json_requested() {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

fn json_requested() -> bool {
    std::env::var(LOG_JSON_ENV)
        .map(|value| matches!(value.trim(), "1" | "true" | "TRUE" | "yes"))
        .unwrap_or(false)
}
