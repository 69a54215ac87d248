// crates/edge/src/telemetry.rs

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the process-wide subscriber. Safe to call more than once; later
/// calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_file(true).with_line_number(true))
        .try_init();
}
