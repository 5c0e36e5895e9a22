//! Diagnostic tracing.
//!
//! Operator-facing output (summaries, prompts, validation errors) goes through
//! [`crate::io::operator::Operator`] on stdout. Tracing is for diagnostics only
//! and writes to stderr, filtered by `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. Defaults to `warn` when `RUST_LOG` is unset.
///
/// ```bash
/// RUST_LOG=cfdeploy=debug cfdeploy change security_group=web
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
