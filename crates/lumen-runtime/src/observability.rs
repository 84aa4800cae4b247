//! Tracing subscriber setup.

use lumen_core::config::ObservabilityConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding per-target filter directives,
/// e.g. `LUMEN_LOG=lumen_ingestion=debug,lumen_graph=warn`.
pub const LOG_ENV: &str = "LUMEN_LOG";

/// Install the global subscriber. `LUMEN_LOG` wins over the configured
/// level. Returns `false` if a subscriber was already installed, so calling
/// this more than once is harmless.
pub fn init_tracing(config: &ObservabilityConfig) -> bool {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.log_format.eq_ignore_ascii_case("pretty") {
        registry
            .with(fmt::layer().pretty().with_target(true))
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .try_init()
    };
    installed.is_ok()
}
