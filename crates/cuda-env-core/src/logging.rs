//! Process-wide logging setup.
//!
//! Call sites use the `log` facade. [`init`] routes those records through
//! `tracing-log` into a `tracing-subscriber` formatter on stderr, so stdout
//! only ever carries the report.
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;

use crate::kernel::error::{Error, Result};

/// Filter directive for a `-v` count: 0 = warn, 1 = info, 2 = debug, 3+ = trace.
pub fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// `RUST_LOG` when it is set and valid, otherwise the level for `verbosity`.
pub fn filter_for(verbosity: u8) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_for_verbosity(verbosity)))
}

/// Install the global subscriber and the `log` bridge.
///
/// Fails instead of panicking when a subscriber or logger is already set.
pub fn init(verbosity: u8) -> Result<()> {
    let subscriber = tracing_subscriber::registry()
        .with(filter_for(verbosity))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false));

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Logging(format!("Failed to install tracing subscriber: {}", e)))?;
    tracing_log::LogTracer::init()
        .map_err(|e| Error::Logging(format!("Failed to bridge log records: {}", e)))?;

    log::debug!("Logging initialised at verbosity {}", verbosity);
    Ok(())
}
