//! Tracing subscriber bootstrap.

use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LogSettings;

/// `RUST_LOG` wins over the configured filter when it is set and valid.
pub fn env_filter(settings: &LogSettings) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.filter))
}

/// Installs the global subscriber. Also bridges `log` records, so actix's
/// access log lands in the same output.
pub fn init(settings: &LogSettings) {
    if let Err(e) = fmt()
        .with_env_filter(env_filter(settings))
        .with_file(true)
        .with_line_number(true)
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }
}
