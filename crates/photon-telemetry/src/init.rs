//! Global subscriber installation: an env-filter-driven subscriber, plain
//! text for a terminal or JSON lines when the hub runs headless.

use crate::error::TelemetryError;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global `tracing` subscriber. `json` selects structured
/// JSON-line output (the hub's production default); otherwise a compact
/// human-readable format is used. The filter reads `RUST_LOG`, falling
/// back to `info` for every target.
pub fn init_tracing(json: bool) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = if json {
        fmt().with_env_filter(filter).json().try_init()
    } else {
        fmt().with_env_filter(filter).compact().try_init()
    };

    result.map_err(|e| TelemetryError::SubscriberInit(e.to_string()))
}
