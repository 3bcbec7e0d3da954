//! # Photon Telemetry
//!
//! `tracing-subscriber` initialization and the process-wide Prometheus
//! registry (dropped `opentelemetry`/Tempo/Loki, noted as a dependency drop
//! in `DESIGN.md`).

pub mod error;
pub mod init;
pub mod metrics;

pub use error::TelemetryError;
pub use init::init_tracing;
pub use metrics::encode_metrics;
