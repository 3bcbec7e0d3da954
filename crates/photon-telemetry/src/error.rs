use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to install global tracing subscriber: {0}")]
    SubscriberInit(String),
    #[error("failed to encode metrics: {0}")]
    MetricsEncode(#[from] prometheus::Error),
}
