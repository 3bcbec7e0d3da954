//! Process-wide Prometheus counters (teacher pattern:
//! ``, ``).
//! Declared once here rather than per-crate, since the hub's
//! `photon-bus` subscriber is the single place that observes every
//! component's published events and can bump them without every
//! component crate taking a `prometheus` dependency of its own.

use crate::error::TelemetryError;
use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref OPERATIONS_PROPOSED_TOTAL: IntCounter =
        register(IntCounter::with_opts(Opts::new("photon_operations_proposed_total", "Operations proposed to the registry")).unwrap());
    pub static ref OPERATIONS_APPROVED_TOTAL: IntCounter =
        register(IntCounter::with_opts(Opts::new("photon_operations_approved_total", "Operations that crossed the proof threshold")).unwrap());
    pub static ref OPERATIONS_EXECUTED_TOTAL: IntCounter =
        register(IntCounter::with_opts(Opts::new("photon_operations_executed_total", "Operations confirmed executed by watchers")).unwrap());
    pub static ref GOV_MESSAGES_EMITTED_TOTAL: IntCounter =
        register(IntCounter::with_opts(Opts::new("photon_gov_messages_emitted_total", "Governance messages handed to the endpoint transport")).unwrap());
    pub static ref BETS_PLACED_TOTAL: IntCounterVec = register(
        IntCounterVec::new(Opts::new("photon_bets_placed_total", "Bets placed, by type"), &["bet_type"]).unwrap()
    );
    pub static ref ROUNDS_TURNED_TOTAL: IntCounter =
        register(IntCounter::with_opts(Opts::new("photon_rounds_turned_total", "Completed turn_round cycles")).unwrap());
    pub static ref CURRENT_ROUND: IntGauge =
        register(IntGauge::with_opts(Opts::new("photon_current_round", "The round number currently active")).unwrap());
}

fn register<T: Clone + prometheus::core::Collector + 'static>(metric: T) -> T {
    REGISTRY.register(Box::new(metric.clone())).expect("metric names are unique and registered once");
    metric
}

/// Renders the registry in Prometheus text exposition format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let families = REGISTRY.gather();
    let mut buf = Vec::new();
    TextEncoder::new().encode(&families, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_metrics_includes_registered_names() {
        OPERATIONS_PROPOSED_TOTAL.inc();
        let text = encode_metrics().unwrap();
        assert!(text.contains("photon_operations_proposed_total"));
    }
}
