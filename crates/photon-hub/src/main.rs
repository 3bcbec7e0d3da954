//! # Photon Hub
//!
//! Process entry point: installs the `tracing` subscriber, loads
//! [`GlobalConfig`] from the environment, wires every component crate
//! through [`photon_hub::Hub::new`], and drives the round-trigger loop
//! that calls `turn_round()` no more often than `min_round_time_secs`
//! allows.

use anyhow::Context;
use photon_config::GlobalConfig;
use photon_hub::Hub;
use std::time::Duration;
use tracing::{error, info, warn};

fn load_config() -> anyhow::Result<GlobalConfig> {
    dotenvy::dotenv().ok();

    let settings = config::Config::builder()
        .add_source(config::Environment::with_prefix("PHOTON").separator("__"))
        .build()
        .context("loading PHOTON_* environment configuration")?;

    let cfg = match settings.try_deserialize::<GlobalConfig>() {
        Ok(cfg) => cfg,
        Err(_) => {
            warn!("no complete PHOTON_* configuration found, falling back to defaults");
            GlobalConfig::default()
        }
    };
    cfg.validate().context("validating GlobalConfig")?;
    Ok(cfg)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    photon_telemetry::init_tracing(std::env::var("PHOTON_LOG_JSON").is_ok()).context("installing tracing subscriber")?;

    info!("photon-hub starting");

    let config = load_config()?;
    let min_round_time = Duration::from_secs(config.min_round_time_secs.max(1));
    let hub = Hub::new(config).context("wiring hub subsystems")?;

    info!("photon-hub wired, entering round-trigger loop");

    let mut shutdown = Box::pin(tokio::signal::ctrl_c());
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutdown signal received, exiting round-trigger loop");
                break;
            }
            _ = tokio::time::sleep(min_round_time) => {
                match hub.turn_round() {
                    Ok(round) => info!(round, "round turned"),
                    Err(e) => error!(%e, "turn_round failed"),
                }
            }
        }
    }

    info!("photon-hub shut down gracefully");
    Ok(())
}
