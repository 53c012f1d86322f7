//! Clock authority binary for the Timekeeper service.
//!
//! Wires together the durable store, the clock authority, the tick
//! scheduler, the NATS replication bridge, and the administrative command
//! loop. Runs until interrupted, then detaches the facade, stops the
//! scheduler, and persists the final instant.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `clock-config.yaml`
//! 3. Connect to Dragonfly (durable tick store)
//! 4. Start the clock authority (seeding from storage) and attach the
//!    facade
//! 5. Spawn the tick scheduler
//! 6. Connect to NATS and spawn the replication bridge + snapshot
//!    responder
//! 7. Serve administrative commands from stdin until shutdown

mod bridge;
mod command;
mod error;

use std::path::Path;
use std::sync::Arc;

use timekeeper_core::authority::ClockAuthority;
use timekeeper_core::config::TimekeeperConfig;
use timekeeper_core::facade::{ClockApi, ClockFacade};
use timekeeper_core::scheduler::run_scheduler;
use timekeeper_store::{DragonflyStore, TickStore};
use tokio::io::{AsyncBufReadExt as _, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::ServerError;

/// Environment variable naming the configuration file path.
const CONFIG_ENV: &str = "TIMEKEEPER_CONFIG";

/// Default configuration file path.
const CONFIG_PATH: &str = "clock-config.yaml";

/// Application entry point for the clock authority.
///
/// # Errors
///
/// Returns an error if any initialization step fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("timekeeper-server starting");

    // 2. Load configuration.
    let config = load_config()?;
    info!(
        day_start_hour = config.clock.day_start_hour,
        night_start_hour = config.clock.night_start_hour,
        day_ms_per_minute = config.clock.day_ms_per_minute,
        night_ms_per_minute = config.clock.night_ms_per_minute,
        start_paused = config.clock.start_paused,
        "Configuration loaded"
    );

    // 3. Connect to the durable store.
    let store: Arc<dyn TickStore> = Arc::new(
        DragonflyStore::connect(&config.infrastructure.dragonfly_url)
            .await
            .map_err(ServerError::from)?,
    );

    // 4. Start the authority and attach the facade.
    let authority = ClockAuthority::start(&config.clock, store).await;
    let facade = Arc::new(ClockFacade::new());
    facade.attach(Arc::clone(&authority) as Arc<dyn ClockApi>);

    // 5. Spawn the tick scheduler.
    let scheduler = tokio::spawn(run_scheduler(Arc::clone(&authority)));

    // 6. Connect to NATS and spawn the replication bridge.
    let nats_url = &config.infrastructure.nats_url;
    info!(nats_url, "Connecting to NATS");
    let nats = async_nats::connect(nats_url)
        .await
        .map_err(|e| ServerError::Nats {
            message: format!("failed to connect to NATS at {nats_url}: {e}"),
        })?;
    tokio::spawn(bridge::run_bridge(authority.bus().subscribe(), nats.clone()));
    tokio::spawn(bridge::run_snapshot_responder(
        Arc::clone(&authority),
        nats.clone(),
    ));
    info!("Replication bridge started");

    // 7. Administrative command loop until shutdown.
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(err) = result {
                    warn!(error = %err, "failed to listen for shutdown signal");
                }
                break;
            }
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) if !line.trim().is_empty() => {
                        let status = command::execute(&line, &facade).await;
                        println!("{status}");
                    }
                    Ok(Some(_)) => {}
                    Ok(None) => break,
                    Err(err) => {
                        warn!(error = %err, "failed to read command input");
                        break;
                    }
                }
            }
        }
    }

    // Shutdown: callers degrade to defaults, the scheduler persists the
    // final instant.
    info!("timekeeper-server stopping");
    facade.detach();
    authority.request_stop();
    let _ = scheduler.await;
    info!("timekeeper-server stopped");
    Ok(())
}

/// Load the configuration file, falling back to defaults when the file
/// does not exist.
fn load_config() -> Result<TimekeeperConfig, ServerError> {
    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| CONFIG_PATH.to_owned());
    let path = Path::new(&path);
    if path.exists() {
        Ok(TimekeeperConfig::from_file(path)?)
    } else {
        info!(path = %path.display(), "no configuration file, using defaults");
        let mut config = TimekeeperConfig::default();
        config.infrastructure.apply_env_overrides();
        Ok(config)
    }
}
