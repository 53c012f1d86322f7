//! Observer binary for the Timekeeper service.
//!
//! Connects to NATS, seeds its mirror from the authority's snapshot, and
//! applies every replicated field update to a local visual clock -- unless
//! the operator engages manual override, which detaches the display until
//! released.
//!
//! # Console commands
//!
//! ```text
//! override on|off   engage/release manual control of the visual clock
//! sync              re-apply the last authoritative snapshot
//! status            print the mirrored clock state
//! quit              disconnect
//! ```

use std::sync::Arc;

use futures::StreamExt as _;
use timekeeper_core::config::TimekeeperConfig;
use timekeeper_core::facade::{ClockApi, ClockFacade};
use timekeeper_observer::{ObserverReconciler, TracingVisualClock, VisualClock};
use timekeeper_types::{ClockReading, ClockSnapshot, FieldUpdate, SNAPSHOT_SUBJECT, STATE_SUBJECT_WILDCARD};
use tokio::io::{AsyncBufReadExt as _, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Environment variable naming the configuration file path.
const CONFIG_ENV: &str = "TIMEKEEPER_CONFIG";

/// Default configuration file path.
const CONFIG_PATH: &str = "clock-config.yaml";

/// Application entry point for the clock observer.
///
/// # Errors
///
/// Returns an error if the NATS connection or subscription fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("timekeeper-client starting");

    let config = load_config();
    let nats_url = &config.infrastructure.nats_url;
    info!(nats_url, "Connecting to NATS");
    let nats = async_nats::connect(nats_url).await?;

    let visual = Arc::new(TracingVisualClock::new());
    let reconciler = Arc::new(ObserverReconciler::new(visual as Arc<dyn VisualClock>));
    let facade = ClockFacade::new();
    facade.attach(Arc::clone(&reconciler) as Arc<dyn ClockApi>);

    // Subscribe before seeding so no update published in between is lost.
    let mut updates = nats.subscribe(STATE_SUBJECT_WILDCARD.to_owned()).await?;

    if config.observer.sync_on_connect {
        seed_from_snapshot(&nats, &reconciler).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(err) = result {
                    warn!(error = %err, "failed to listen for shutdown signal");
                }
                break;
            }
            message = updates.next() => {
                let Some(message) = message else { break };
                match serde_json::from_slice::<FieldUpdate>(&message.payload) {
                    Ok(update) => {
                        if let Err(err) = reconciler.apply(&update) {
                            warn!(field = %update.field, error = %err, "failed to apply replicated update");
                        }
                    }
                    Err(err) => {
                        warn!(subject = %message.subject, error = %err, "malformed replication payload");
                    }
                }
            }
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        if !handle_command(line.trim(), &facade).await {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(err) => {
                        warn!(error = %err, "failed to read command input");
                        break;
                    }
                }
            }
        }
    }

    // Teardown: drop the subscription before the mirror so no handler
    // runs against a dismantled observer.
    drop(updates);
    facade.detach();
    info!("timekeeper-client stopped");
    Ok(())
}

/// Request the authority's snapshot and seed the mirror from it.
async fn seed_from_snapshot(nats: &async_nats::Client, reconciler: &ObserverReconciler) {
    match nats.request(SNAPSHOT_SUBJECT.to_owned(), Vec::new().into()).await {
        Ok(reply) => match serde_json::from_slice::<ClockSnapshot>(&reply.payload) {
            Ok(snapshot) => {
                reconciler.seed(&snapshot);
                info!("mirror seeded from authority snapshot");
            }
            Err(err) => warn!(error = %err, "malformed snapshot payload"),
        },
        Err(err) => {
            warn!(error = %err, "no authority snapshot available, waiting for the next publish");
        }
    }
}

/// Execute one console command. Returns `false` when the observer should
/// disconnect.
async fn handle_command(line: &str, facade: &ClockFacade) -> bool {
    let mut tokens = line.split_whitespace();
    match tokens.next().unwrap_or("") {
        "" => true,
        "override" => {
            match tokens.next() {
                Some("on") => {
                    facade.set_manual_override(true).await;
                }
                Some("off") => {
                    facade.set_manual_override(false).await;
                }
                _ => {
                    let engaged = facade.manual_override(false);
                    facade.set_manual_override(!engaged).await;
                }
            }
            println!(
                "Manual override is {}",
                if facade.manual_override(false) { "on" } else { "off" }
            );
            true
        }
        "sync" => {
            facade.sync().await;
            println!("Visual clock resynchronized");
            true
        }
        "status" => {
            let reading = facade.reading(ClockReading::epoch_default());
            println!(
                "{:04}-{:02}-{:02} {:02}:{:02}:{:02} ({}, {}ms/min{}{})",
                reading.year,
                reading.month,
                reading.day,
                reading.hour,
                reading.minute,
                reading.second,
                if reading.is_day { "day" } else { "night" },
                reading.current_ms_per_minute,
                if reading.paused { ", paused" } else { "" },
                if facade.manual_override(false) {
                    ", override"
                } else {
                    ""
                }
            );
            true
        }
        "quit" | "exit" => false,
        _ => {
            println!("commands: override [on|off] | sync | status | quit");
            true
        }
    }
}

/// Load the configuration file, falling back to defaults when the file
/// does not exist.
fn load_config() -> TimekeeperConfig {
    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| CONFIG_PATH.to_owned());
    let path = std::path::Path::new(&path);
    if path.exists() {
        match TimekeeperConfig::from_file(path) {
            Ok(config) => config,
            Err(err) => {
                warn!(error = %err, "failed to load configuration, using defaults");
                TimekeeperConfig::default()
            }
        }
    } else {
        info!(path = %path.display(), "no configuration file, using defaults");
        let mut config = TimekeeperConfig::default();
        config.infrastructure.apply_env_overrides();
        config
    }
}
