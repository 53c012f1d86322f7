//! Replication bridge: fan bus updates out over NATS and answer snapshot
//! requests from late joiners.
//!
//! Each [`FieldUpdate`] is JSON-encoded and published on the subject
//! derived from its field (`clock.state.<suffix>`). Observers that
//! connect after the authority started request the latest full state on
//! `clock.snapshot` instead of replaying history.

use std::sync::Arc;

use futures::StreamExt as _;
use timekeeper_core::authority::ClockAuthority;
use timekeeper_types::{FieldUpdate, SNAPSHOT_SUBJECT};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Forward every bus update to NATS until the bus closes.
///
/// Best-effort like the bus itself: serialization or publish failures are
/// logged and the next update proceeds; a lagged receiver skips to the
/// newest updates.
pub async fn run_bridge(
    mut updates: broadcast::Receiver<FieldUpdate>,
    client: async_nats::Client,
) {
    info!("replication bridge running");
    loop {
        match updates.recv().await {
            Ok(update) => {
                let subject = update.field.subject();
                match serde_json::to_vec(&update) {
                    Ok(payload) => {
                        if let Err(err) = client.publish(subject.clone(), payload.into()).await {
                            warn!(subject, error = %err, "failed to publish field update");
                        } else {
                            debug!(subject, field = %update.field, "field update bridged");
                        }
                    }
                    Err(err) => {
                        warn!(field = %update.field, error = %err, "failed to serialize field update");
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "replication bridge lagged, skipping to newest");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    info!("replication bridge stopped");
}

/// Serve the latest full-state snapshot to observers requesting it on
/// [`SNAPSHOT_SUBJECT`].
pub async fn run_snapshot_responder(authority: Arc<ClockAuthority>, client: async_nats::Client) {
    let mut requests = match client.subscribe(SNAPSHOT_SUBJECT.to_owned()).await {
        Ok(sub) => sub,
        Err(err) => {
            warn!(error = %err, "failed to subscribe to snapshot requests, late joiners will wait for the next publish");
            return;
        }
    };
    info!("snapshot responder running");

    while let Some(request) = requests.next().await {
        let Some(reply) = request.reply else {
            continue;
        };
        let snapshot = authority.bus().snapshot();
        match serde_json::to_vec(&snapshot) {
            Ok(payload) => {
                if let Err(err) = client.publish(reply, payload.into()).await {
                    warn!(error = %err, "failed to answer snapshot request");
                } else {
                    debug!("snapshot served to late joiner");
                }
            }
            Err(err) => warn!(error = %err, "failed to serialize snapshot"),
        }
    }
}
