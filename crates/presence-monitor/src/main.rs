//! Channel monitor binary.
//!
//! Watches one channel's presence companion and maintains a live
//! membership view. Wires together the transport registry, the snapshot
//! service, and the reconciler-owning session.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load transport configuration from the environment
//! 3. Read the target channel from `PRESENCE_CHANNEL` or the first argument
//! 4. Connect the monitor's transport handle and register it
//! 5. Bootstrap the channel from a here-now snapshot
//! 6. Attach the live stream and fold events until Ctrl-C
//! 7. Unsubscribe and export the history log to stdout

mod error;
mod session;

use futures::StreamExt;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use presence_client::{
    ClientConfig, NatsTransport, Registry, SnapshotService, Transport,
};
use presence_types::presence_channel_for;

use crate::error::MonitorError;
use crate::session::MonitorSession;

/// Application entry point for the channel monitor.
///
/// # Errors
///
/// Returns an error if configuration, connection, or the bootstrap query
/// fails. Live-stream and teardown failures after that point are logged,
/// not fatal.
#[tokio::main]
async fn main() -> Result<(), MonitorError> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("presence-monitor starting");

    // 2. Load configuration.
    let config = ClientConfig::from_env()?;
    let channel = target_channel()?;
    info!(
        nats_url = config.nats_url,
        identity = config.identity,
        channel = channel,
        "configuration loaded"
    );

    // 3. Connect the monitor handle and register it.
    let mut registry: Registry<NatsTransport> = Registry::new();
    let key = config.transport_key();
    let transport = match registry.get(&key) {
        Some(handle) => handle,
        None => {
            let handle = NatsTransport::connect(&config.nats_url, key.clone()).await?;
            registry.insert(key, handle)
        }
    };

    // 4. Bootstrap before attaching the live stream.
    let mut session = MonitorSession::new();
    let token = session.watch(&channel);
    let service = SnapshotService::new(transport.as_ref());
    let snapshot = service.here_now(&channel, session.history_mut()).await?;
    session.apply_bootstrap(token, &channel, snapshot.uuids, snapshot.occupancy);
    info!(
        channel = channel,
        occupancy = snapshot.occupancy,
        "channel bootstrapped"
    );

    // 5. Attach the live stream and fold events until Ctrl-C.
    let presence_channel = presence_channel_for(&channel);
    let mut stream = transport.subscribe(&presence_channel).await?;
    info!(presence_channel = presence_channel, "live stream attached");

    loop {
        tokio::select! {
            envelope = stream.next() => {
                match envelope {
                    Some(envelope) => {
                        if session.apply_envelope(&envelope) {
                            let reconciler = session.reconciler();
                            info!(
                                channel = channel,
                                occupancy = reconciler.occupancy(&channel),
                                members = ?reconciler.members(&channel),
                                "membership updated"
                            );
                        }
                    }
                    None => {
                        warn!("live stream ended");
                        break;
                    }
                }
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!(error = %e, "failed to listen for shutdown signal");
                }
                info!("shutting down");
                break;
            }
        }
    }

    // 6. Teardown: end the live stream and export the history log.
    drop(stream);
    if let Err(e) = transport.unsubscribe(&presence_channel).await {
        warn!(error = %e, "unsubscribe during shutdown failed");
    }
    println!("{}", session.export_history()?);
    Ok(())
}

/// The channel to monitor: `PRESENCE_CHANNEL` or the first CLI argument.
fn target_channel() -> Result<String, MonitorError> {
    std::env::var("PRESENCE_CHANNEL")
        .ok()
        .filter(|c| !c.is_empty())
        .or_else(|| std::env::args().nth(1))
        .ok_or_else(|| {
            MonitorError::Config(String::from(
                "set PRESENCE_CHANNEL or pass the channel as the first argument",
            ))
        })
}
