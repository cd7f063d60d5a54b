//! In-process transport: a broker that fans out presence envelopes.
//!
//! The loopback broker keeps a per-channel occupant registry and a
//! broadcast sender per subject. Subscribing a handle to a base channel
//! registers its identity and emits a join envelope on the channel's
//! presence companion; unsubscribing emits a leave. Point queries read the
//! registry directly. The envelopes are byte-for-byte the same long-form
//! shape the production transport announces, so everything downstream of
//! the normalizer behaves identically in tests and demos.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use serde_json::{Value, json};
use tokio::sync::{RwLock, broadcast};
use tracing::debug;

use presence_types::{is_presence_channel, presence_channel_for};

use crate::error::ClientError;
use crate::transport::{EventStream, HereNowResponse, Transport, WhereNowResponse};

/// Capacity of each channel's broadcast fan-out.
///
/// A subscriber that falls behind by more than this many envelopes skips
/// ahead to the newest one.
const BROADCAST_CAPACITY: usize = 256;

#[derive(Debug)]
struct ChannelState {
    occupants: BTreeSet<String>,
    sender: broadcast::Sender<Value>,
}

impl ChannelState {
    fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            occupants: BTreeSet::new(),
            sender,
        }
    }
}

#[derive(Debug, Default)]
struct BrokerState {
    channels: HashMap<String, ChannelState>,
}

impl BrokerState {
    fn channel_mut(&mut self, name: &str) -> &mut ChannelState {
        self.channels
            .entry(name.to_owned())
            .or_insert_with(ChannelState::new)
    }
}

/// Shared in-process broker. Cloning is cheap; all clones see one state.
#[derive(Debug, Clone, Default)]
pub struct LoopbackBroker {
    state: Arc<RwLock<BrokerState>>,
}

impl LoopbackBroker {
    /// Create an empty broker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a transport handle on this broker under `identity`.
    pub fn handle(&self, identity: impl Into<String>) -> LoopbackTransport {
        LoopbackTransport {
            broker: self.clone(),
            identity: identity.into(),
        }
    }
}

/// One loopback connection under one identity.
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    broker: LoopbackBroker,
    identity: String,
}

impl Transport for LoopbackTransport {
    fn identity(&self) -> &str {
        &self.identity
    }

    async fn subscribe(&self, channel: &str) -> Result<EventStream, ClientError> {
        let mut state = self.broker.state.write().await;
        let receiver = state.channel_mut(channel).sender.subscribe();

        // Joining a base channel announces presence; watching a presence
        // channel is pure observation.
        if !is_presence_channel(channel) {
            let newly_joined = state
                .channel_mut(channel)
                .occupants
                .insert(self.identity.clone());
            if newly_joined {
                let occupancy = occupant_count(state.channel_mut(channel));
                announce(&mut state, channel, "join", &self.identity, occupancy);
            }
        }
        drop(state);

        debug!(channel = channel, identity = %self.identity, "loopback subscribed");
        Ok(broadcast_stream(receiver))
    }

    async fn unsubscribe(&self, channel: &str) -> Result<(), ClientError> {
        if is_presence_channel(channel) {
            return Ok(());
        }
        let mut state = self.broker.state.write().await;
        let was_present = state
            .channel_mut(channel)
            .occupants
            .remove(&self.identity);
        if was_present {
            let occupancy = occupant_count(state.channel_mut(channel));
            announce(&mut state, channel, "leave", &self.identity, occupancy);
        }
        drop(state);

        debug!(channel = channel, identity = %self.identity, "loopback unsubscribed");
        Ok(())
    }

    async fn here_now(&self, channel: &str) -> Result<HereNowResponse, ClientError> {
        let state = self.broker.state.read().await;
        let uuids: Vec<String> = state
            .channels
            .get(channel)
            .map(|c| c.occupants.iter().cloned().collect())
            .unwrap_or_default();
        drop(state);
        let occupancy = u32::try_from(uuids.len()).unwrap_or(u32::MAX);
        let raw = json!({ "occupancy": occupancy, "occupants": uuids });
        Ok(HereNowResponse {
            occupancy,
            uuids,
            raw,
        })
    }

    async fn where_now(&self, uuid: &str) -> Result<WhereNowResponse, ClientError> {
        let state = self.broker.state.read().await;
        let mut channels: Vec<String> = state
            .channels
            .iter()
            .filter(|(name, c)| !is_presence_channel(name) && c.occupants.contains(uuid))
            .map(|(name, _)| name.clone())
            .collect();
        drop(state);
        channels.sort_unstable();
        let raw = json!({ "channels": channels });
        Ok(WhereNowResponse { channels, raw })
    }
}

/// Count a channel's occupants as a wire occupancy value.
fn occupant_count(channel: &ChannelState) -> u32 {
    u32::try_from(channel.occupants.len()).unwrap_or(u32::MAX)
}

/// Emit one presence envelope on a base channel's presence companion.
fn announce(state: &mut BrokerState, base: &str, action: &str, identity: &str, occupancy: u32) {
    let presence = presence_channel_for(base);
    let envelope = presence_envelope(&presence, action, identity, occupancy);
    // Send fails only when nobody is watching; that is not an error.
    let _ = state.channel_mut(&presence).sender.send(envelope);
}

/// Build the long-form presence envelope the production transport emits.
fn presence_envelope(presence_channel: &str, action: &str, identity: &str, occupancy: u32) -> Value {
    let timestamp = Utc::now().timestamp();
    let timetoken = timestamp.saturating_mul(10_000_000);
    json!({
        "channel": presence_channel,
        "subscription": presence_channel,
        "message": {
            "action": action,
            "uuid": identity,
            "occupancy": occupancy,
            "timestamp": timestamp,
        },
        "publisher": identity,
        "timetoken": timetoken.to_string(),
    })
}

/// Wrap a broadcast receiver as an envelope stream, skipping lag gaps.
fn broadcast_stream(receiver: broadcast::Receiver<Value>) -> EventStream {
    Box::pin(futures::stream::unfold(receiver, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(value) => return Some((value, rx)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "loopback subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }))
}
