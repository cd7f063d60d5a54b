//! Production transport over NATS.
//!
//! One [`NatsTransport`] wraps one `async_nats::Client` under one identity.
//! Channel names map directly to subjects; the presence companion of base
//! channel `C` is the subject `C-pnpres`. Joining a base channel announces
//! a join envelope on the companion, leaving announces a leave; the
//! envelopes are the same long-form shape the loopback broker emits.
//!
//! Point queries go over request-reply on the control subjects
//! `presence.herenow.{channel}` and `presence.wherenow.{uuid}`, answered
//! by the platform's presence daemon.

use std::collections::BTreeSet;

use chrono::Utc;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, info};

use presence_types::{is_presence_channel, presence_channel_for};

use crate::error::ClientError;
use crate::transport::{
    EventStream, HereNowResponse, Transport, TransportKey, WhereNowResponse,
};

/// One NATS connection presenting one identity.
pub struct NatsTransport {
    client: async_nats::Client,
    key: TransportKey,
    /// Base channels this handle has joined, for leave announcements.
    joined: Mutex<BTreeSet<String>>,
}

impl NatsTransport {
    /// Connect to a NATS server under the given handle key.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] if the connection cannot be
    /// established.
    pub async fn connect(url: &str, key: TransportKey) -> Result<Self, ClientError> {
        info!(url = url, identity = %key.identity, "connecting to NATS server");
        let client = async_nats::ConnectOptions::new()
            .name(key.identity.clone())
            .connect(url)
            .await
            .map_err(|e| ClientError::Transport(format!("failed to connect to {url}: {e}")))?;
        info!("NATS connection established");
        Ok(Self {
            client,
            key,
            joined: Mutex::new(BTreeSet::new()),
        })
    }

    /// The key this handle was opened under.
    pub const fn key(&self) -> &TransportKey {
        &self.key
    }

    async fn publish_envelope(&self, subject: &str, envelope: &Value) -> Result<(), ClientError> {
        let payload = serde_json::to_vec(envelope)?;
        self.client
            .publish(subject.to_owned(), payload.into())
            .await
            .map_err(|e| ClientError::Transport(format!("failed to publish to {subject}: {e}")))
    }

    fn announcement(&self, presence_channel: &str, action: &str) -> Value {
        let timestamp = Utc::now().timestamp();
        json!({
            "channel": presence_channel,
            "subscription": presence_channel,
            "message": {
                "action": action,
                "uuid": self.key.identity,
                "timestamp": timestamp,
            },
            "publisher": self.key.identity,
            "timetoken": timestamp.saturating_mul(10_000_000).to_string(),
        })
    }
}

/// Reply shape of the presence daemon's here-now endpoint.
#[derive(Debug, Deserialize)]
struct HereNowReply {
    occupancy: u32,
    #[serde(default)]
    occupants: Vec<String>,
}

/// Reply shape of the presence daemon's where-now endpoint.
#[derive(Debug, Deserialize)]
struct WhereNowReply {
    #[serde(default)]
    channels: Vec<String>,
}

impl Transport for NatsTransport {
    fn identity(&self) -> &str {
        &self.key.identity
    }

    async fn subscribe(&self, channel: &str) -> Result<EventStream, ClientError> {
        debug!(channel = channel, "subscribing");
        let subscriber = self
            .client
            .subscribe(channel.to_owned())
            .await
            .map_err(|e| ClientError::Transport(format!("failed to subscribe to {channel}: {e}")))?;

        if !is_presence_channel(channel) {
            let newly_joined = self.joined.lock().await.insert(channel.to_owned());
            if newly_joined {
                let presence = presence_channel_for(channel);
                let envelope = self.announcement(&presence, "join");
                self.publish_envelope(&presence, &envelope).await?;
            }
        }

        // Envelopes that are not JSON are dropped here; the normalizer
        // would reject them anyway.
        let stream = subscriber
            .filter_map(|msg| async move { serde_json::from_slice::<Value>(&msg.payload).ok() });
        Ok(Box::pin(stream))
    }

    async fn unsubscribe(&self, channel: &str) -> Result<(), ClientError> {
        if is_presence_channel(channel) {
            return Ok(());
        }
        let was_joined = self.joined.lock().await.remove(channel);
        if was_joined {
            let presence = presence_channel_for(channel);
            let envelope = self.announcement(&presence, "leave");
            self.publish_envelope(&presence, &envelope).await?;
        }
        debug!(channel = channel, "unsubscribed");
        Ok(())
    }

    async fn here_now(&self, channel: &str) -> Result<HereNowResponse, ClientError> {
        let subject = format!("presence.herenow.{channel}");
        let reply = self
            .client
            .request(subject.clone(), Vec::<u8>::new().into())
            .await
            .map_err(|e| ClientError::Transport(format!("here-now request failed: {e}")))?;
        let raw: Value = serde_json::from_slice(&reply.payload)?;
        let parsed: HereNowReply = serde_json::from_value(raw.clone())?;
        Ok(HereNowResponse {
            occupancy: parsed.occupancy,
            uuids: parsed.occupants,
            raw,
        })
    }

    async fn where_now(&self, uuid: &str) -> Result<WhereNowResponse, ClientError> {
        let subject = format!("presence.wherenow.{uuid}");
        let reply = self
            .client
            .request(subject.clone(), Vec::<u8>::new().into())
            .await
            .map_err(|e| ClientError::Transport(format!("where-now request failed: {e}")))?;
        let raw: Value = serde_json::from_slice(&reply.payload)?;
        let parsed: WhereNowReply = serde_json::from_value(raw.clone())?;
        Ok(WhereNowResponse {
            channels: parsed.channels,
            raw,
        })
    }
}

impl std::fmt::Debug for NatsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsTransport")
            .field("identity", &self.key.identity)
            .finish_non_exhaustive()
    }
}
