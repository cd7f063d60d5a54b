//! The transport seam: subscribe streams and point queries.
//!
//! Every transport handle represents one connection under one identity.
//! Handles are exclusively owned by whichever component created them (one
//! monitor handle, one handle per simulated identity) and must be
//! explicitly unsubscribed to announce departure; dropping the event
//! stream is the only cancellation primitive for in-flight delivery.

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClientError;

/// A live stream of raw wire envelopes for one channel.
pub type EventStream = BoxStream<'static, Value>;

/// Deterministic key identifying one transport handle.
///
/// The composition root owns a [`crate::Registry`] keyed by this tuple;
/// two handles with equal keys are interchangeable and cached as one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransportKey {
    /// Key authorizing subscriptions.
    pub subscribe_key: String,
    /// Key authorizing publishes.
    pub publish_key: String,
    /// The identity this handle presents on the wire.
    pub identity: String,
    /// Optional access token.
    pub auth_token: Option<String>,
}

/// Result of a here-now point query: who is on a channel right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HereNowResponse {
    /// Number of identities present.
    pub occupancy: u32,
    /// The identities present, sorted.
    pub uuids: Vec<String>,
    /// The raw transport response, kept for the history log.
    pub raw: Value,
}

/// Result of a where-now point query: which channels an identity is on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhereNowResponse {
    /// The channels the identity currently occupies, sorted.
    pub channels: Vec<String>,
    /// The raw transport response, kept for the history log.
    pub raw: Value,
}

/// One transport connection under one identity.
///
/// Subscribing to a base channel announces a join on its presence channel;
/// unsubscribing announces a leave. Subscribing to a presence channel is a
/// pure observation and announces nothing. Point queries fail explicitly
/// on transport failure; nothing here silently defaults.
pub trait Transport {
    /// The identity this handle presents on the wire.
    fn identity(&self) -> &str;

    /// Subscribe to a channel, returning its envelope stream.
    fn subscribe(
        &self,
        channel: &str,
    ) -> impl std::future::Future<Output = Result<EventStream, ClientError>> + Send;

    /// Unsubscribe from a channel, announcing departure when the handle
    /// had joined it. Idempotent.
    fn unsubscribe(
        &self,
        channel: &str,
    ) -> impl std::future::Future<Output = Result<(), ClientError>> + Send;

    /// Point query: current occupants of a channel.
    fn here_now(
        &self,
        channel: &str,
    ) -> impl std::future::Future<Output = Result<HereNowResponse, ClientError>> + Send;

    /// Point query: channels an identity currently occupies.
    fn where_now(
        &self,
        uuid: &str,
    ) -> impl std::future::Future<Output = Result<WhereNowResponse, ClientError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_keys_hash_equal() {
        use std::collections::HashMap;
        let key = TransportKey {
            subscribe_key: String::from("sub"),
            publish_key: String::from("pub"),
            identity: String::from("monitor"),
            auth_token: None,
        };
        let mut map = HashMap::new();
        map.insert(key.clone(), 1);
        assert_eq!(map.get(&key), Some(&1));
    }

    #[test]
    fn differing_identity_differs() {
        let a = TransportKey {
            subscribe_key: String::from("sub"),
            publish_key: String::from("pub"),
            identity: String::from("alice"),
            auth_token: None,
        };
        let mut b = a.clone();
        b.identity = String::from("bob");
        assert_ne!(a, b);
    }
}
