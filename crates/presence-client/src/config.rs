//! Configuration for the transport layer.
//!
//! All configuration is loaded from environment variables: the NATS server
//! URL plus the credentials that form the monitor's transport key.
//!
//! Required variables:
//! - `PRESENCE_NATS_URL` -- NATS server connection string
//! - `PRESENCE_SUBSCRIBE_KEY` -- key authorizing subscriptions
//! - `PRESENCE_PUBLISH_KEY` -- key authorizing publishes
//!
//! Optional variables:
//! - `PRESENCE_IDENTITY` -- wire identity of the monitor (default
//!   `monitor`)
//! - `PRESENCE_AUTH_TOKEN` -- access token, when the platform requires one

use crate::error::ClientError;
use crate::transport::TransportKey;

/// Complete transport configuration loaded from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// NATS server URL (e.g. `nats://localhost:4222`).
    pub nats_url: String,
    /// Key authorizing subscriptions.
    pub subscribe_key: String,
    /// Key authorizing publishes.
    pub publish_key: String,
    /// The identity the monitor presents on the wire.
    pub identity: String,
    /// Optional access token.
    pub auth_token: Option<String>,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] naming the first missing required
    /// variable.
    pub fn from_env() -> Result<Self, ClientError> {
        Ok(Self {
            nats_url: required("PRESENCE_NATS_URL")?,
            subscribe_key: required("PRESENCE_SUBSCRIBE_KEY")?,
            publish_key: required("PRESENCE_PUBLISH_KEY")?,
            identity: optional("PRESENCE_IDENTITY")
                .unwrap_or_else(|| String::from("monitor")),
            auth_token: optional("PRESENCE_AUTH_TOKEN"),
        })
    }

    /// The transport key this configuration describes.
    pub fn transport_key(&self) -> TransportKey {
        TransportKey {
            subscribe_key: self.subscribe_key.clone(),
            publish_key: self.publish_key.clone(),
            identity: self.identity.clone(),
            auth_token: self.auth_token.clone(),
        }
    }
}

fn required(name: &str) -> Result<String, ClientError> {
    std::env::var(name)
        .map_err(|_| ClientError::Config(format!("missing required environment variable {name}")))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
