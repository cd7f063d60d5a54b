//! Error types for the transport layer.
//!
//! Uses `thiserror` for typed errors that surface through subscribe,
//! unsubscribe, and point-query paths. Normalization never produces an
//! error; only transport and configuration failures do.

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Failed to connect to, subscribe on, or query the transport.
    #[error("transport error: {0}")]
    Transport(String),

    /// A point-query response could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),
}
