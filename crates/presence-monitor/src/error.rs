//! Error types for the monitor binary.

use presence_client::ClientError;
use presence_core::HistoryError;

/// Errors that can occur while running the monitor.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// The transport layer failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Monitor-specific configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// The history log could not be exported.
    #[error(transparent)]
    History(#[from] HistoryError),
}
