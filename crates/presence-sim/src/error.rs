//! Error types for the simulated client pool.

use presence_client::ClientError;
use presence_types::IdentityId;

/// Errors that can occur during pool operations.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A rename collided with another live identity's display name.
    #[error("display name already in use: {name}")]
    NameCollision {
        /// The colliding name.
        name: String,
    },

    /// The referenced identity is not in the pool.
    #[error("unknown identity: {0}")]
    UnknownIdentity(IdentityId),

    /// The underlying transport failed.
    #[error(transparent)]
    Transport(#[from] ClientError),
}
