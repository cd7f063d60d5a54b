//! Shared type definitions for the presence monitoring toolkit.
//!
//! This crate is the single source of truth for the types that flow between
//! the normalizer, the reconciler, the transport layer, and the simulated
//! client pool.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for record and identity identifiers
//! - [`channel`] -- The presence-channel suffix convention and helpers
//! - [`event`] -- Canonical presence events, membership, snapshot records
//! - [`envelope`] -- Typed model of the heterogeneous wire-envelope shapes

pub mod channel;
pub mod envelope;
pub mod event;
pub mod ids;

// Re-export all public types at crate root for convenience.
pub use channel::{PRESENCE_SUFFIX, base_channel_of, is_presence_channel, presence_channel_for};
pub use envelope::{RawBody, RawEnvelope, RawMetadata};
pub use event::{
    ChannelMembership, PresenceAction, PresenceEvent, SnapshotRecord, SnapshotSubject,
};
pub use ids::{IdentityId, RecordId};
