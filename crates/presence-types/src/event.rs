//! Canonical presence events and membership state.
//!
//! A [`PresenceEvent`] is the normalized form of one wire envelope. It is
//! created once by the normalizer, applied once by the reconciler, and then
//! discarded. [`ChannelMembership`] is the per-channel view the reconciler
//! maintains. [`SnapshotRecord`] captures the result of one point query for
//! the history log.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::RecordId;

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// The kind of presence change an event announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PresenceAction {
    /// An identity joined the channel.
    Join,
    /// An identity left the channel deliberately.
    Leave,
    /// An identity was dropped after its heartbeat lapsed.
    Timeout,
    /// An identity changed its attached state object while present.
    StateChange,
    /// A server-side batch of joins/leaves/timeouts accumulated over an
    /// announcement interval.
    Interval,
}

impl PresenceAction {
    /// Parse the wire-level action string, case-insensitively.
    ///
    /// Returns `None` for unrecognized strings; an unknown action is a
    /// filtering outcome, not an error.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "join" => Some(Self::Join),
            "leave" => Some(Self::Leave),
            "timeout" => Some(Self::Timeout),
            "state-change" => Some(Self::StateChange),
            "interval" => Some(Self::Interval),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Canonical event
// ---------------------------------------------------------------------------

/// One normalized presence event, ready for the reconciler.
///
/// Every field except the channel pair is optional: the wire shapes vary
/// widely and the normalizer is lenient. `join`/`leave`/`timeout` are empty
/// vectors when absent. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEvent {
    /// The presence-announcement channel the envelope arrived on.
    /// Always carries the reserved presence suffix.
    pub presence_channel: String,
    /// The base channel this event describes (suffix stripped).
    pub base_channel: String,
    /// The announced action, when one was recognized.
    pub action: Option<PresenceAction>,
    /// The identity the action applies to (single-identity events).
    pub uuid: Option<String>,
    /// Authoritative occupancy asserted by the server, when present.
    pub occupancy: Option<u32>,
    /// Server-side event timestamp (epoch seconds), when present.
    pub timestamp: Option<i64>,
    /// State object attached to the identity, when present.
    pub state: Option<serde_json::Value>,
    /// Identities that joined during a batched interval.
    pub join: Vec<String>,
    /// Identities that left during a batched interval.
    pub leave: Vec<String>,
    /// Identities that timed out during a batched interval.
    pub timeout: Vec<String>,
    /// Transport-assigned publish token, when present. Carried for display
    /// only; the reconciler never orders by it.
    pub timetoken: Option<String>,
    /// The publishing identity recorded by the transport, when present.
    pub publisher: Option<String>,
}

impl PresenceEvent {
    /// Create an event carrying only the channel pair, all fields absent.
    pub fn bare(presence_channel: impl Into<String>, base_channel: impl Into<String>) -> Self {
        Self {
            presence_channel: presence_channel.into(),
            base_channel: base_channel.into(),
            action: None,
            uuid: None,
            occupancy: None,
            timestamp: None,
            state: None,
            join: Vec::new(),
            leave: Vec::new(),
            timeout: Vec::new(),
            timetoken: None,
            publisher: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

/// The reconciler's view of one base channel.
///
/// Under steady state `occupancy == members.len()`. The two may diverge
/// transiently when an authoritative occupancy arrives without an
/// accompanying member delta; the divergence resolves on the next full
/// reset or bootstrap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMembership {
    /// Identities currently believed present, sorted.
    pub members: BTreeSet<String>,
    /// Occupancy asserted by the most recent authoritative source.
    pub occupancy: u32,
}

impl ChannelMembership {
    /// Create an empty membership view.
    pub const fn new() -> Self {
        Self {
            members: BTreeSet::new(),
            occupancy: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot records
// ---------------------------------------------------------------------------

/// What a snapshot record describes: a channel or an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum SnapshotSubject {
    /// A here-now query against a channel.
    Channel(String),
    /// A where-now query against an identity.
    Identity(String),
}

impl core::fmt::Display for SnapshotSubject {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Channel(name) => write!(f, "channel {name}"),
            Self::Identity(name) => write!(f, "identity {name}"),
        }
    }
}

/// The immutable record of one successful point query.
///
/// For a channel subject, `occupancy_or_channels` is the channel's occupancy
/// and `uuids` its occupants. For an identity subject it is the number of
/// channels and `uuids` holds the channel names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Record identifier (UUID v7, time-ordered).
    pub id: RecordId,
    /// What was queried.
    pub subject: SnapshotSubject,
    /// Occupancy (channel subject) or channel count (identity subject).
    pub occupancy_or_channels: u32,
    /// Occupant identities or channel names, depending on the subject.
    pub uuids: Vec<String>,
    /// When the query resolved.
    pub captured_at: DateTime<Utc>,
    /// The raw transport response, kept verbatim for export.
    pub raw: serde_json::Value,
}
