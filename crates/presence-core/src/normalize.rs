//! Envelope normalization: arbitrary wire JSON to canonical presence events.
//!
//! Normalization is a total, side-effect-free filter. Every envelope either
//! resolves to exactly one [`PresenceEvent`] or to `None`; there is no error
//! path. An envelope qualifies only if one of its channel candidates is a
//! non-empty string ending in the reserved presence suffix.
//!
//! # Field resolution priority
//!
//! Each output field is the first non-empty candidate from its documented
//! list, in order:
//!
//! - channel: `subscription`, `subscribedChannel`, `channel`,
//!   `actualChannel`, `c`; fallback `metadata.subscription`
//! - body: `message`, `payload`, `d` (absent body = empty body)
//! - action: `body.action`, `metadata.action`
//! - uuid: `body.uuid`, `body.u`, `metadata.uuid`
//! - occupancy: `body.occupancy`, `body.o`, `metadata.occupancy`
//! - timestamp: `body.timestamp`, `metadata.timestamp`
//! - state: `body.state` (alias `body.data`)
//! - join/leave/timeout: the body arrays
//! - timetoken, publisher: top-level envelope fields
//!
//! Wrong-typed candidates are skipped, not fatal: a non-numeric occupancy
//! or a mixed-type join array is treated as absent and the rest of the
//! event is still produced. The same holds for a wrong-typed metadata
//! field, which degrades to an empty metadata object.

use serde_json::Value;

use presence_types::envelope::{
    RawBody, RawEnvelope, RawMetadata, nonempty_str, numeric_i64, numeric_u32, string_array,
};
use presence_types::{PresenceAction, PresenceEvent, base_channel_of, is_presence_channel};

/// Normalize one wire envelope into a canonical presence event.
///
/// Returns `None` for anything that is not a presence event: non-object
/// values, envelopes with no channel candidate ending in the presence
/// suffix, and so on. Never fails.
pub fn normalize(envelope: &Value) -> Option<PresenceEvent> {
    let raw = RawEnvelope::from_value(envelope)?;
    let metadata = RawMetadata::from_value(raw.metadata.as_ref());
    let presence_channel = resolve_presence_channel(&raw, &metadata)?.to_owned();
    let base_channel = base_channel_of(&presence_channel)?.to_owned();

    let body = RawBody::from_value(
        raw.message
            .as_ref()
            .or(raw.payload.as_ref())
            .or(raw.compact_data.as_ref()),
    );

    let mut event = PresenceEvent::bare(presence_channel, base_channel);
    event.action = resolve_action(&body, &metadata);
    event.uuid = nonempty_str(body.uuid.as_ref())
        .or_else(|| nonempty_str(body.compact_uuid.as_ref()))
        .or_else(|| nonempty_str(metadata.uuid.as_ref()))
        .map(str::to_owned);
    event.occupancy = numeric_u32(body.occupancy.as_ref())
        .or_else(|| numeric_u32(body.compact_occupancy.as_ref()))
        .or_else(|| numeric_u32(metadata.occupancy.as_ref()));
    event.timestamp = numeric_i64(body.timestamp.as_ref())
        .or_else(|| numeric_i64(metadata.timestamp.as_ref()));
    event.state = body.state.as_ref().filter(|v| v.is_object()).cloned();
    event.join = string_array(body.join.as_ref());
    event.leave = string_array(body.leave.as_ref());
    event.timeout = string_array(body.timeout.as_ref());
    event.timetoken = nonempty_str(raw.timetoken.as_ref()).map(str::to_owned);
    event.publisher = nonempty_str(raw.publisher.as_ref()).map(str::to_owned);
    Some(event)
}

/// Scan the channel candidates in priority order for the first non-empty
/// string ending in the presence suffix; fall back to the metadata
/// subscription field.
fn resolve_presence_channel<'a>(
    raw: &'a RawEnvelope,
    metadata: &'a RawMetadata,
) -> Option<&'a str> {
    let candidates = [
        raw.subscription.as_ref(),
        raw.subscribed_channel.as_ref(),
        raw.channel.as_ref(),
        raw.actual_channel.as_ref(),
        raw.compact_channel.as_ref(),
    ];
    candidates
        .into_iter()
        .filter_map(nonempty_str)
        .find(|name| is_presence_channel(name))
        .or_else(|| {
            nonempty_str(metadata.subscription.as_ref())
                .filter(|name| is_presence_channel(name))
        })
}

fn resolve_action(body: &RawBody, metadata: &RawMetadata) -> Option<PresenceAction> {
    nonempty_str(body.action.as_ref())
        .or_else(|| nonempty_str(metadata.action.as_ref()))
        .and_then(PresenceAction::parse)
}
