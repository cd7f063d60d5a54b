//! Typed model of the heterogeneous wire-envelope shapes.
//!
//! The transport delivers presence envelopes in several historical shapes:
//! long-form field names, short compact keys, and an optional metadata
//! object that duplicates some fields. Rather than probing a loose map for
//! optional keys, the known shapes are decoded into one lenient struct of
//! candidate fields; the normalizer then resolves each output field by its
//! documented candidate priority.
//!
//! Every candidate is kept as a raw [`serde_json::Value`] so that a field
//! of the wrong type can be treated as absent instead of failing the whole
//! envelope. The accessor helpers at the bottom implement that leniency.

use serde::Deserialize;
use serde_json::Value;

/// One wire envelope, decoded leniently.
///
/// All fields are optional; an envelope that is not a JSON object at all
/// fails to decode, which the normalizer treats as "not a presence event".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawEnvelope {
    /// Subscription name the envelope was matched against.
    pub subscription: Option<Value>,
    /// Long-form alias for the subscribed channel.
    #[serde(rename = "subscribedChannel")]
    pub subscribed_channel: Option<Value>,
    /// Plain channel field.
    pub channel: Option<Value>,
    /// Long-form alias for the actual delivery channel.
    #[serde(rename = "actualChannel")]
    pub actual_channel: Option<Value>,
    /// Compact wire key for the channel.
    #[serde(rename = "c")]
    pub compact_channel: Option<Value>,
    /// Long-form event body.
    pub message: Option<Value>,
    /// Alternate long-form event body.
    pub payload: Option<Value>,
    /// Compact wire key for the event body.
    #[serde(rename = "d")]
    pub compact_data: Option<Value>,
    /// Optional metadata object duplicating some envelope fields. Kept raw
    /// so a wrong-typed value degrades to an empty metadata object instead
    /// of failing the whole envelope.
    #[serde(rename = "userMetadata", alias = "metadata")]
    pub metadata: Option<Value>,
    /// Transport-assigned publish token.
    pub timetoken: Option<Value>,
    /// Publishing identity recorded by the transport.
    pub publisher: Option<Value>,
}

impl RawEnvelope {
    /// Decode an arbitrary JSON value into the lenient envelope model.
    ///
    /// Returns `None` when the value is not an object; unknown fields are
    /// ignored, wrong-typed fields are kept as raw values for the
    /// accessors to reject individually.
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

/// The metadata object some envelope shapes attach.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawMetadata {
    /// Fallback subscription name.
    pub subscription: Option<Value>,
    /// Fallback action string.
    pub action: Option<Value>,
    /// Fallback identity.
    pub uuid: Option<Value>,
    /// Fallback occupancy.
    pub occupancy: Option<Value>,
    /// Fallback timestamp.
    pub timestamp: Option<Value>,
}

impl RawMetadata {
    /// Decode the metadata candidate value.
    ///
    /// An absent or non-object metadata field is treated as an empty
    /// metadata object, never an error.
    pub fn from_value(value: Option<&Value>) -> Self {
        value
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }
}

/// The event body extracted from an envelope's message/payload/data field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawBody {
    /// Wire action string (`"join"`, `"leave"`, ...).
    pub action: Option<Value>,
    /// Single-identity field.
    pub uuid: Option<Value>,
    /// Compact alias for the identity.
    #[serde(rename = "u")]
    pub compact_uuid: Option<Value>,
    /// Authoritative channel occupancy.
    pub occupancy: Option<Value>,
    /// Compact alias for occupancy.
    #[serde(rename = "o")]
    pub compact_occupancy: Option<Value>,
    /// Server-side event timestamp (epoch seconds).
    pub timestamp: Option<Value>,
    /// Identity state object.
    #[serde(alias = "data")]
    pub state: Option<Value>,
    /// Batched joins (interval events).
    pub join: Option<Value>,
    /// Batched leaves (interval events).
    pub leave: Option<Value>,
    /// Batched timeouts (interval events).
    pub timeout: Option<Value>,
}

impl RawBody {
    /// Decode a body candidate value.
    ///
    /// An absent or non-object body is treated as an empty body, never an
    /// error: occupancy-only envelopes carry no body at all.
    pub fn from_value(value: Option<&Value>) -> Self {
        value
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Lenient accessors
// ---------------------------------------------------------------------------

/// Return the candidate as a non-empty string, or `None`.
pub fn nonempty_str(candidate: Option<&Value>) -> Option<&str> {
    match candidate {
        Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
        _ => None,
    }
}

/// Return the candidate as a `u32`, only if its underlying JSON type is
/// numeric and non-negative. Anything else is absent, not an error.
pub fn numeric_u32(candidate: Option<&Value>) -> Option<u32> {
    candidate
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
}

/// Return the candidate as an `i64`, only if its underlying JSON type is
/// numeric.
pub fn numeric_i64(candidate: Option<&Value>) -> Option<i64> {
    candidate.and_then(Value::as_i64)
}

/// Return the candidate as a non-empty vector of strings.
///
/// Accepted only if the value is a non-empty array whose elements are all
/// strings; anything else yields an empty vector (absent).
pub fn string_array(candidate: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = candidate else {
        return Vec::new();
    };
    if items.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(s) => out.push(s.clone()),
            _ => return Vec::new(),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_long_form_envelope() {
        let value = json!({
            "channel": "room-1-pnpres",
            "subscription": "room-1-pnpres",
            "message": {"action": "join", "uuid": "alice", "occupancy": 1},
            "timetoken": "17000000000000000",
        });
        let envelope = RawEnvelope::from_value(&value);
        assert!(envelope.is_some());
        let envelope = envelope.unwrap_or_default();
        assert!(envelope.channel.is_some());
        assert!(envelope.message.is_some());
    }

    #[test]
    fn decodes_compact_envelope() {
        let value = json!({
            "c": "room-1-pnpres",
            "d": {"action": "leave", "u": "bob", "o": 0},
        });
        let envelope = RawEnvelope::from_value(&value).unwrap_or_default();
        assert!(envelope.compact_channel.is_some());
        assert!(envelope.compact_data.is_some());
    }

    #[test]
    fn non_object_fails_to_decode() {
        assert!(RawEnvelope::from_value(&json!("just a string")).is_none());
        assert!(RawEnvelope::from_value(&json!(42)).is_none());
    }

    #[test]
    fn wrong_typed_metadata_does_not_fail_the_envelope() {
        let value = json!({
            "channel": "room-1-pnpres",
            "metadata": "not an object",
            "message": {"action": "join", "uuid": "alice"},
        });
        let envelope = RawEnvelope::from_value(&value);
        assert!(envelope.is_some());
        let envelope = envelope.unwrap_or_default();
        let metadata = RawMetadata::from_value(envelope.metadata.as_ref());
        assert!(metadata.subscription.is_none());
        assert!(metadata.uuid.is_none());
    }

    #[test]
    fn missing_body_becomes_empty_body() {
        let body = RawBody::from_value(None);
        assert!(body.action.is_none());
        let body = RawBody::from_value(Some(&json!("not an object")));
        assert!(body.uuid.is_none());
    }

    #[test]
    fn nonempty_str_rejects_wrong_types() {
        assert_eq!(nonempty_str(Some(&json!("room"))), Some("room"));
        assert_eq!(nonempty_str(Some(&json!(""))), None);
        assert_eq!(nonempty_str(Some(&json!(5))), None);
        assert_eq!(nonempty_str(None), None);
    }

    #[test]
    fn numeric_u32_rejects_non_numeric() {
        assert_eq!(numeric_u32(Some(&json!(3))), Some(3));
        assert_eq!(numeric_u32(Some(&json!("3"))), None);
        assert_eq!(numeric_u32(Some(&json!(-1))), None);
    }

    #[test]
    fn string_array_rejects_mixed_and_empty() {
        assert_eq!(
            string_array(Some(&json!(["a", "b"]))),
            vec![String::from("a"), String::from("b")]
        );
        assert!(string_array(Some(&json!([]))).is_empty());
        assert!(string_array(Some(&json!(["a", 2]))).is_empty());
        assert!(string_array(Some(&json!("a"))).is_empty());
    }
}
