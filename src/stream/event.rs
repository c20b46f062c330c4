//! Events pushed over the licensing stream, and the signals handed to
//! local consumers.

use std::fmt::Display;

use chrono::{DateTime, Utc};
use enum_as_inner::EnumAsInner;
use serde::{Deserialize, Serialize};

use super::frame::Frame;

/// Kind of a business event.
///
/// Open enumeration: the server may push kinds this build does not know
/// about yet, those are preserved as [`EventKind::Unknown`] instead of being
/// dropped. The reserved `heartbeat` kind never reaches consumers, it is
/// consumed by the connection driver before events are built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    /// subscription plan, seat count or billing detail changed
    SubscriptionUpdated,
    /// subscription was cancelled
    SubscriptionCancelled,
    /// subscription was renewed for another period
    SubscriptionRenewed,
    /// license was revoked by the vendor
    LicenseRevoked,
    /// default kind of a frame without an `event:` field
    Message,
    /// any kind this build does not know
    Unknown(String),
}

impl EventKind {
    /// wire name of this kind
    pub fn as_str(&self) -> &str {
        match self {
            Self::SubscriptionUpdated => "subscription_updated",
            Self::SubscriptionCancelled => "subscription_cancelled",
            Self::SubscriptionRenewed => "subscription_renewed",
            Self::LicenseRevoked => "license_revoked",
            Self::Message => "message",
            Self::Unknown(kind) => kind,
        }
    }
}

impl From<&str> for EventKind {
    fn from(kind: &str) -> Self {
        match kind {
            "subscription_updated" => Self::SubscriptionUpdated,
            "subscription_cancelled" => Self::SubscriptionCancelled,
            "subscription_renewed" => Self::SubscriptionRenewed,
            "license_revoked" => Self::LicenseRevoked,
            "message" => Self::Message,
            _ => Self::Unknown(kind.to_string()),
        }
    }
}

impl From<String> for EventKind {
    fn from(kind: String) -> Self {
        kind.as_str().into()
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        kind.as_str().to_string()
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One business event from the licensing server.
///
/// Immutable once built. Replayed (gap-recovered) events are
/// indistinguishable from live ones except through their id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamEvent {
    /// server-assigned event identifier, empty when the server sent none
    pub id: String,
    /// event kind
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// server-side event time
    pub timestamp: DateTime<Utc>,
    /// license key this event belongs to
    pub license_key: String,
    /// event payload, opaque to this crate
    pub data: serde_json::Value,
}

impl StreamEvent {
    /// Build a live event from a decoded frame.
    ///
    /// The frame-level `event:`/`id:` fields win over `type`/`id` keys
    /// inside the json payload. A payload that is not a json object is kept
    /// as an opaque value with the event time falling back to now and the
    /// license key to the configured one.
    pub(crate) fn from_frame(frame: &Frame, fallback_license: &str) -> Self {
        let frame_kind = frame.event.as_deref().map(EventKind::from);
        let frame_id = frame.id.clone();

        let object = match serde_json::from_str::<serde_json::Value>(&frame.data) {
            Ok(serde_json::Value::Object(object)) => object,
            Ok(other) => {
                return Self {
                    id: frame_id.unwrap_or_default(),
                    kind: frame_kind.unwrap_or(EventKind::Message),
                    timestamp: Utc::now(),
                    license_key: fallback_license.to_string(),
                    data: other,
                }
            }
            Err(_) => {
                log::debug!("Event payload is not json, keep as opaque text");

                return Self {
                    id: frame_id.unwrap_or_default(),
                    kind: frame_kind.unwrap_or(EventKind::Message),
                    timestamp: Utc::now(),
                    license_key: fallback_license.to_string(),
                    data: serde_json::Value::String(frame.data.clone()),
                };
            }
        };

        let id = frame_id
            .or_else(|| object.get("id").and_then(|v| v.as_str()).map(str::to_string))
            .unwrap_or_default();

        let kind = frame_kind
            .or_else(|| object.get("type").and_then(|v| v.as_str()).map(EventKind::from))
            .unwrap_or(EventKind::Message);

        let timestamp = object
            .get("timestamp")
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        let license_key = object
            .get("licenseKey")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| fallback_license.to_string());

        let data = match object.get("data") {
            Some(data) => data.clone(),
            None => serde_json::Value::Object(object),
        };

        Self {
            id,
            kind,
            timestamp,
            license_key,
            data,
        }
    }
}

/// Signals handed to the local consumer of one client.
#[derive(Debug, Clone, EnumAsInner)]
pub enum Signal {
    /// the event stream is established
    Connected,
    /// the event stream is down; a reconnect is already scheduled unless
    /// [`disconnect`](super::Client::disconnect) was called
    Disconnected,
    /// a business event passed framing and de-duplication
    Event(Box<StreamEvent>),
    /// the server rejected the stream with 401; the caller should trigger
    /// license revalidation out-of-band while the retry loop keeps running
    LicenseValidationRequired {
        /// server-provided reason
        reason: String,
        /// rejecting http status code
        status_code: u16,
    },
}

#[cfg(test)]
mod test {
    use super::super::frame::Frame;
    use super::*;
    use serde_json::json;

    fn frame(event: Option<&str>, data: &str, id: Option<&str>) -> Frame {
        Frame {
            event: event.map(str::to_string),
            data: data.to_string(),
            id: id.map(str::to_string),
        }
    }

    #[test]
    fn test_event_kind_round_trip() {
        for kind in ["subscription_updated", "license_revoked", "message"] {
            assert_eq!(EventKind::from(kind).as_str(), kind);
        }

        let unknown = EventKind::from("price_table_changed");
        assert_eq!(unknown, EventKind::Unknown("price_table_changed".to_string()));
        assert_eq!(unknown.as_str(), "price_table_changed");
    }

    #[test]
    fn test_event_from_envelope_payload() {
        let payload = json!({
            "timestamp": "2026-08-06T10:00:00Z",
            "licenseKey": "POS-1234-ABCD",
            "data": { "plan": "pro" },
        })
        .to_string();

        let event = StreamEvent::from_frame(
            &frame(Some("subscription_updated"), &payload, Some("evt-1")),
            "FALLBACK",
        );

        assert_eq!(event.id, "evt-1");
        assert_eq!(event.kind, EventKind::SubscriptionUpdated);
        assert_eq!(event.license_key, "POS-1234-ABCD");
        assert_eq!(event.data, json!({ "plan": "pro" }));
        assert_eq!(event.timestamp.to_rfc3339(), "2026-08-06T10:00:00+00:00");
    }

    #[test]
    fn test_frame_fields_win_over_payload_keys() {
        let payload = json!({ "id": "payload-id", "type": "message" }).to_string();

        let event = StreamEvent::from_frame(
            &frame(Some("license_revoked"), &payload, Some("frame-id")),
            "FALLBACK",
        );

        assert_eq!(event.id, "frame-id");
        assert_eq!(event.kind, EventKind::LicenseRevoked);
    }

    #[test]
    fn test_payload_keys_fill_missing_frame_fields() {
        let payload = json!({ "id": "payload-id", "type": "subscription_renewed" }).to_string();

        let event = StreamEvent::from_frame(&frame(None, &payload, None), "FALLBACK");

        assert_eq!(event.id, "payload-id");
        assert_eq!(event.kind, EventKind::SubscriptionRenewed);
        assert_eq!(event.license_key, "FALLBACK");
    }

    #[test]
    fn test_plain_text_payload_kept_opaque() {
        let event = StreamEvent::from_frame(&frame(None, "not json at all", Some("evt-2")), "K");

        assert_eq!(event.id, "evt-2");
        assert_eq!(event.kind, EventKind::Message);
        assert_eq!(event.data, json!("not json at all"));
        assert_eq!(event.license_key, "K");
    }

    #[test]
    fn test_missed_event_decode_matches_wire_shape() {
        let event: StreamEvent = serde_json::from_value(json!({
            "id": "evt-3",
            "type": "subscription_cancelled",
            "timestamp": "2026-08-06T09:30:00Z",
            "licenseKey": "POS-1234-ABCD",
            "data": {},
        }))
        .unwrap();

        assert_eq!(event.kind, EventKind::SubscriptionCancelled);
    }
}
