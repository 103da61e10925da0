//! Webhook event types.
//!
//! A [`WebhookEvent`] has no public constructor and no `Deserialize` impl; the only way to
//! obtain one is through [`crate::webhooks::WebhookVerifier::verify`].

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event types the document service emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WebhookEventType {
    /// A document finished rendering and is ready to download
    #[serde(rename = "document.completed")]
    DocumentCompleted,
    /// A document failed to render
    #[serde(rename = "document.failed")]
    DocumentFailed,
    /// Every document in a batch has reached a terminal state
    #[serde(rename = "batch.completed")]
    BatchCompleted,
}

impl std::fmt::Display for WebhookEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DocumentCompleted => write!(f, "document.completed"),
            Self::DocumentFailed => write!(f, "document.failed"),
            Self::BatchCompleted => write!(f, "batch.completed"),
        }
    }
}

impl std::str::FromStr for WebhookEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "document.completed" => Ok(Self::DocumentCompleted),
            "document.failed" => Ok(Self::DocumentFailed),
            "batch.completed" => Ok(Self::BatchCompleted),
            _ => Err(format!("Unknown event type: {}", s)),
        }
    }
}

/// An authenticated webhook event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: WebhookEventType,
    timestamp: String,
    data: serde_json::Map<String, serde_json::Value>,
}

/// Wire shape of an event body. Extra top-level fields are ignored.
#[derive(Debug, Deserialize)]
struct EventPayload {
    id: String,
    #[serde(rename = "type")]
    event_type: WebhookEventType,
    timestamp: String,
    data: serde_json::Map<String, serde_json::Value>,
}

impl WebhookEvent {
    /// Decode an event body. Only called once the signature and timestamp have been checked.
    pub(crate) fn from_verified_payload(payload: &str) -> Result<Self, serde_json::Error> {
        let EventPayload {
            id,
            event_type,
            timestamp,
            data,
        } = serde_json::from_str(payload)?;

        Ok(Self {
            id,
            event_type,
            timestamp,
            data,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn event_type(&self) -> WebhookEventType {
        self.event_type
    }

    /// When the service emitted the event, as the raw ISO-8601 string it was sent with
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// The event timestamp as a UTC instant.
    ///
    /// Accepts RFC 3339, ISO-8601 basic offsets such as `+0000`, and offset-less local times,
    /// which are read as UTC. Returns `None` for anything else.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_iso8601(&self.timestamp)
    }

    /// Event-specific data, e.g. `documentId` and `downloadUrl` for `document.completed`
    pub fn data(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.data
    }

    /// Consume the event, returning its data.
    pub fn into_data(self) -> serde_json::Map<String, serde_json::Value> {
        self.data
    }
}

fn parse_iso8601(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_from_str() {
        assert_eq!(
            "document.completed".parse::<WebhookEventType>().unwrap(),
            WebhookEventType::DocumentCompleted
        );
        assert_eq!("batch.completed".parse::<WebhookEventType>().unwrap(), WebhookEventType::BatchCompleted);
        assert!("document.deleted".parse::<WebhookEventType>().is_err());
    }

    #[test]
    fn test_event_type_display_matches_wire_name() {
        for event_type in [
            WebhookEventType::DocumentCompleted,
            WebhookEventType::DocumentFailed,
            WebhookEventType::BatchCompleted,
        ] {
            let json = serde_json::to_value(event_type).unwrap();
            assert_eq!(json, serde_json::Value::String(event_type.to_string()));
        }
    }

    #[test]
    fn test_decode_payload() {
        let payload = r#"{
            "id": "evt_123",
            "type": "document.failed",
            "timestamp": "2024-01-01T00:00:00Z",
            "data": {"documentId": "doc_1", "error": "template not found"},
            "apiVersion": "2024-01"
        }"#;

        let event = WebhookEvent::from_verified_payload(payload).unwrap();

        assert_eq!(event.id(), "evt_123");
        assert_eq!(event.event_type(), WebhookEventType::DocumentFailed);
        assert_eq!(event.timestamp(), "2024-01-01T00:00:00Z");
        assert_eq!(event.parsed_timestamp().unwrap().timestamp(), 1_704_067_200);
        assert_eq!(event.data()["error"], "template not found");
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        let payload = r#"{"id":"evt_1","type":"document.deleted","timestamp":"2024-01-01T00:00:00Z","data":{}}"#;
        assert!(WebhookEvent::from_verified_payload(payload).is_err());
    }

    #[test]
    fn test_decode_rejects_missing_fields() {
        let payload = r#"{"id":"evt_1","type":"document.completed","data":{}}"#;
        assert!(WebhookEvent::from_verified_payload(payload).is_err());
    }

    #[test]
    fn test_serialize_uses_wire_names() {
        let payload = r#"{"id":"evt_1","type":"batch.completed","timestamp":"2024-01-01T00:00:00Z","data":{"batchId":"b_1"}}"#;
        let event = WebhookEvent::from_verified_payload(payload).unwrap();
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "batch.completed");
        assert_eq!(json["data"]["batchId"], "b_1");
    }

    #[test]
    fn test_decode_keeps_offsetless_timestamp() {
        let payload = r#"{"id":"evt_1","type":"document.completed","timestamp":"2023-11-14T22:13:20","data":{}}"#;
        let event = WebhookEvent::from_verified_payload(payload).unwrap();

        assert_eq!(event.timestamp(), "2023-11-14T22:13:20");
        assert_eq!(event.parsed_timestamp().unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_parsed_timestamp_forms() {
        for (raw, expected) in [
            ("2023-11-14T22:13:20Z", Some(1_700_000_000)),
            ("2023-11-14T23:13:20+01:00", Some(1_700_000_000)),
            ("2023-11-14T22:13:20.000+0000", Some(1_700_000_000)),
            ("2023-11-14T22:13:20.5", Some(1_700_000_000)),
            ("yesterday", None),
        ] {
            assert_eq!(parse_iso8601(raw).map(|dt| dt.timestamp()), expected, "{raw}");
        }
    }
}
