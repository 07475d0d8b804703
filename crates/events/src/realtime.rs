//! Typed realtime events.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use backoffice_core::UserId;

/// Shared channel announcing changes to common (lookup) data.
pub const COMMON_DATA_CHANNEL: &str = "common-data";

/// Event name carried on [`COMMON_DATA_CHANNEL`].
pub const COMMON_DATA_CHANGED: &str = "common-data.changed";

/// Private channel of one user (notifications, edit counters).
pub fn user_channel(user_id: UserId) -> String {
    format!("private-user.{user_id}")
}

/// A raw message as delivered by the realtime transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeMessage {
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default = "Utc::now")]
    pub received_at: DateTime<Utc>,
}

impl RealtimeMessage {
    pub fn new(event: impl Into<String>, payload: Value) -> Self {
        Self {
            event: event.into(),
            payload,
            received_at: Utc::now(),
        }
    }

    pub fn is(&self, event: &str) -> bool {
        self.event == event
    }

    /// Decode the payload into a typed event.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }
}

/// Payload of [`COMMON_DATA_CHANGED`]: which common-data block changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonDataChanged {
    pub key: String,
}

impl CommonDataChanged {
    pub fn message(key: impl Into<String>) -> RealtimeMessage {
        let key = key.into();
        RealtimeMessage::new(COMMON_DATA_CHANGED, serde_json::json!({ "key": key }))
    }
}

/// Events delivered on a user's private channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserEvent {
    /// A notification addressed to the user.
    NotificationReceived { title: String, body: Option<String> },
    /// The number of pending edits for an entity changed.
    EditCountChanged { entity: String, count: u64 },
}

impl UserEvent {
    pub const EVENT: &'static str = "user.event";

    pub fn message(&self) -> RealtimeMessage {
        RealtimeMessage::new(
            Self::EVENT,
            serde_json::to_value(self).unwrap_or(Value::Null),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_data_payload_round_trips() {
        let msg = CommonDataChanged::message("statuses");
        assert!(msg.is(COMMON_DATA_CHANGED));
        let decoded: CommonDataChanged = msg.decode().unwrap();
        assert_eq!(decoded.key, "statuses");
    }

    #[test]
    fn user_event_wire_shape() {
        let msg: RealtimeMessage = serde_json::from_value(serde_json::json!({
            "event": "user.event",
            "payload": {"type": "edit_count_changed", "entity": "accounts", "count": 3}
        }))
        .unwrap();
        assert_eq!(
            msg.decode::<UserEvent>().unwrap(),
            UserEvent::EditCountChanged {
                entity: "accounts".into(),
                count: 3
            }
        );
    }

    #[test]
    fn user_channel_is_scoped_by_id() {
        assert_eq!(user_channel(UserId::new(12)), "private-user.12");
    }
}
