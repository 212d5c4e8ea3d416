//! Events pushed over the Knocki WebSocket

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::Trigger;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown Knocki event type '{0}'")]
pub struct EventTypeError(pub String);

/// Event types emitted by Knocki
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "actionCreated")]
    Created,
    #[serde(rename = "actionUpdated")]
    Updated,
    #[serde(rename = "actionDeleted")]
    Deleted,
    #[serde(rename = "actionTriggered")]
    Triggered,
}

impl EventType {
    pub const ALL: [EventType; 4] = [
        EventType::Created,
        EventType::Updated,
        EventType::Deleted,
        EventType::Triggered,
    ];

    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Created => "actionCreated",
            EventType::Updated => "actionUpdated",
            EventType::Deleted => "actionDeleted",
            EventType::Triggered => "actionTriggered",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = EventTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| EventTypeError(s.to_string()))
    }
}

/// An event received from the WebSocket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub event: EventType,
    pub payload: Trigger,
}

impl Event {
    pub fn event_type(&self) -> EventType {
        self.event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_type_strings() {
        for t in EventType::ALL {
            assert_eq!(t.as_str().parse::<EventType>().unwrap(), t);
            assert_eq!(serde_json::to_value(t).unwrap(), json!(t.to_string()));
        }
        assert_eq!(
            "actionExploded".parse::<EventType>(),
            Err(EventTypeError("actionExploded".to_string()))
        );
    }

    #[test]
    fn test_event_from_json() {
        let event: Event = serde_json::from_str(
            r#"{"event":"actionTriggered","payload":{"device":"KNC1-W-00000214","details":{"id":31,"name":"Tap"}}}"#,
        )
        .unwrap();

        assert_eq!(event.event_type(), EventType::Triggered);
        assert_eq!(event.payload.details.trigger_id, 31);
    }

    #[test]
    fn test_unknown_event_rejected() {
        let result = serde_json::from_value::<Event>(json!({
            "event": "ping",
            "payload": {"device": "x", "details": {"id": 1, "name": "n"}}
        }));
        assert!(result.is_err());
    }
}
