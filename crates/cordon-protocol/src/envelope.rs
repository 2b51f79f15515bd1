//! Batch envelopes pinning the protocol version.

use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::operation::Operation;

/// The only protocol version this build speaks.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Inbound batch of operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationsMessage {
    /// Must be exactly [`PROTOCOL_VERSION`].
    pub protocol_version: String,
    /// The operations, evaluated in order.
    pub operations: Vec<Operation>,
}

impl OperationsMessage {
    /// Wrap operations in a current-version envelope.
    #[must_use]
    pub fn new(operations: Vec<Operation>) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            operations,
        }
    }
}

/// Outbound batch of events, mirroring the operations envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsMessage {
    /// Always [`PROTOCOL_VERSION`].
    pub protocol_version: String,
    /// One event per evaluated operation, in order.
    pub events: Vec<Event>,
}

impl EventsMessage {
    /// Wrap events in a current-version envelope.
    #[must_use]
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_wire_shape() {
        let msg = OperationsMessage::new(vec![Operation::Message {
            id: None,
            content: "hi".to_string(),
        }]);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["protocolVersion"], "1.0");
        assert_eq!(json["operations"][0]["type"], "message");
    }

    #[test]
    fn test_events_envelope_round_trip() {
        let msg = EventsMessage::new(Vec::new());
        let json = serde_json::to_string(&msg).unwrap();
        let back: EventsMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
