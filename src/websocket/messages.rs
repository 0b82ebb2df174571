//! WebSocket Message Types
//!
//! Defines all message types for WebSocket communication between
//! dashboard clients and the Sentinel server.

use serde::{Deserialize, Serialize};

use crate::api::dto::StatusResponse;
use crate::monitor::{MonitorSnapshot, Reading};

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection established
    Connected {
        /// Unique connection identifier
        connection_id: String,
    },
    /// Monitor state after a change
    Snapshot {
        #[serde(flatten)]
        status: StatusResponse,
        /// Most recent reading; omitted while offline
        #[serde(skip_serializing_if = "Option::is_none")]
        latest: Option<Reading>,
        /// Number of readings in the history window
        history_len: usize,
    },
    /// Pong response to ping
    Pong,
    /// Error message
    Error {
        /// Error description
        message: String,
    },
}

impl ServerMessage {
    /// Build a snapshot message from a monitor snapshot
    pub fn snapshot(snapshot: &MonitorSnapshot) -> Self {
        ServerMessage::Snapshot {
            status: StatusResponse::from_snapshot(snapshot),
            latest: snapshot
                .latest
                .clone()
                .filter(|_| snapshot.state.is_online()),
            history_len: snapshot.history.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::LivenessState;

    #[test]
    fn test_client_message_deserialize_ping() {
        let json = r#"{"type": "ping"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
    }

    #[test]
    fn test_client_message_rejects_unknown_type() {
        let json = r#"{"type": "subscribe", "topics": []}"#;
        assert!(serde_json::from_str::<ClientMessage>(json).is_err());
    }

    #[test]
    fn test_server_message_serialize_snapshot() {
        let snapshot = MonitorSnapshot {
            state: LivenessState::Nominal,
            latest: Some(Reading::new(45.0, 0.2, false)),
            history: vec![Reading::new(45.0, 0.2, false)],
            watchdog_armed: true,
            bootstrapped: true,
            ..Default::default()
        };

        let json = serde_json::to_string(&ServerMessage::snapshot(&snapshot)).unwrap();
        assert!(json.contains("\"type\":\"snapshot\""));
        assert!(json.contains("\"state\":\"nominal\""));
        assert!(json.contains("\"label\":\"NOMINAL\""));
        assert!(json.contains("\"temperature\":\"45.0\""));
        assert!(json.contains("\"history_len\":1"));
    }

    #[test]
    fn test_offline_snapshot_hides_stale_reading() {
        let snapshot = MonitorSnapshot {
            state: LivenessState::Offline,
            latest: Some(Reading::new(45.0, 0.2, false)),
            history: vec![Reading::new(45.0, 0.2, false)],
            bootstrapped: true,
            ..Default::default()
        };

        let json = serde_json::to_value(ServerMessage::snapshot(&snapshot)).unwrap();
        assert_eq!(json["label"], "DISCONNECTED");
        assert!(json.get("latest").is_none());
        assert!(json["temperature"].is_null());
        assert_eq!(json["history_len"], 1);
    }

    #[test]
    fn test_server_message_serialize_connected() {
        let msg = ServerMessage::Connected {
            connection_id: "abc-123".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"connected\""));
        assert!(json.contains("\"connection_id\":\"abc-123\""));
    }
}
