//! Live session wire events
//!
//! Every frame on the session socket is a JSON object
//! `{"event": "<name>", "data": {...}}`. Event names are the stable
//! contract shared with clients; each name has exactly one payload schema,
//! checked when the frame is decoded.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Participant → server events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Enter a session's broadcast group
    #[serde(rename_all = "camelCase")]
    JoinSession { session_id: String, user_id: String },

    /// Move every participant to a line (global index, unvalidated)
    #[serde(rename_all = "camelCase")]
    ConductorAdvance { session_id: String, line_index: i64 },

    /// Set the session-wide transpose offset
    #[serde(rename_all = "camelCase")]
    TransposeChange { session_id: String, semitones: i32 },

    /// Set the session tempo
    #[serde(rename_all = "camelCase")]
    BpmChange { session_id: String, bpm: i64 },
}

impl ClientEvent {
    /// Decode one socket frame
    pub fn from_json(frame: &str) -> Result<Self> {
        serde_json::from_str(frame).map_err(|e| Error::Protocol(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Protocol(e.to_string()))
    }

    /// Session the event addresses
    pub fn session_id(&self) -> &str {
        match self {
            ClientEvent::JoinSession { session_id, .. }
            | ClientEvent::ConductorAdvance { session_id, .. }
            | ClientEvent::TransposeChange { session_id, .. }
            | ClientEvent::BpmChange { session_id, .. } => session_id,
        }
    }

    /// Wire name, for logging
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::JoinSession { .. } => "join_session",
            ClientEvent::ConductorAdvance { .. } => "conductor_advance",
            ClientEvent::TransposeChange { .. } => "transpose_change",
            ClientEvent::BpmChange { .. } => "bpm_change",
        }
    }
}

/// Full session state as broadcast to participants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub current_line_index: i64,
    pub semitones: i32,
    pub bpm: i64,
    /// Distinct user ids, in join order
    pub members: Vec<String>,
}

/// Server → participant events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    SessionState(SessionSnapshot),

    #[serde(rename_all = "camelCase")]
    MemberJoined { user_id: String },

    #[serde(rename_all = "camelCase")]
    LineChanged { line_index: i64 },

    #[serde(rename_all = "camelCase")]
    MemberLeft { participant_id: String },
}

impl ServerEvent {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Protocol(e.to_string()))
    }

    pub fn from_json(frame: &str) -> Result<Self> {
        serde_json::from_str(frame).map_err(|e| Error::Protocol(e.to_string()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::SessionState(_) => "session_state",
            ServerEvent::MemberJoined { .. } => "member_joined",
            ServerEvent::LineChanged { .. } => "line_changed",
            ServerEvent::MemberLeft { .. } => "member_left",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_join_session() {
        let frame = r#"{"event":"join_session","data":{"sessionId":"s1","userId":"A"}}"#;
        let event = ClientEvent::from_json(frame).unwrap();
        assert_eq!(
            event,
            ClientEvent::JoinSession {
                session_id: "s1".to_string(),
                user_id: "A".to_string()
            }
        );
        assert_eq!(event.session_id(), "s1");
        assert_eq!(event.name(), "join_session");
    }

    #[test]
    fn test_out_of_range_line_index_is_valid_wire_data() {
        let frame = r#"{"event":"conductor_advance","data":{"sessionId":"s1","lineIndex":9999}}"#;
        match ClientEvent::from_json(frame).unwrap() {
            ClientEvent::ConductorAdvance { line_index, .. } => assert_eq!(line_index, 9999),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_schema_mismatch_is_protocol_error() {
        let wrong_shape = r#"{"event":"bpm_change","data":{"sessionId":"s1","bpm":"fast"}}"#;
        assert!(matches!(ClientEvent::from_json(wrong_shape), Err(Error::Protocol(_))));

        let unknown = r#"{"event":"seize_power","data":{}}"#;
        assert!(matches!(ClientEvent::from_json(unknown), Err(Error::Protocol(_))));

        assert!(ClientEvent::from_json("not json").is_err());
    }

    #[test]
    fn test_server_event_shapes() {
        let state = ServerEvent::SessionState(SessionSnapshot {
            current_line_index: 0,
            semitones: 0,
            bpm: 80,
            members: vec!["A".to_string()],
        });
        let value: serde_json::Value = serde_json::from_str(&state.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "event": "session_state",
                "data": { "currentLineIndex": 0, "semitones": 0, "bpm": 80, "members": ["A"] }
            })
        );

        let left = ServerEvent::MemberLeft { participant_id: "B".to_string() };
        let value: serde_json::Value = serde_json::from_str(&left.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({ "event": "member_left", "data": { "participantId": "B" } }));

        let line = ServerEvent::LineChanged { line_index: 4 };
        assert_eq!(ServerEvent::from_json(&line.to_json().unwrap()).unwrap(), line);
    }
}
