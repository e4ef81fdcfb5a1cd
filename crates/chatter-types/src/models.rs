use serde::{Deserialize, Serialize};

/// Broadcast to the room, or addressed to a single participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Message,
    PrivateMessage,
}

/// A registered participant as listed by `GET /participants`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub name: String,
    /// Unix milliseconds of the last registration or heartbeat.
    pub last_status: i64,
}
