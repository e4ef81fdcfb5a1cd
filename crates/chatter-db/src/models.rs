//! Database row types. Distinct from chatter-types API models to keep the DB
//! layer independent.

use serde_json::{Map, Value};

pub struct ParticipantRow {
    pub name: String,
    pub last_status: i64,
}

pub struct MessageRow {
    pub id: String,
    pub document: Map<String, Value>,
}

impl MessageRow {
    /// The stored `from`, if the document still has a string there.
    pub fn author(&self) -> Option<&str> {
        self.document.get("from").and_then(Value::as_str)
    }
}
