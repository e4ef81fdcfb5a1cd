use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

use crate::models::MessageKind;

// -- Participants --

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    #[validate(length(min = 1))]
    pub name: String,
}

// -- Messages --

/// Body of `POST /messages`. The author comes from the caller, never from here,
/// so unknown fields (including a forged `from`) are ignored.
#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1))]
    pub to: String,
    #[validate(length(min = 1))]
    pub text: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
}

/// Query of `GET /messages`, built from the raw query pairs so that no query
/// string can be rejected.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MessageQuery {
    /// Kept raw: anything that is not a positive number means "no limit".
    pub limit: Option<String>,
}

impl MessageQuery {
    /// A `limit` given more than once counts as not given.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut limits = pairs
            .into_iter()
            .filter(|(key, _)| key == "limit")
            .map(|(_, value)| value);

        let limit = match (limits.next(), limits.next()) {
            (Some(limit), None) => Some(limit),
            _ => None,
        };
        Self { limit }
    }
}

/// A stored message document with its id, as returned by `GET /messages`.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: String,
    #[serde(flatten)]
    pub document: Map<String, Value>,
}
