//! Message schema checks.
//!
//! Stored messages are schemaless JSON documents. These checks decide whether a
//! document (or an update body about to be merged into one) is a well-formed
//! message for a given author.

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use crate::models::MessageKind;

/// Fields an update body may touch that carry posting rules.
const CHECKED_FIELDS: [&str; 4] = ["from", "to", "text", "type"];

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("expected a JSON object")]
    NotAnObject,

    #[error("{0} must not be null")]
    Null(&'static str),

    #[error("malformed message: {0}")]
    Shape(#[from] serde_json::Error),

    #[error(transparent)]
    Fields(#[from] ValidationErrors),

    #[error("from must be {expected:?}, got {found:?}")]
    Author {
        expected: Option<String>,
        found: String,
    },
}

/// The full shape of a message document. Unknown fields are rejected.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct MessageSchema {
    #[validate(length(min = 1))]
    pub from: String,
    #[validate(length(min = 1))]
    pub to: String,
    #[validate(length(min = 1))]
    pub text: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default)]
    pub time: Option<Value>,
}

#[derive(Debug, Deserialize, Validate)]
struct MessagePatch {
    #[validate(length(min = 1))]
    from: Option<String>,
    #[validate(length(min = 1))]
    to: Option<String>,
    #[validate(length(min = 1))]
    text: Option<String>,
    // only decoded, so an unknown type is rejected
    #[serde(rename = "type")]
    _kind: Option<MessageKind>,
}

/// Check `document` against the posting schema with `from` pinned to `author`.
/// An absent author never matches.
pub fn check_message(document: &Value, author: Option<&str>) -> Result<MessageSchema, SchemaError> {
    let message = MessageSchema::deserialize(document)?;
    message.validate()?;

    if author != Some(message.from.as_str()) {
        return Err(SchemaError::Author {
            expected: author.map(str::to_owned),
            found: message.from,
        });
    }

    Ok(message)
}

/// Check an update body and return the fields to merge.
///
/// Known fields that are present must obey the posting rules and a `from`
/// must equal `author`. Every other field passes through untouched, except
/// `id`, which belongs to the store.
pub fn check_patch(body: &Value, author: &str) -> Result<Map<String, Value>, SchemaError> {
    let Value::Object(fields) = body else {
        return Err(SchemaError::NotAnObject);
    };

    if let Some(field) = CHECKED_FIELDS
        .into_iter()
        .find(|field| fields.get(*field).is_some_and(Value::is_null))
    {
        return Err(SchemaError::Null(field));
    }

    let patch = MessagePatch::deserialize(body)?;
    patch.validate()?;

    if let Some(from) = patch.from
        && from != author
    {
        return Err(SchemaError::Author {
            expected: Some(author.to_owned()),
            found: from,
        });
    }

    let mut fields = fields.clone();
    fields.remove("id");
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message_from(author: &str) -> Value {
        json!({
            "from": author,
            "to": "Todos",
            "text": "oi galera",
            "type": "message",
            "time": "20:04:37",
        })
    }

    #[test]
    fn accepts_well_formed_message() {
        let message = check_message(&message_from("Alice"), Some("Alice")).unwrap();
        assert_eq!(message.kind, MessageKind::Message);
        assert_eq!(message.to, "Todos");
    }

    #[test]
    fn rejects_other_author() {
        let err = check_message(&message_from("Alice"), Some("Bob")).unwrap_err();
        assert!(matches!(err, SchemaError::Author { .. }));
    }

    #[test]
    fn rejects_missing_author() {
        let err = check_message(&message_from("Alice"), None).unwrap_err();
        assert!(matches!(err, SchemaError::Author { expected: None, .. }));
    }

    #[test]
    fn rejects_unknown_kind() {
        let mut doc = message_from("Alice");
        doc["type"] = json!("status");
        let err = check_message(&doc, Some("Alice")).unwrap_err();
        assert!(matches!(err, SchemaError::Shape(_)));
    }

    #[test]
    fn rejects_empty_text() {
        let mut doc = message_from("Alice");
        doc["text"] = json!("");
        let err = check_message(&doc, Some("Alice")).unwrap_err();
        assert!(matches!(err, SchemaError::Fields(_)));
    }

    #[test]
    fn rejects_unknown_fields() {
        let mut doc = message_from("Alice");
        doc["mood"] = json!("happy");
        assert!(check_message(&doc, Some("Alice")).is_err());
    }

    #[test]
    fn time_is_optional() {
        let mut doc = message_from("Alice");
        doc.as_object_mut().unwrap().remove("time");
        assert!(check_message(&doc, Some("Alice")).is_ok());
    }

    #[test]
    fn patch_keeps_extra_fields_and_drops_id() {
        let body = json!({ "text": "editado", "mood": "happy", "id": "nope" });
        let fields = check_patch(&body, "Alice").unwrap();
        assert_eq!(fields.get("text"), Some(&json!("editado")));
        assert_eq!(fields.get("mood"), Some(&json!("happy")));
        assert!(!fields.contains_key("id"));
    }

    #[test]
    fn patch_rejects_reattribution() {
        let body = json!({ "from": "Bob", "text": "editado" });
        let err = check_patch(&body, "Alice").unwrap_err();
        assert!(matches!(err, SchemaError::Author { .. }));
    }

    #[test]
    fn patch_rejects_bad_fields() {
        assert!(matches!(check_patch(&json!([1, 2]), "Alice"), Err(SchemaError::NotAnObject)));
        assert!(matches!(check_patch(&json!({ "to": null }), "Alice"), Err(SchemaError::Null("to"))));
        assert!(matches!(check_patch(&json!({ "text": "" }), "Alice"), Err(SchemaError::Fields(_))));
        assert!(matches!(check_patch(&json!({ "type": "shout" }), "Alice"), Err(SchemaError::Shape(_))));
    }
}
