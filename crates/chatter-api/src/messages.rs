use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde_json::{Value, json};
use tracing::{info, warn};
use uuid::Uuid;

use chatter_db::models::MessageRow;
use chatter_types::api::{MessageQuery, MessageResponse, SendMessageRequest};
use chatter_types::schema;

use crate::error::ApiError;
use crate::extract::{JsonBody, ValidJson};
use crate::middleware::CallerIdentity;
use crate::{AppState, blocking};

/// `limit` as a trailing-slice length. Decimals truncate toward zero; anything
/// that does not come out as at least one means "everything".
fn trailing_limit(raw: Option<&str>) -> Option<usize> {
    let n = raw?.trim().parse::<f64>().ok()?.trunc();
    (n >= 1.0).then_some(n as usize)
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    ValidJson(req): ValidJson<SendMessageRequest>,
) -> Result<StatusCode, ApiError> {
    let document = json!({
        "from": caller.name(),
        "to": req.to,
        "text": req.text,
        "type": req.kind,
        "time": chrono::Local::now().format("%H:%M:%S").to_string(),
    });
    schema::check_message(&document, caller.name())?;

    let message_id = Uuid::new_v4().to_string();
    let mid = message_id.clone();
    blocking(&state, move |db| db.insert_message(&mid, &document)).await?;

    info!("Message {} posted by {:?}", message_id, caller.name());
    Ok(StatusCode::CREATED)
}

pub async fn get_messages(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<MessageResponse>>, ApiError> {
    let query = MessageQuery::from_pairs(pairs);
    let limit = trailing_limit(query.limit.as_deref());
    let rows = blocking(&state, move |db| db.get_messages(limit)).await?;

    Ok(Json(
        rows.into_iter()
            .map(|row| MessageResponse {
                id: row.id,
                document: row.document,
            })
            .collect(),
    ))
}

pub async fn delete_message(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<StatusCode, ApiError> {
    let message = find_message(&state, &message_id).await?;
    ensure_author(&caller, &message)?;

    let mid = message_id.clone();
    if !blocking(&state, move |db| db.delete_message(&mid)).await? {
        return Err(missing(message_id));
    }

    info!("Message {} removed by {:?}", message_id, caller.name());
    Ok(StatusCode::OK)
}

/// Edits keep an odd but relied-upon order: the *stored* record is checked
/// against the posting schema for this caller, and only then is the body
/// merged over it, unknown fields included. A record that picked up unknown
/// fields from an earlier edit therefore fails the check and cannot be edited
/// again.
pub async fn update_message(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    Extension(caller): Extension<CallerIdentity>,
    JsonBody(body): JsonBody<Value>,
) -> Result<StatusCode, ApiError> {
    let message = find_message(&state, &message_id).await?;
    let author = ensure_author(&caller, &message)?;

    schema::check_message(&Value::Object(message.document), Some(author))?;
    let patch = schema::check_patch(&body, author)?;

    let mid = message_id.clone();
    if !blocking(&state, move |db| db.merge_message(&mid, &patch)).await? {
        return Err(missing(message_id));
    }

    info!("Message {} edited by {:?}", message_id, author);
    Ok(StatusCode::OK)
}

fn missing(message_id: String) -> ApiError {
    ApiError::NotFound {
        resource: "message",
        id: message_id,
    }
}

async fn find_message(state: &AppState, message_id: &str) -> Result<MessageRow, ApiError> {
    let mid = message_id.to_string();
    blocking(state, move |db| db.get_message(&mid))
        .await?
        .ok_or_else(|| missing(message_id.to_string()))
}

/// The caller's name, if the caller wrote `message`.
fn ensure_author<'a>(caller: &'a CallerIdentity, message: &MessageRow) -> Result<&'a str, ApiError> {
    match caller.name() {
        Some(name) if caller.owns(message.author()) => Ok(name),
        _ => {
            warn!(
                "{:?} tried to change message {} by {:?}",
                caller.name(),
                message.id,
                message.author()
            );
            Err(ApiError::Unauthorized(message.id.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_parsing_follows_trailing_slice_rules() {
        assert_eq!(trailing_limit(Some("2")), Some(2));
        assert_eq!(trailing_limit(Some(" 7 ")), Some(7));
        assert_eq!(trailing_limit(Some("2.9")), Some(2));
        assert_eq!(trailing_limit(Some("100000")), Some(100_000));
    }

    #[test]
    fn degenerate_limits_mean_everything() {
        assert_eq!(trailing_limit(None), None);
        assert_eq!(trailing_limit(Some("")), None);
        assert_eq!(trailing_limit(Some("abc")), None);
        assert_eq!(trailing_limit(Some("0")), None);
        assert_eq!(trailing_limit(Some("-3")), None);
        assert_eq!(trailing_limit(Some("0.5")), None);
        assert_eq!(trailing_limit(Some("NaN")), None);
    }
}
