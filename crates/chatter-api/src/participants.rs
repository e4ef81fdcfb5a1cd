use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
};
use tracing::{debug, info, warn};

use chatter_types::api::RegisterRequest;
use chatter_types::models::Participant;

use crate::error::ApiError;
use crate::extract::ValidJson;
use crate::middleware::CallerIdentity;
use crate::{AppState, blocking};

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub async fn register(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> Result<StatusCode, ApiError> {
    let name = req.name.clone();
    let created = blocking(&state, move |db| db.create_participant(&name, now_millis())).await?;

    if !created {
        warn!("Participant name {:?} already taken", req.name);
        return Err(ApiError::Conflict(req.name));
    }

    info!("Participant {:?} joined", req.name);
    Ok(StatusCode::CREATED)
}

pub async fn list_participants(
    State(state): State<AppState>,
) -> Result<Json<Vec<Participant>>, ApiError> {
    let rows = blocking(&state, |db| db.list_participants()).await?;

    Ok(Json(
        rows.into_iter()
            .map(|row| Participant {
                name: row.name,
                last_status: row.last_status,
            })
            .collect(),
    ))
}

/// POST /status — keep-alive for the calling participant.
pub async fn heartbeat(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<StatusCode, ApiError> {
    let not_found = || ApiError::NotFound {
        resource: "participant",
        id: caller.name().unwrap_or_default().to_string(),
    };

    let name = caller.name().ok_or_else(not_found)?.to_string();
    let touched = blocking(&state, move |db| db.touch_participant(&name, now_millis())).await?;
    if !touched {
        return Err(not_found());
    }

    debug!("Heartbeat from {:?}", caller.name());
    Ok(StatusCode::OK)
}
