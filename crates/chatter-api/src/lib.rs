pub mod error;
pub mod extract;
pub mod messages;
pub mod middleware;
pub mod participants;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};

use chatter_db::Database;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
}

impl AppStateInner {
    pub fn new(db: Database) -> AppState {
        Arc::new(Self { db })
    }
}

/// All chat routes with the caller-identity layer applied.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/participants",
            get(participants::list_participants).post(participants::register),
        )
        .route("/status", post(participants::heartbeat))
        .route(
            "/messages",
            get(messages::get_messages).post(messages::send_message),
        )
        .route(
            "/messages/{id}",
            put(messages::update_message).delete(messages::delete_message),
        )
        .route("/health", get(health))
        .layer(axum::middleware::from_fn(middleware::identify_caller))
        .with_state(state)
}

pub async fn health() -> &'static str {
    "ok"
}

/// Run a store call off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    let result = tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(anyhow::Error::from)?;

    Ok(result?)
}
