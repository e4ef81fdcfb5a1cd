use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{debug, error};
use validator::ValidationErrors;

use chatter_types::schema::SchemaError;

/// Everything a handler can fail with. Clients only ever see the status code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("participant {0:?} already exists")]
    Conflict(String),

    #[error("{resource} {id:?} not found")]
    NotFound { resource: &'static str, id: String },

    #[error("message {0} belongs to someone else")]
    Unauthorized(String),

    #[error("store failure: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::Store(_) => error!("{}", self),
            _ => debug!("Rejected request: {}", self),
        }

        self.status().into_response()
    }
}

impl From<SchemaError> for ApiError {
    fn from(e: SchemaError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(e: ValidationErrors) -> Self {
        Self::Validation(e.to_string())
    }
}
