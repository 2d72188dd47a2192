use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::services::window_service::WindowError;

/// Failure surfaced by an HTTP handler
///
/// Only bad input reaches the client verbatim; everything else is logged and
/// reported as a generic server error.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    Window(#[from] WindowError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl RouteError {
    pub fn status(&self) -> StatusCode {
        match self {
            RouteError::Window(WindowError::InvalidDate(_)) => StatusCode::BAD_REQUEST,
            RouteError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            RouteError::Window(WindowError::InvalidDate(_)) => "invalid-date",
            RouteError::Internal(_) => "server-error",
        }
    }
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, axum::Json(json!({ "error": self.code() }))).into_response()
    }
}

impl From<tokio::task::JoinError> for RouteError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Internal(e.to_string())
    }
}
