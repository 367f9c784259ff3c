use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use extdocs_core::DocError;
use serde::Serialize;

/// Error body. `content` and `development` mirror the page payload so a
/// consumer reading it as a page shows the failure instead of content.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub code: String,
    pub message: String,
    pub hint: String,
    pub content: String,
    pub development: bool,
}

impl ErrorEnvelope {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        hint: impl Into<String>,
    ) -> Self {
        let message = message.into();
        Self {
            code: code.into(),
            content: format!("Failed to render due to: {}", message),
            message,
            hint: hint.into(),
            development: true,
        }
    }
}

pub struct AppError {
    pub status: StatusCode,
    pub body: ErrorEnvelope,
}

impl AppError {
    fn new(status: StatusCode, code: &str, message: impl std::fmt::Display, hint: &str) -> Self {
        Self {
            status,
            body: ErrorEnvelope::new(code, message.to_string(), hint),
        }
    }

    pub fn internal(msg: impl std::fmt::Display) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            msg,
            "Check service logs for details",
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, axum::Json(self.body)).into_response()
    }
}

impl From<DocError> for AppError {
    fn from(err: DocError) -> Self {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        match &err {
            DocError::RateLimited => Self::new(
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                err,
                "The graph store is rate limiting queries, retry later",
            ),
            DocError::NotFound(_) => Self::new(
                status,
                "not_found",
                err,
                "Check the extension id and try again",
            ),
            DocError::ReferenceCycle(_) => Self::new(
                status,
                "reference_cycle",
                err,
                "Remove the embed that points back into its own chain",
            ),
            _ if err.is_upstream() => Self::new(
                status,
                "upstream_error",
                err,
                "The graph store or GitHub request failed",
            ),
            _ => AppError::internal(err),
        }
    }
}
