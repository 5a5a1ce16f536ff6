use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use vserve_common::ServeError;

/// Error body is `{"detail": "..."}` for every status.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    InvalidRequest(String),
    /// Body rejected before the handler ran: bad JSON, wrong field type, out-of-range value.
    #[error("{detail}")]
    Schema { status: StatusCode, detail: String },
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Schema { status, .. } => *status,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServeError> for ApiError {
    fn from(err: ServeError) -> Self {
        match err {
            ServeError::InvalidRequest(msg) => Self::InvalidRequest(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Schema { status: rejection.status(), detail: rejection.body_text() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match self {
            Self::Internal(msg) => {
                tracing::error!(target: "api", error = %msg, "request failed");
                "Internal Server Error".to_string()
            }
            Self::InvalidRequest(detail) | Self::Schema { detail, .. } => {
                tracing::debug!(target: "api", %status, %detail, "request rejected");
                detail
            }
        };
        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}
