use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use kbase_core::Error;

const NOT_READY_DETAIL: &str = "Knowledge base not loaded.";
const INTERNAL_DETAIL: &str = "Internal server error while processing the query.";

/// Client-facing failure. Internal error text never reaches the response.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 422. `loc` is the path of the offending input, starting with `"body"`.
    #[error("Invalid request at {}: {message}", .loc.join("."))]
    Validation { loc: Vec<String>, message: String },
    /// 503.
    #[error("{}", NOT_READY_DETAIL)]
    NotReady,
    /// 500.
    #[error("{}", INTERNAL_DETAIL)]
    Internal,
}

impl ApiError {
    pub fn invalid(path: &[&str], message: impl Into<String>) -> Self {
        let loc = std::iter::once("body").chain(path.iter().copied()).map(str::to_string).collect();
        Self::Validation { loc, message: message.into() }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation { field, message } => Self::invalid(&[field.as_str()], message),
            Error::NotReady => Self::NotReady,
            other => {
                tracing::error!(error = %other, "query failed");
                Self::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::Validation { loc, message } => json!({ "detail": [{ "loc": loc, "msg": message }] }),
            Self::NotReady => json!({ "detail": NOT_READY_DETAIL }),
            Self::Internal => json!({ "detail": INTERNAL_DETAIL }),
        };
        (status, Json(body)).into_response()
    }
}
