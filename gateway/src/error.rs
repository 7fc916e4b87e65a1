//! HTTP error mapping
//!
//! | Error | Status |
//! |-------|--------|
//! | upstream rejected / not found | 404 |
//! | upstream unreachable or malformed | 502 |
//! | missing or invalid query parameter | 422 |
//! | log store / internal | 500 |

use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use air_quality_client::UpstreamError;
use reading_log::LogError;

use crate::reporter::ErrorKind;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("Reading log error: {0}")]
    Storage(#[from] LogError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Upstream(UpstreamError::Rejected { .. }) | Self::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Reporter category. Validation failures are the caller's problem and
    /// are not reported.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Upstream(e) => Some(ErrorKind::from_upstream(e)),
            Self::NotFound(_) => Some(ErrorKind::NotFound),
            Self::Validation(_) => None,
            Self::Storage(_) => Some(ErrorKind::Storage),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "detail": self.to_string() }));
        (self.status(), body).into_response()
    }
}
