use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use crate::error::FinError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// A failed request. Storage and internal failures are logged and reported
/// with a generic message.
#[derive(Debug)]
pub struct ApiError(pub FinError);

impl ApiError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self(FinError::Other(msg.into()))
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(FinError::InvalidInput(msg.into()))
    }

    fn status(&self) -> StatusCode {
        match &self.0 {
            FinError::NotFound(_) => StatusCode::NOT_FOUND,
            FinError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            FinError::IntegrityConflict(_) | FinError::InvalidInput(_) | FinError::ParseFailure(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<FinError> for ApiError {
    fn from(e: FinError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self.0, "request failed");
            "Internal server error".to_string()
        } else {
            self.0.to_string()
        };
        let body = Json(ErrorBody { detail });
        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}
