//! Error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use diag_common::DiagError;

/// A [`DiagError`] rendered as `{"msg": ...}` with its HTTP status.
#[derive(Debug)]
pub struct ApiError(pub DiagError);

impl From<DiagError> for ApiError {
    fn from(err: DiagError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(error = %self.0, "Unable to read diagnostic data");
        } else {
            warn!(error = %self.0, "Rejected diagnostic request");
        }

        (status, Json(json!({ "msg": self.0.client_message() }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (DiagError::GroupNotFound("a".into()), StatusCode::NOT_FOUND),
            (DiagError::GroupPathConflict("a".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (DiagError::filter("latitude", "bad"), StatusCode::BAD_REQUEST),
            (DiagError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).into_response().status(), status);
        }
    }
}
