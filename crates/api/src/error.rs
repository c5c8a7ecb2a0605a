//! API error types with HTTP response mapping.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use reservation::{ErrorKind, ReservationError};
use store::StoreError;

/// API-level error type that maps to HTTP responses.
///
/// Every response carries `{"error": {"kind": ..., "message": ...}}`.
#[derive(Debug)]
pub enum ApiError {
    /// No usable identity on the request.
    Unauthenticated(String),
    /// Malformed request body, path or query.
    BadRequest(String),
    /// Rejected or aborted by the reservation coordinator.
    Reservation(ReservationError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Reservation(err) => status_for_kind(err.kind()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated(_) => "unauthenticated",
            ApiError::BadRequest(_) => ErrorKind::Validation.as_str(),
            ApiError::Reservation(err) => err.kind().as_str(),
        }
    }
}

fn status_for_kind(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation | ErrorKind::InvalidSelection => StatusCode::BAD_REQUEST,
        ErrorKind::SeatUnavailable | ErrorKind::InvalidState => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
        ErrorKind::TransactionAborted => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();
        let message = match self {
            ApiError::Unauthenticated(msg) | ApiError::BadRequest(msg) => msg,
            ApiError::Reservation(err) => err.to_string(),
        };

        metrics::counter!("api_errors_total", "kind" => kind, "status" => status.as_str().to_owned())
            .increment(1);
        if status.is_server_error() {
            tracing::error!(%kind, error = %message, "request failed");
        }

        let body = serde_json::json!({ "error": { "kind": kind, "message": message } });
        (status, axum::Json(body)).into_response()
    }
}

impl From<ReservationError> for ApiError {
    fn from(err: ReservationError) -> Self {
        ApiError::Reservation(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Reservation(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
