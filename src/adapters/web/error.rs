//! HTTP error responses for web adapter.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::domain::error::SimError;

use super::types::ErrorResponse;

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

pub fn status_from_error(err: &SimError) -> StatusCode {
    match err {
        SimError::ConfigMissing { .. }
        | SimError::ConfigInvalid { .. }
        | SimError::ConfigParse { .. }
        | SimError::UnknownInstrument { .. }
        | SimError::InvalidTime { .. } => StatusCode::BAD_REQUEST,
        SimError::PriceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        SimError::Data { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        SimError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<SimError> for WebError {
    fn from(err: SimError) -> Self {
        Self::new(status_from_error(&err), err.to_string())
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_input_errors_are_bad_requests() {
        let err = SimError::UnknownInstrument {
            symbol: "CL".into(),
        };
        assert_eq!(status_from_error(&err), StatusCode::BAD_REQUEST);
        let err = SimError::InvalidTime {
            value: "25:00".into(),
            reason: "bad".into(),
        };
        assert_eq!(WebError::from(err).status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn missing_price_is_service_unavailable() {
        let err = SimError::PriceUnavailable {
            instrument: "NQ".into(),
        };
        let web = WebError::from(err);
        assert_eq!(web.status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(web.message.contains("NQ"));
    }
}
