use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::fmt;

use crate::common::ChatError;

pub type AppResult<T> = Result<T, AppError>;

/// Error carried back to the HTTP client with its status code.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for AppError {}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        let status = match &err {
            ChatError::Conflict(_) => StatusCode::CONFLICT,
            ChatError::NotFound(_) => StatusCode::NOT_FOUND,
            ChatError::InvalidArgument(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ChatError::Unavailable(_) => {
                log::error!("Request failed: {err}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.to_string())
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    status: u16,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(ErrorResponse {
            error: self.message,
            status: status.as_u16(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_errors_map_to_status_codes() {
        let cases = [
            (ChatError::Conflict("x".into()), StatusCode::CONFLICT),
            (ChatError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ChatError::InvalidArgument("x".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (ChatError::Unavailable("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(AppError::from(err).status, expected);
        }
    }
}
