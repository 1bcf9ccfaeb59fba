// src/error.rs

use std::{fmt, panic::Location};

use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// The single unit of failure information across the service.
///
/// Every handler, store and helper reports failure through this type. It is
/// immutable once built: fields are private and only exposed through getters.
/// When no trace is supplied, the source location of the constructor call is
/// recorded instead.
#[derive(Debug, Clone)]
pub struct ApiError {
    status_code: u16,
    message: String,
    errors: Vec<String>,
    stack: String,
}

/// Wire shape of a failure: `{statusCode, data: null, message, success: false, errors}`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    status_code: u16,
    data: (),
    message: &'a str,
    success: bool,
    errors: &'a [String],
}

impl ApiError {
    #[track_caller]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        let origin = Location::caller();
        Self {
            status_code: status.as_u16(),
            message: message.into(),
            errors: Vec::new(),
            stack: format!("{}:{}:{}", origin.file(), origin.line(), origin.column()),
        }
    }

    #[track_caller]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    #[track_caller]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    #[track_caller]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    #[track_caller]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Attaches auxiliary error details, kept in the given order.
    pub fn with_errors<I, S>(mut self, errors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.errors = errors.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the captured origin with an explicit trace.
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = stack.into();
        self
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Always `false`: an `ApiError` is never a success envelope.
    pub fn success(&self) -> bool {
        false
    }

    pub fn stack(&self) -> &str {
        &self.stack
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status_code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Centralized error responder.
/// Serializes the error envelope with the matching HTTP status code.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(origin = %self.stack, "{}", self.message);
        }

        let body = ErrorBody {
            status_code: self.status_code,
            data: (),
            message: &self.message,
            success: false,
            errors: &self.errors,
        };

        (status, Json(body)).into_response()
    }
}

/// Database failures surface as an opaque 500; the detail only goes to the log.
impl From<sqlx::Error> for ApiError {
    #[track_caller]
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {}", err);
        ApiError::internal("Internal Server Error")
    }
}

impl From<MultipartError> for ApiError {
    #[track_caller]
    fn from(err: MultipartError) -> Self {
        ApiError::bad_request(format!("Invalid multipart payload: {}", err.body_text()))
    }
}

impl From<std::io::Error> for ApiError {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        tracing::error!("I/O error: {}", err);
        ApiError::internal("Internal Server Error")
    }
}
