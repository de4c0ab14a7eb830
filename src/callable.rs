//! Callable-style error envelope shared by every API route.
//!
//! Failures are returned as `{"error": {"status": "<code>", "message": "..."}}`
//! with the HTTP status implied by the code.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use crate::error::{AuthError, ConfigError, LlmError, OnboardingError, ProfileError, ReportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    Unauthenticated,
    InvalidArgument,
    NotFound,
    FailedPrecondition,
    Internal,
}

impl ErrorCode {
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::InvalidArgument | Self::FailedPrecondition => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CallableError {
    pub status: ErrorCode,
    pub message: String,
}

impl CallableError {
    pub fn new(status: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Log the underlying cause and hide it from the caller.
    fn internal(cause: &dyn std::fmt::Display, message: &str) -> Self {
        error!(error = %cause, "{message}");
        Self::new(ErrorCode::Internal, message)
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    error: &'a CallableError,
}

impl IntoResponse for CallableError {
    fn into_response(self) -> Response {
        (self.status.http_status(), Json(Envelope { error: &self })).into_response()
    }
}

impl From<AuthError> for CallableError {
    fn from(e: AuthError) -> Self {
        Self::new(
            ErrorCode::Unauthenticated,
            format!("You must be logged in: {e}"),
        )
    }
}

/// Undecodable request bodies. Handlers take `Result<Json<T>, JsonRejection>`
/// and unwrap it after authentication so the caller sees 401 first.
impl From<JsonRejection> for CallableError {
    fn from(e: JsonRejection) -> Self {
        Self::new(ErrorCode::InvalidArgument, e.body_text())
    }
}

impl From<ConfigError> for CallableError {
    fn from(e: ConfigError) -> Self {
        Self::new(ErrorCode::FailedPrecondition, e.to_string())
    }
}

impl From<LlmError> for CallableError {
    fn from(e: LlmError) -> Self {
        Self::internal(&e, "Failed to call the AI service.")
    }
}

impl From<ReportError> for CallableError {
    fn from(e: ReportError) -> Self {
        match e {
            ReportError::NotFound { .. } => Self::new(ErrorCode::NotFound, "User data not found."),
            ReportError::Precondition(message) => {
                Self::new(ErrorCode::FailedPrecondition, message)
            }
            ReportError::Configuration(e) => e.into(),
            ReportError::Generation(_) => Self::internal(&e, "Failed to call the AI service."),
            ReportError::Parse(_) | ReportError::Persistence(_) => {
                Self::internal(&e, "Failed to generate report.")
            }
        }
    }
}

impl From<OnboardingError> for CallableError {
    fn from(e: OnboardingError) -> Self {
        match e {
            OnboardingError::InvalidInput(message) => {
                Self::new(ErrorCode::InvalidArgument, message)
            }
            OnboardingError::InvalidState { .. } => {
                Self::new(ErrorCode::FailedPrecondition, e.to_string())
            }
            OnboardingError::Configuration(e) => e.into(),
            OnboardingError::NoSession { .. } => Self::new(ErrorCode::NotFound, e.to_string()),
            OnboardingError::AlreadyCompleted { .. } => {
                Self::new(ErrorCode::FailedPrecondition, e.to_string())
            }
            OnboardingError::Persistence(_) => Self::internal(&e, "Failed to load profile."),
        }
    }
}

impl From<ProfileError> for CallableError {
    fn from(e: ProfileError) -> Self {
        match e {
            ProfileError::InvalidInput(message) => Self::new(ErrorCode::InvalidArgument, message),
            ProfileError::NotFound { .. } => Self::new(ErrorCode::NotFound, "User data not found."),
            ProfileError::Persistence(_) => Self::internal(&e, "Failed to save profile."),
        }
    }
}
