//! Lemon Error Types
//!
//! Lemon-specific error variants that integrate with the unified
//! `kernel::error::AppError` system and the error normalizer.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::response::{IntoResponse, Response};
use kernel::error::{
    app_error::AppError,
    field::FieldErrors,
    kind::ErrorKind,
    normalizer::{ErrorHandler, ErrorPayload, ErrorSource},
};
use thiserror::Error;

/// Lemon result type alias
pub type LemonResult<T> = Result<T, LemonError>;

#[derive(Debug, Error)]
pub enum LemonError {
    #[error("User not found")]
    UserNotFound,

    /// Unknown user, wrong password, malformed input or locked account.
    /// Deliberately indistinguishable.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Correct password on a blocked account
    #[error("Account is blocked")]
    AccountBlocked,

    /// Not signed in, or the session is no longer valid
    #[error("Authentication required")]
    SessionInvalid,

    #[error("Remember-me token is invalid or expired")]
    RememberMeInvalid,

    #[error("Access denied")]
    Forbidden,

    #[error("Email is already verified")]
    AlreadyVerified,

    #[error("Verification code is invalid")]
    InvalidVerificationCode,

    #[error("Password reset code is invalid or expired")]
    InvalidResetCode,

    /// Input failed validation; every offending field is listed
    #[error("{0}")]
    Validation(FieldErrors),

    /// Request body or query could not be read
    #[error("Malformed request")]
    Request(#[source] RequestRejection),

    #[error("Mail delivery failed")]
    Mail(#[from] platform::mail::MailError),

    #[error("CAPTCHA verification unavailable")]
    Captcha(#[from] platform::captcha::CaptchaError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Extractor rejections carried by [`LemonError::Request`]
#[derive(Debug, Error)]
pub enum RequestRejection {
    #[error(transparent)]
    Json(#[from] JsonRejection),

    #[error(transparent)]
    Query(#[from] QueryRejection),
}

impl LemonError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LemonError::UserNotFound => ErrorKind::NotFound,
            LemonError::InvalidCredentials
            | LemonError::SessionInvalid
            | LemonError::RememberMeInvalid => ErrorKind::Unauthorized,
            LemonError::AccountBlocked | LemonError::Forbidden => ErrorKind::Forbidden,
            LemonError::AlreadyVerified => ErrorKind::Conflict,
            LemonError::InvalidVerificationCode
            | LemonError::InvalidResetCode
            | LemonError::Request(_) => ErrorKind::BadRequest,
            LemonError::Validation(_) => ErrorKind::UnprocessableEntity,
            LemonError::Captcha(_) | LemonError::Mail(_) => ErrorKind::ServiceUnavailable,
            LemonError::Database(_) | LemonError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Convert to AppError
    pub fn to_app_error(&self) -> AppError {
        match self {
            LemonError::Validation(errors) => errors.iter().cloned().fold(
                AppError::new(self.kind(), "Validation failed"),
                AppError::with_field_error,
            ),
            LemonError::InvalidCredentials => AppError::new(self.kind(), self.to_string())
                .with_action("Check your email and password"),
            LemonError::SessionInvalid => {
                AppError::new(self.kind(), self.to_string()).with_action("Please sign in")
            }
            LemonError::InvalidResetCode => AppError::new(self.kind(), self.to_string())
                .with_action("Request a new password reset mail"),
            // Never leak infrastructure details
            LemonError::Database(_) | LemonError::Internal(_) => {
                AppError::new(self.kind(), "An unexpected error occurred")
            }
            _ => AppError::new(self.kind(), self.to_string()),
        }
    }

    /// Single-field validation failure
    pub fn field(
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let mut errors = FieldErrors::new();
        errors.add(field, code, message);
        LemonError::Validation(errors)
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            LemonError::Database(e) => {
                tracing::error!(error = %e, "Lemon database error");
            }
            LemonError::Internal(msg) => {
                tracing::error!(message = %msg, "Lemon internal error");
            }
            LemonError::Mail(e) => {
                tracing::error!(error = %e, "Mail delivery error");
            }
            LemonError::Captcha(e) => {
                tracing::error!(error = %e, "CAPTCHA service error");
            }
            LemonError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            LemonError::AccountBlocked => {
                tracing::warn!("Login attempt on blocked account");
            }
            LemonError::RememberMeInvalid => {
                tracing::warn!("Invalid remember-me token presented");
            }
            _ => {
                tracing::debug!(error = %self, "Lemon error");
            }
        }
    }
}

impl IntoResponse for LemonError {
    fn into_response(self) -> Response {
        self.log();
        let mut response = ErrorPayload::from(&self.to_app_error()).into_response();
        response
            .extensions_mut()
            .insert(ErrorSource(Arc::new(self)));
        response
    }
}

impl From<FieldErrors> for LemonError {
    fn from(errors: FieldErrors) -> Self {
        LemonError::Validation(errors)
    }
}

impl From<JsonRejection> for LemonError {
    fn from(rejection: JsonRejection) -> Self {
        LemonError::Request(rejection.into())
    }
}

impl From<QueryRejection> for LemonError {
    fn from(rejection: QueryRejection) -> Self {
        LemonError::Request(rejection.into())
    }
}

impl From<platform::client::FingerprintError> for LemonError {
    fn from(_: platform::client::FingerprintError) -> Self {
        LemonError::SessionInvalid
    }
}

// ============================================================================
// Normalizer handlers
// ============================================================================

/// Renders [`LemonError`]s, except request rejections which are left to
/// the next error in the source chain
pub struct LemonErrorHandler;

impl ErrorHandler for LemonErrorHandler {
    fn handle(&self, error: &(dyn std::error::Error + 'static)) -> Option<ErrorPayload> {
        match error.downcast_ref::<LemonError>()? {
            LemonError::Request(_) => None,
            other => Some(ErrorPayload::from(&other.to_app_error())),
        }
    }
}

/// Renders extractor rejections; only well-formed JSON of the wrong shape is
/// a 422, everything else is a 400
pub struct RejectionHandler;

impl ErrorHandler for RejectionHandler {
    fn handle(&self, error: &(dyn std::error::Error + 'static)) -> Option<ErrorPayload> {
        let (status, text) = match error.downcast_ref::<RequestRejection>()? {
            RequestRejection::Json(r) => (r.status(), r.body_text()),
            RequestRejection::Query(r) => (r.status(), r.body_text()),
        };
        let kind = match status.as_u16() {
            422 => ErrorKind::UnprocessableEntity,
            _ => ErrorKind::BadRequest,
        };
        Some(ErrorPayload::new(kind, text))
    }
}

/// Fallback handlers every Lemon normalizer carries
pub fn fallback_handlers() -> Vec<Arc<dyn ErrorHandler>> {
    vec![Arc::new(LemonErrorHandler), Arc::new(RejectionHandler)]
}
