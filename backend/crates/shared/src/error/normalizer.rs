//! Error Normalizer
//!
//! Every failure that reaches a client is rendered as one [`ErrorPayload`]
//! shape, whatever its concrete type. The [`ErrorNormalizer`] holds an ordered
//! chain of [`ErrorHandler`]s. Each handler recognises one error type by
//! downcasting. The chain is consulted for the error itself and then for
//! every error in its `source()` chain. Application-registered handlers are
//! tried before the built-in ones. Anything nobody recognises becomes a
//! generic 500 that leaks no detail.
//!
//! ## Examples
//! ```rust
//! use kernel::error::{
//!     kind::ErrorKind,
//!     normalizer::{ErrorNormalizer, ErrorPayload},
//! };
//!
//! let normalizer = ErrorNormalizer::new().with_handler(|e: &std::num::ParseIntError| {
//!     ErrorPayload::new(ErrorKind::BadRequest, format!("not a number: {e}"))
//! });
//!
//! let err = "abc".parse::<u32>().unwrap_err();
//! let payload = normalizer.normalize(&err);
//! assert_eq!(payload.status, 400);
//! ```

use std::error::Error;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;

use super::app_error::AppError;
use super::field::{FieldError, FieldErrors};
use super::kind::ErrorKind;

/// Version of the client-facing error shape. Bump only on breaking changes.
pub const ERROR_PAYLOAD_VERSION: u32 = 1;

/// The stable client-facing error shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub version: u32,
    pub status: u16,
    /// Reason phrase, e.g. `"Not Found"`
    pub error: &'static str,
    /// Machine-readable kind, e.g. `"NOT_FOUND"`
    pub code: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl ErrorPayload {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            version: ERROR_PAYLOAD_VERSION,
            status: kind.status_code(),
            error: kind.as_str(),
            code: kind,
            message: message.into(),
            action: None,
            errors: Vec::new(),
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_errors(mut self, errors: Vec<FieldError>) -> Self {
        self.errors = errors;
        self
    }

    /// The generic payload used when no handler recognises an error
    pub fn internal() -> Self {
        Self::new(
            ErrorKind::InternalServerError,
            "An unexpected error occurred",
        )
    }
}

impl From<&AppError> for ErrorPayload {
    fn from(err: &AppError) -> Self {
        let payload = ErrorPayload::new(err.kind(), err.message())
            .with_errors(err.field_errors().to_vec());
        match err.action() {
            Some(action) => payload.with_action(action),
            None => payload,
        }
    }
}

/// One link of the normalizer chain
pub trait ErrorHandler: Send + Sync {
    /// Render `error` if this handler recognises it
    fn handle(&self, error: &(dyn Error + 'static)) -> Option<ErrorPayload>;
}

/// Handler recognising exactly one concrete error type `E`
pub struct TypedHandler<E, F> {
    render: F,
    _marker: PhantomData<fn(&E)>,
}

impl<E, F> TypedHandler<E, F>
where
    E: Error + 'static,
    F: Fn(&E) -> ErrorPayload + Send + Sync,
{
    pub fn new(render: F) -> Self {
        Self {
            render,
            _marker: PhantomData,
        }
    }
}

impl<E, F> ErrorHandler for TypedHandler<E, F>
where
    E: Error + 'static,
    F: Fn(&E) -> ErrorPayload + Send + Sync,
{
    fn handle(&self, error: &(dyn Error + 'static)) -> Option<ErrorPayload> {
        error.downcast_ref::<E>().map(&self.render)
    }
}

/// Ordered handler chain mapping any error to an [`ErrorPayload`]
#[derive(Clone)]
pub struct ErrorNormalizer {
    handlers: Vec<Arc<dyn ErrorHandler>>,
    defaults: Vec<Arc<dyn ErrorHandler>>,
}

impl ErrorNormalizer {
    /// Normalizer with the built-in handlers for kernel error types
    pub fn new() -> Self {
        let defaults: Vec<Arc<dyn ErrorHandler>> = vec![
            Arc::new(TypedHandler::new(|e: &AppError| ErrorPayload::from(e))),
            Arc::new(TypedHandler::new(|e: &FieldErrors| {
                ErrorPayload::new(ErrorKind::UnprocessableEntity, "Validation failed")
                    .with_errors(e.clone().into_vec())
            })),
            Arc::new(TypedHandler::new(|e: &serde_json::Error| {
                if e.is_syntax() || e.is_data() || e.is_eof() {
                    ErrorPayload::new(ErrorKind::BadRequest, format!("JSON parse error: {e}"))
                } else {
                    ErrorPayload::internal()
                }
            })),
        ];

        Self {
            handlers: Vec::new(),
            defaults,
        }
    }

    /// Register a handler for error type `E`, ahead of the built-in ones
    pub fn with_handler<E, F>(self, render: F) -> Self
    where
        E: Error + 'static,
        F: Fn(&E) -> ErrorPayload + Send + Sync + 'static,
    {
        self.with_error_handler(Arc::new(TypedHandler::new(render)))
    }

    /// Register an arbitrary handler, ahead of the built-in ones
    pub fn with_error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Register a handler behind the built-in ones
    ///
    /// Library crates use this for their own error types so that any handler
    /// the application registers with [`Self::with_handler`] still wins.
    pub fn with_fallback_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.defaults.push(handler);
        self
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len() + self.defaults.len()
    }

    /// Map `error` to a payload
    pub fn normalize(&self, error: &(dyn Error + 'static)) -> ErrorPayload {
        let mut current = Some(error);
        while let Some(err) = current {
            let handled = self
                .handlers
                .iter()
                .chain(self.defaults.iter())
                .find_map(|h| h.handle(err));
            if let Some(payload) = handled {
                if payload.status >= 500 {
                    tracing::error!(error = %error, status = payload.status, "Server error");
                }
                return payload;
            }
            current = err.source();
        }

        tracing::error!(error = %error, "Unhandled error normalized to 500");
        ErrorPayload::internal()
    }
}

impl Default for ErrorNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ErrorNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorNormalizer")
            .field("handlers", &self.handlers.len())
            .field("defaults", &self.defaults.len())
            .finish()
    }
}

// ============================================================================
// Axum integration (feature-gated)
// ============================================================================

/// Response extension carrying the error a response was rendered from
///
/// [`normalize_error_responses`] uses it to re-render the body with the
/// application's normalizer.
#[cfg(feature = "axum")]
#[derive(Clone)]
pub struct ErrorSource(pub Arc<dyn Error + Send + Sync + 'static>);

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for ErrorPayload {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;
        use axum::http::StatusCode;

        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Middleware re-rendering error responses through the given normalizer
///
/// Install with `axum::middleware::from_fn_with_state(Arc::new(normalizer), normalize_error_responses)`.
/// Headers set by the handler (e.g. `Set-Cookie`) are preserved.
#[cfg(feature = "axum")]
pub async fn normalize_error_responses(
    axum::extract::State(normalizer): axum::extract::State<Arc<ErrorNormalizer>>,
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    use axum::response::{IntoResponse, Response};

    let response = next.run(req).await;
    let Some(ErrorSource(source)) = response.extensions().get::<ErrorSource>().cloned() else {
        return response;
    };

    let payload = normalizer.normalize(source.as_ref());
    let (mut parts, _) = response.into_parts();
    let (rendered, body) = payload.into_response().into_parts();

    parts.status = rendered.status;
    parts.headers.remove(http::header::CONTENT_LENGTH);
    for (name, value) in rendered.headers.iter() {
        parts.headers.insert(name.clone(), value.clone());
    }
    parts.extensions.remove::<ErrorSource>();

    Response::from_parts(parts, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("outer failure")]
    struct Outer(#[source] std::io::Error);

    #[derive(Debug, thiserror::Error)]
    #[error("opaque")]
    struct Opaque;

    #[test]
    fn test_app_error_is_handled_by_default() {
        let normalizer = ErrorNormalizer::new();
        let err = AppError::not_found("User not found").with_action("Check the id");

        let payload = normalizer.normalize(&err);
        assert_eq!(payload.version, ERROR_PAYLOAD_VERSION);
        assert_eq!(payload.status, 404);
        assert_eq!(payload.error, "Not Found");
        assert_eq!(payload.code, ErrorKind::NotFound);
        assert_eq!(payload.message, "User not found");
        assert_eq!(payload.action.as_deref(), Some("Check the id"));
    }

    #[test]
    fn test_unknown_error_becomes_generic_500() {
        let payload = ErrorNormalizer::new().normalize(&Opaque);
        assert_eq!(payload, ErrorPayload::internal());
        assert!(!payload.message.contains("opaque"));
    }

    #[test]
    fn test_source_chain_is_walked() {
        let normalizer = ErrorNormalizer::new().with_handler(|e: &std::io::Error| {
            ErrorPayload::new(ErrorKind::ServiceUnavailable, e.to_string())
        });

        let err = Outer(std::io::Error::other("disk gone"));
        let payload = normalizer.normalize(&err);
        assert_eq!(payload.status, 503);
        assert_eq!(payload.message, "disk gone");
    }

    #[test]
    fn test_registered_handler_overrides_default() {
        let normalizer = ErrorNormalizer::new().with_handler(|_: &AppError| {
            ErrorPayload::new(ErrorKind::Forbidden, "overridden")
        });

        let payload = normalizer.normalize(&AppError::not_found("x"));
        assert_eq!(payload.status, 403);
        assert_eq!(payload.message, "overridden");
    }

    #[test]
    fn test_fallback_handler_loses_to_registered_one() {
        let fallback: Arc<dyn ErrorHandler> = Arc::new(TypedHandler::new(|_: &Opaque| {
            ErrorPayload::new(ErrorKind::Conflict, "fallback")
        }));

        let normalizer = ErrorNormalizer::new().with_fallback_handler(fallback.clone());
        assert_eq!(normalizer.normalize(&Opaque).message, "fallback");

        let normalizer = ErrorNormalizer::new()
            .with_fallback_handler(fallback)
            .with_handler(|_: &Opaque| ErrorPayload::new(ErrorKind::Gone, "app"));
        assert_eq!(normalizer.normalize(&Opaque).message, "app");
        assert_eq!(normalizer.handler_count(), 5);
    }

    #[test]
    fn test_outermost_match_wins() {
        let normalizer = ErrorNormalizer::new()
            .with_handler(|_: &Outer| ErrorPayload::new(ErrorKind::Conflict, "outer"))
            .with_handler(|_: &std::io::Error| ErrorPayload::new(ErrorKind::Gone, "inner"));

        let payload = normalizer.normalize(&Outer(std::io::Error::other("x")));
        assert_eq!(payload.message, "outer");
    }

    #[test]
    fn test_field_errors_are_rendered() {
        let mut errors = FieldErrors::new();
        errors.add("retypePassword", "PasswordMismatch", "Passwords do not match");

        let payload = ErrorNormalizer::new().normalize(&errors);
        assert_eq!(payload.status, 422);
        assert_eq!(payload.errors.len(), 1);

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["code"], "UNPROCESSABLE_ENTITY");
        assert_eq!(json["errors"][0]["field"], "retypePassword");
        assert!(json.get("action").is_none());
    }

    #[test]
    fn test_payload_shape_is_stable() {
        let payload = ErrorPayload::new(ErrorKind::Unauthorized, "Invalid credentials");
        let json = serde_json::to_value(&payload).unwrap();

        let mut keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, ["code", "error", "message", "status", "version"]);
    }
}
