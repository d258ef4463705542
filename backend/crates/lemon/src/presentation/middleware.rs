//! Principal Middleware
//!
//! Resolves the signed-in user of every request from the session cookie,
//! falling back to the remember-me cookie. The result is stored in the
//! request extensions for the [`CurrentUser`](super::extract::CurrentUser)
//! and [`MaybeUser`](super::extract::MaybeUser) extractors.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use platform::cookie::extract_cookie;

use crate::application::{CheckSessionUseCase, Principal, RememberMeLoginUseCase};
use crate::domain::repository::LemonRepository;
use crate::error::LemonError;
use crate::presentation::extract::client_fingerprint;
use crate::presentation::handlers::{LemonAppState, append_cookie, sets_cookie};

/// Cookie changes decided while resolving the principal
#[derive(Default)]
struct CookieUpdate {
    session_token: Option<String>,
    forget_remember_me: bool,
}

/// Middleware resolving the [`Principal`] of the request
///
/// Never rejects: a request without a usable session simply runs anonymous.
/// Blocked users are treated as anonymous.
pub async fn resolve_principal<R: LemonRepository>(
    State(state): State<LemonAppState<R>>,
    req: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = req.into_parts();
    let config = state.services.config();
    let session_cookie = config.session_cookie();
    let remember_me_cookie = config.remember_me_cookie();

    let mut update = CookieUpdate::default();
    let principal = match client_fingerprint(&parts) {
        Ok(fingerprint) => {
            let mut principal = None;

            if let Some(token) = extract_cookie(&parts.headers, &session_cookie.name) {
                match CheckSessionUseCase::new(state.repo.clone(), state.services.clone())
                    .execute(&token, &fingerprint)
                    .await
                {
                    Ok(p) if !p.user.is_blocked() => principal = Some(p),
                    Ok(p) => {
                        tracing::debug!(user_id = %p.user.user_id, "Ignoring session of blocked user")
                    }
                    Err(LemonError::SessionInvalid) => {}
                    Err(e) => tracing::warn!(error = %e, "Session check failed"),
                }
            }

            if principal.is_none() && state.services.remember_me_tokens().is_enabled() {
                if let Some(token) = extract_cookie(&parts.headers, &remember_me_cookie.name) {
                    match RememberMeLoginUseCase::new(state.repo.clone(), state.services.clone())
                        .execute(&token, &fingerprint)
                        .await
                    {
                        Ok(output) => {
                            update.session_token = Some(output.session_token);
                            principal = Some(output.principal);
                        }
                        Err(LemonError::RememberMeInvalid) => update.forget_remember_me = true,
                        Err(e) => tracing::warn!(error = %e, "Remember-me login failed"),
                    }
                }
            }

            principal
        }
        Err(e) => {
            tracing::debug!(error = %e, "No client fingerprint, request runs anonymous");
            None
        }
    };

    if let Some(principal) = principal {
        parts.extensions.insert::<Principal>(principal);
    }

    let mut response = next.run(Request::from_parts(parts, body)).await;

    // Handlers that set these cookies themselves (login, logout) win
    let headers = response.headers_mut();
    if let Some(token) = update.session_token {
        if !sets_cookie(headers, &session_cookie) {
            let mut cookie = session_cookie;
            cookie.max_age_secs = Some(config.session_ttl_long.as_secs() as i64);
            append_cookie(headers, cookie.set_cookie_header(&token));
        }
    }
    if update.forget_remember_me && !sets_cookie(headers, &remember_me_cookie) {
        append_cookie(headers, remember_me_cookie.delete_cookie_header());
    }

    response
}
