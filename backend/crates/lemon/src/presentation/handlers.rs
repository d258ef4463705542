//! HTTP Handlers

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};

use platform::cookie::{CookieConfig, extract_cookie};

use crate::application::{
    ChangePasswordInput, ChangePasswordUseCase, FetchUserUseCase, ForgotPasswordUseCase,
    LemonServices, ResendVerificationUseCase, ResetPasswordInput, ResetPasswordUseCase,
    SignInInput, SignInUseCase, SignOutUseCase, SignUpInput, SignUpUseCase, UpdateUserInput,
    UpdateUserUseCase, VerifyEmailUseCase,
};
use crate::domain::repository::LemonRepository;
use crate::domain::value_object::UserId;
use crate::error::{LemonError, LemonResult};
use crate::presentation::dto::{
    ChangePasswordRequest, ContextResponse, FetchByEmailQuery, ForgotPasswordRequest,
    ResetPasswordRequest, SharedProperties, SignInRequest, SignUpRequest, UpdateUserRequest,
    UserDto, VerificationRequest,
};
use crate::presentation::extract::{ClientContext, CurrentUser, LemonJson, LemonQuery, MaybeUser};

/// Shared state for Lemon handlers
#[derive(Clone)]
pub struct LemonAppState<R: LemonRepository> {
    pub repo: Arc<R>,
    pub services: Arc<LemonServices>,
}

impl<R: LemonRepository> LemonAppState<R> {
    pub fn new(repo: R, services: LemonServices) -> Self {
        Self {
            repo: Arc::new(repo),
            services: Arc::new(services),
        }
    }
}

// ============================================================================
// Context
// ============================================================================

/// GET /api/core/context
pub async fn context<R: LemonRepository>(
    State(state): State<LemonAppState<R>>,
    MaybeUser(principal): MaybeUser,
) -> Json<ContextResponse> {
    let config = state.services.config();
    Json(ContextResponse {
        context: SharedProperties {
            application_url: config.application_url.clone(),
            re_captcha_site_key: config.recaptcha_site_key.clone(),
        },
        user: principal.map(|p| UserDto::own(&p.user)),
    })
}

// ============================================================================
// Sign Up / Sign In / Sign Out
// ============================================================================

/// POST /api/core/users
pub async fn sign_up<R: LemonRepository>(
    State(state): State<LemonAppState<R>>,
    ClientContext(fingerprint): ClientContext,
    LemonJson(req): LemonJson<SignUpRequest>,
) -> LemonResult<Response> {
    let use_case = SignUpUseCase::new(state.repo.clone(), state.services.clone());

    let input = SignUpInput {
        email: req.email,
        password: req.password,
        retype_password: req.retype_password,
        name: req.name,
        captcha_response: req.captcha_response,
    };

    let output = use_case.execute(input, fingerprint).await?;

    let mut headers = HeaderMap::new();
    append_cookie(
        &mut headers,
        state.services.config().session_cookie().set_cookie_header(&output.session_token),
    );

    Ok((StatusCode::CREATED, headers, Json(UserDto::own(&output.user))).into_response())
}

/// POST /api/core/login
pub async fn login<R: LemonRepository>(
    State(state): State<LemonAppState<R>>,
    ClientContext(fingerprint): ClientContext,
    LemonJson(req): LemonJson<SignInRequest>,
) -> LemonResult<Response> {
    let use_case = SignInUseCase::new(state.repo.clone(), state.services.clone());

    let remember_me = req.remember_me;
    let input = SignInInput {
        email: req.email,
        password: req.password,
        remember_me,
    };

    let output = use_case.execute(input, fingerprint).await?;

    // Session cookie lifetime must match the server-side session
    let config = state.services.config();
    let mut session_cookie = config.session_cookie();
    if remember_me {
        session_cookie.max_age_secs = Some(config.session_ttl_long.as_secs() as i64);
    }

    let mut headers = HeaderMap::new();
    append_cookie(
        &mut headers,
        session_cookie.set_cookie_header(&output.session_token),
    );
    if let Some(token) = &output.remember_me_token {
        append_cookie(&mut headers, config.remember_me_cookie().set_cookie_header(token));
    }

    Ok((StatusCode::OK, headers, Json(UserDto::own(&output.user))).into_response())
}

/// POST /api/core/logout
pub async fn logout<R: LemonRepository>(
    State(state): State<LemonAppState<R>>,
    MaybeUser(principal): MaybeUser,
    request_headers: HeaderMap,
) -> LemonResult<Response> {
    let config = state.services.config();
    let session_cookie = config.session_cookie();

    // The resolved session may have just been minted from a remember-me token
    let token = principal
        .map(|p| state.services.session_tokens().sign(&p.session.session_id))
        .or_else(|| extract_cookie(&request_headers, &session_cookie.name));

    SignOutUseCase::new(state.repo.clone(), state.services.clone())
        .execute(token.as_deref())
        .await?;

    let mut headers = HeaderMap::new();
    append_cookie(&mut headers, session_cookie.delete_cookie_header());
    append_cookie(&mut headers, config.remember_me_cookie().delete_cookie_header());

    Ok((StatusCode::NO_CONTENT, headers).into_response())
}

// ============================================================================
// Users
// ============================================================================

/// GET /api/core/users/{id}
pub async fn get_user<R: LemonRepository>(
    State(state): State<LemonAppState<R>>,
    MaybeUser(principal): MaybeUser,
    Path(id): Path<String>,
) -> LemonResult<Json<UserDto>> {
    let user_id = parse_user_id(&id)?;
    let subject = principal.as_ref().map(|p| p.subject());

    let view = FetchUserUseCase::new(state.repo.clone(), state.services.clone())
        .by_id(subject.as_ref(), &user_id)
        .await?;

    Ok(Json(view.into()))
}

/// GET /api/core/users/fetch-by-email?email=
pub async fn fetch_user_by_email<R: LemonRepository>(
    State(state): State<LemonAppState<R>>,
    MaybeUser(principal): MaybeUser,
    LemonQuery(query): LemonQuery<FetchByEmailQuery>,
) -> LemonResult<Json<UserDto>> {
    let subject = principal.as_ref().map(|p| p.subject());

    let view = FetchUserUseCase::new(state.repo.clone(), state.services.clone())
        .by_email(subject.as_ref(), &query.email)
        .await?;

    Ok(Json(view.into()))
}

/// PATCH /api/core/users/{id}
pub async fn update_user<R: LemonRepository>(
    State(state): State<LemonAppState<R>>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<String>,
    LemonJson(req): LemonJson<UpdateUserRequest>,
) -> LemonResult<Json<UserDto>> {
    let user_id = parse_user_id(&id)?;

    let input = UpdateUserInput {
        name: req.name,
        roles: req.roles.map(|roles| roles.into_iter().collect()),
    };

    let user = UpdateUserUseCase::new(state.repo.clone(), state.services.clone())
        .execute(&principal.subject(), &user_id, input)
        .await?;

    Ok(Json(UserDto::new(&user, true)))
}

/// POST /api/core/users/{id}/password
pub async fn change_password<R: LemonRepository>(
    State(state): State<LemonAppState<R>>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<String>,
    LemonJson(req): LemonJson<ChangePasswordRequest>,
) -> LemonResult<StatusCode> {
    let user_id = parse_user_id(&id)?;

    let input = ChangePasswordInput {
        old_password: req.old_password,
        new_password: req.password,
        retype_password: req.retype_password,
    };

    ChangePasswordUseCase::new(state.repo.clone(), state.services.clone())
        .execute(
            &principal.subject(),
            Some(&principal.session.session_id),
            &user_id,
            input,
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/core/users/{id}/verification
pub async fn verify_user<R: LemonRepository>(
    State(state): State<LemonAppState<R>>,
    Path(id): Path<String>,
    LemonJson(req): LemonJson<VerificationRequest>,
) -> LemonResult<StatusCode> {
    let user_id = parse_user_id(&id)?;

    VerifyEmailUseCase::new(state.repo.clone())
        .execute(&user_id, &req.code)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/core/users/{id}/resend-verification-mail
pub async fn resend_verification_mail<R: LemonRepository>(
    State(state): State<LemonAppState<R>>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<String>,
) -> LemonResult<StatusCode> {
    let user_id = parse_user_id(&id)?;

    ResendVerificationUseCase::new(state.repo.clone(), state.services.clone())
        .execute(&principal.subject(), &user_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Password reset
// ============================================================================

/// POST /api/core/forgot-password
pub async fn forgot_password<R: LemonRepository>(
    State(state): State<LemonAppState<R>>,
    LemonJson(req): LemonJson<ForgotPasswordRequest>,
) -> LemonResult<StatusCode> {
    ForgotPasswordUseCase::new(state.repo.clone(), state.services.clone())
        .execute(&req.email)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/core/reset-password
pub async fn reset_password<R: LemonRepository>(
    State(state): State<LemonAppState<R>>,
    LemonJson(req): LemonJson<ResetPasswordRequest>,
) -> LemonResult<StatusCode> {
    let input = ResetPasswordInput {
        code: req.code,
        new_password: req.new_password,
        retype_password: req.retype_password,
    };

    ResetPasswordUseCase::new(state.repo.clone(), state.services.clone())
        .execute(input)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Helper Functions
// ============================================================================

/// An id that is not a UUID names no user
fn parse_user_id(id: &str) -> LemonResult<UserId> {
    id.parse().map_err(|_| LemonError::UserNotFound)
}

pub(crate) fn append_cookie(headers: &mut HeaderMap, cookie: Option<HeaderValue>) {
    match cookie {
        Some(value) => {
            headers.append(header::SET_COOKIE, value);
        }
        None => tracing::error!("Cookie header could not be built"),
    }
}

/// Whether `headers` already set or clear the cookie described by `cookie`
pub(crate) fn sets_cookie(headers: &HeaderMap, cookie: &CookieConfig) -> bool {
    let prefix = format!("{}=", cookie.name);
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with(&prefix))
}
