//! Lemon Router

use axum::{
    Router, middleware,
    routing::{get, post},
};
use kernel::error::normalizer::normalize_error_responses;

use crate::application::LemonServices;
use crate::domain::repository::LemonRepository;
use crate::infra::postgres::PgLemonRepository;
use crate::presentation::handlers::{self, LemonAppState};
use crate::presentation::middleware::resolve_principal;

/// Every Lemon route lives under this prefix
pub const API_PREFIX: &str = "/api/core";

/// Create the Lemon router with the PostgreSQL repository
pub fn lemon_router(repo: PgLemonRepository, services: LemonServices) -> Router {
    lemon_router_generic(repo, services)
}

/// Create a Lemon router for any repository implementation
pub fn lemon_router_generic<R: LemonRepository>(repo: R, services: LemonServices) -> Router {
    lemon_router_with_state(LemonAppState::new(repo, services))
}

/// Create a Lemon router around already shared state
pub fn lemon_router_with_state<R: LemonRepository>(state: LemonAppState<R>) -> Router {
    let normalizer = state.services.error_normalizer();

    let routes = Router::new()
        .route("/context", get(handlers::context::<R>))
        .route("/users", post(handlers::sign_up::<R>))
        .route("/login", post(handlers::login::<R>))
        .route("/logout", post(handlers::logout::<R>))
        .route(
            "/users/fetch-by-email",
            get(handlers::fetch_user_by_email::<R>),
        )
        .route(
            "/users/{id}",
            get(handlers::get_user::<R>).patch(handlers::update_user::<R>),
        )
        .route("/users/{id}/password", post(handlers::change_password::<R>))
        .route("/users/{id}/verification", post(handlers::verify_user::<R>))
        .route(
            "/users/{id}/resend-verification-mail",
            post(handlers::resend_verification_mail::<R>),
        )
        .route("/forgot-password", post(handlers::forgot_password::<R>))
        .route("/reset-password", post(handlers::reset_password::<R>));

    Router::new()
        .nest(API_PREFIX, routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            resolve_principal::<R>,
        ))
        .layer(middleware::from_fn_with_state(
            normalizer,
            normalize_error_responses,
        ))
        .with_state(state)
}
