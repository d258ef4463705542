//! Request Extractors
//!
//! Every rejection is a [`LemonError`], so malformed requests render through
//! the same normalizer as everything else.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequest, FromRequestParts};
use axum::http::request::Parts;
use platform::client::{ClientFingerprint, extract_client_ip, extract_fingerprint};

use crate::application::check_session::Principal;
use crate::error::LemonError;

/// JSON body whose rejection is a [`LemonError`]
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(LemonError))]
pub struct LemonJson<T>(pub T);

/// Query string whose rejection is a [`LemonError`]
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(LemonError))]
pub struct LemonQuery<T>(pub T);

/// Fingerprint and address of the calling client
pub struct ClientContext(pub ClientFingerprint);

pub(crate) fn client_fingerprint(parts: &Parts) -> Result<ClientFingerprint, LemonError> {
    let direct_ip = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip());
    let client_ip = extract_client_ip(&parts.headers, direct_ip);
    Ok(extract_fingerprint(&parts.headers, client_ip)?)
}

impl<S: Send + Sync> FromRequestParts<S> for ClientContext {
    type Rejection = LemonError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        client_fingerprint(parts).map(ClientContext)
    }
}

/// The signed-in user; rejects with 401 when there is none
pub struct CurrentUser(pub Principal);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = LemonError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .map(CurrentUser)
            .ok_or(LemonError::SessionInvalid)
    }
}

/// The signed-in user, if any
pub struct MaybeUser(pub Option<Principal>);

impl<S: Send + Sync> FromRequestParts<S> for MaybeUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<Principal>().cloned()))
    }
}
