//! Sign In Use Case
//!
//! Authenticates a user and creates a session.

use std::sync::Arc;

use crate::application::services::LemonServices;
use crate::domain::entity::{auth_session::AuthSession, user::User};
use crate::domain::repository::{AuthSessionRepository, LemonRepository};
use crate::domain::value_object::{email::Email, user_password::candidate_password};
use crate::error::{LemonError, LemonResult};

/// Re-export ClientFingerprint from platform
pub use platform::client::ClientFingerprint;

/// Sign in input
pub struct SignInInput {
    pub email: String,
    pub password: String,
    pub remember_me: bool,
}

/// Sign in output
#[derive(Debug)]
pub struct SignInOutput {
    pub user: User,
    /// Session token for cookie
    pub session_token: String,
    /// Present when "Remember Me" was requested and keys are configured
    pub remember_me_token: Option<String>,
}

/// Create and persist a session, returning its signed token
pub(crate) async fn start_session<S: AuthSessionRepository>(
    sessions: &S,
    services: &LemonServices,
    user: &User,
    remember_me: bool,
    fingerprint: &ClientFingerprint,
) -> LemonResult<(AuthSession, String)> {
    let session = AuthSession::new(
        user.user_id,
        remember_me,
        fingerprint,
        services.config().session_ttl(remember_me),
    );
    sessions.create_session(&session).await?;

    let token = services.session_tokens().sign(&session.session_id);
    Ok((session, token))
}

/// Sign in use case
pub struct SignInUseCase<R: LemonRepository> {
    repo: Arc<R>,
    services: Arc<LemonServices>,
}

impl<R: LemonRepository> SignInUseCase<R> {
    pub fn new(repo: Arc<R>, services: Arc<LemonServices>) -> Self {
        Self { repo, services }
    }

    pub async fn execute(
        &self,
        input: SignInInput,
        fingerprint: ClientFingerprint,
    ) -> LemonResult<SignInOutput> {
        let encoder = self.services.password_encoder();

        let password = candidate_password(input.password).ok_or(LemonError::InvalidCredentials)?;
        let email = match Email::new(&input.email) {
            Ok(email) => email,
            Err(_) => {
                encoder.match_dummy(&password);
                return Err(LemonError::InvalidCredentials);
            }
        };

        let Some(user) = self.repo.find_user_by_email(&email).await? else {
            encoder.match_dummy(&password);
            return Err(LemonError::InvalidCredentials);
        };

        // Counted as a failure before the check; a match resets it below
        let Some(mut auth) = self.repo.record_login_attempt(&user.user_id).await? else {
            tracing::warn!(user_id = %user.user_id, "Sign in attempt on locked account");
            encoder.match_dummy(&password);
            return Err(LemonError::InvalidCredentials);
        };

        if !encoder.matches(&password, &auth.password_hash) {
            tracing::warn!(
                user_id = %user.user_id,
                failed_count = auth.login_failed_count,
                "Wrong password"
            );
            return Err(LemonError::InvalidCredentials);
        }

        // Reset failure count, upgrading the hash if its parameters are stale
        auth.reset_failures();
        if encoder.needs_rehash(&auth.password_hash) {
            match encoder.encode(&password) {
                Ok(rehashed) => auth.update_password(rehashed),
                Err(e) => tracing::warn!(error = %e, "Password rehash failed"),
            }
        }
        self.repo.update_auth(&auth).await?;

        if user.is_blocked() {
            return Err(LemonError::AccountBlocked);
        }

        let mut user = user;
        user.record_login();
        self.repo.update_user(&user).await?;

        let (session, session_token) = start_session(
            self.repo.as_ref(),
            &self.services,
            &user,
            input.remember_me,
            &fingerprint,
        )
        .await?;

        let remember_me_token = if input.remember_me {
            self.services
                .remember_me_tokens()
                .issue(&user.user_id, &auth.password_hash)
        } else {
            None
        };

        tracing::info!(
            user_id = %user.user_id,
            session_id = %session.session_id,
            remember_me = input.remember_me,
            "User signed in"
        );

        Ok(SignInOutput {
            user,
            session_token,
            remember_me_token,
        })
    }
}
