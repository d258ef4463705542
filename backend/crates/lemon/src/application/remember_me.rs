//! Remember-Me Login Use Case
//!
//! Trades a valid remember-me token for a fresh session when the session
//! cookie is gone.

use std::sync::Arc;

use crate::application::check_session::Principal;
use crate::application::services::LemonServices;
use crate::application::sign_in::{ClientFingerprint, start_session};
use crate::domain::repository::LemonRepository;
use crate::error::{LemonError, LemonResult};

pub struct RememberMeLoginOutput {
    pub principal: Principal,
    pub session_token: String,
}

pub struct RememberMeLoginUseCase<R: LemonRepository> {
    repo: Arc<R>,
    services: Arc<LemonServices>,
}

impl<R: LemonRepository> RememberMeLoginUseCase<R> {
    pub fn new(repo: Arc<R>, services: Arc<LemonServices>) -> Self {
        Self { repo, services }
    }

    pub async fn execute(
        &self,
        token: &str,
        fingerprint: &ClientFingerprint,
    ) -> LemonResult<RememberMeLoginOutput> {
        let tokens = self.services.remember_me_tokens();
        let claims = tokens.parse(token).ok_or(LemonError::RememberMeInvalid)?;

        let user = self
            .repo
            .find_user_by_id(&claims.user_id)
            .await?
            .ok_or(LemonError::RememberMeInvalid)?;
        let auth = self
            .repo
            .find_auth(&user.user_id)
            .await?
            .ok_or(LemonError::RememberMeInvalid)?;

        if !tokens.verify(&claims, &auth.password_hash) {
            return Err(LemonError::RememberMeInvalid);
        }
        if user.is_blocked() {
            tracing::warn!(user_id = %user.user_id, "Remember-me login refused for blocked user");
            return Err(LemonError::RememberMeInvalid);
        }

        let mut user = user;
        user.record_login();
        self.repo.update_user(&user).await?;

        let (session, session_token) =
            start_session(self.repo.as_ref(), &self.services, &user, true, fingerprint).await?;

        tracing::info!(
            user_id = %user.user_id,
            session_id = %session.session_id,
            "User signed in with remember-me token"
        );

        Ok(RememberMeLoginOutput {
            principal: Principal { user, session },
            session_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{TestContext, fingerprint};
    use crate::domain::repository::{AuthRepository, UserRepository};
    use crate::domain::value_object::role::{Role, Roles};
    use platform::password::HashedPassword;

    async fn issue(ctx: &TestContext, user_id: &crate::domain::value_object::UserId) -> String {
        let auth = ctx.repo.find_auth(user_id).await.unwrap().unwrap();
        ctx.services
            .remember_me_tokens()
            .issue(user_id, &auth.password_hash)
            .unwrap()
    }

    #[tokio::test]
    async fn test_token_mints_remember_me_session() {
        let ctx = TestContext::new();
        let user = ctx.user("ada@example.com", &[]).await;
        let token = issue(&ctx, &user.user_id).await;

        let output = RememberMeLoginUseCase::new(ctx.repo.clone(), ctx.services.clone())
            .execute(&token, &fingerprint())
            .await
            .unwrap();
        assert_eq!(output.principal.user.user_id, user.user_id);
        assert!(output.principal.session.remember_me);
        assert!(ctx.services.session_tokens().verify(&output.session_token).is_some());
    }

    #[tokio::test]
    async fn test_password_change_kills_token() {
        let ctx = TestContext::new();
        let user = ctx.user("ada@example.com", &[]).await;
        let token = issue(&ctx, &user.user_id).await;

        let mut auth = ctx.repo.find_auth(&user.user_id).await.unwrap().unwrap();
        auth.update_password(HashedPassword::new("test$changed"));
        ctx.repo.update_auth(&auth).await.unwrap();

        let err = RememberMeLoginUseCase::new(ctx.repo.clone(), ctx.services.clone())
            .execute(&token, &fingerprint())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, LemonError::RememberMeInvalid));
    }

    #[tokio::test]
    async fn test_blocked_user_cannot_auto_login() {
        let ctx = TestContext::new();
        let mut user = ctx.user("ada@example.com", &[]).await;
        let token = issue(&ctx, &user.user_id).await;

        user.set_roles(Roles::from([Role::Blocked]));
        ctx.repo.update_user(&user).await.unwrap();

        let result = RememberMeLoginUseCase::new(ctx.repo.clone(), ctx.services.clone())
            .execute(&token, &fingerprint())
            .await;
        assert!(matches!(result, Err(LemonError::RememberMeInvalid)));
    }
}
