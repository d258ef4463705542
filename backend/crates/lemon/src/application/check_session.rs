//! Check Session Use Case
//!
//! Resolves a session cookie to the signed-in user.

use std::sync::Arc;

use crate::application::services::LemonServices;
use crate::application::sign_in::ClientFingerprint;
use crate::domain::entity::{auth_session::AuthSession, user::User};
use crate::domain::permission::Subject;
use crate::domain::repository::LemonRepository;
use crate::error::{LemonError, LemonResult};

/// The signed-in user of a request
#[derive(Debug, Clone)]
pub struct Principal {
    pub user: User,
    pub session: AuthSession,
}

impl Principal {
    pub fn subject(&self) -> Subject {
        Subject::from(&self.user)
    }
}

/// Check session use case
pub struct CheckSessionUseCase<R: LemonRepository> {
    repo: Arc<R>,
    services: Arc<LemonServices>,
}

impl<R: LemonRepository> CheckSessionUseCase<R> {
    pub fn new(repo: Arc<R>, services: Arc<LemonServices>) -> Self {
        Self { repo, services }
    }

    /// Validate the token and load its user
    ///
    /// A bad signature, an unknown or expired session, a different client
    /// or a vanished user all yield [`LemonError::SessionInvalid`].
    pub async fn execute(
        &self,
        session_token: &str,
        fingerprint: &ClientFingerprint,
    ) -> LemonResult<Principal> {
        let session_id = self
            .services
            .session_tokens()
            .verify(session_token)
            .ok_or(LemonError::SessionInvalid)?;

        let mut session = self
            .repo
            .find_session(&session_id)
            .await?
            .ok_or(LemonError::SessionInvalid)?;

        if !fingerprint.matches(&session.client_fingerprint_hash) {
            tracing::warn!(session_id = %session_id, "Auth session fingerprint mismatch");
            return Err(LemonError::SessionInvalid);
        }

        let Some(user) = self.repo.find_user_by_id(&session.user_id).await? else {
            self.repo.delete_session(&session_id).await?;
            return Err(LemonError::SessionInvalid);
        };

        session.touch();
        session.extend_if_needed(self.services.config().session_ttl(true));

        // Update in background
        let session_clone = session.clone();
        let repo = self.repo.clone();
        tokio::spawn(async move {
            if let Err(e) = repo.update_session(&session_clone).await {
                tracing::warn!(error = %e, "Failed to update session activity");
            }
        });

        Ok(Principal { user, session })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::sign_in::start_session;
    use crate::application::testing::{TestContext, fingerprint};
    use crate::domain::repository::AuthSessionRepository;

    #[tokio::test]
    async fn test_valid_session_resolves_user() {
        let ctx = TestContext::new();
        let user = ctx.user("ada@example.com", &[]).await;
        let (_, token) = start_session(ctx.repo.as_ref(), &ctx.services, &user, false, &fingerprint())
            .await
            .unwrap();

        let principal = CheckSessionUseCase::new(ctx.repo.clone(), ctx.services.clone())
            .execute(&token, &fingerprint())
            .await
            .unwrap();
        assert_eq!(principal.user.user_id, user.user_id);
        assert_eq!(principal.subject().user_id, user.user_id);
    }

    #[tokio::test]
    async fn test_other_client_rejected() {
        let ctx = TestContext::new();
        let user = ctx.user("ada@example.com", &[]).await;
        let (_, token) = start_session(ctx.repo.as_ref(), &ctx.services, &user, false, &fingerprint())
            .await
            .unwrap();

        let other = ClientFingerprint::for_user_agent("curl/8.0", None);
        let err = CheckSessionUseCase::new(ctx.repo.clone(), ctx.services.clone())
            .execute(&token, &other)
            .await
            .unwrap_err();
        assert!(matches!(err, LemonError::SessionInvalid));
    }

    #[tokio::test]
    async fn test_deleted_and_forged_sessions_rejected() {
        let ctx = TestContext::new();
        let user = ctx.user("ada@example.com", &[]).await;
        let (session, token) =
            start_session(ctx.repo.as_ref(), &ctx.services, &user, false, &fingerprint())
                .await
                .unwrap();
        let use_case = CheckSessionUseCase::new(ctx.repo.clone(), ctx.services.clone());

        let forged = format!("{}.AAAA", session.session_id);
        assert!(use_case.execute(&forged, &fingerprint()).await.is_err());

        ctx.repo.delete_session(&session.session_id).await.unwrap();
        assert!(use_case.execute(&token, &fingerprint()).await.is_err());
    }
}
