//! Email Verification Use Cases

use std::sync::Arc;

use crate::application::mail::verification_mail;
use crate::application::services::LemonServices;
use crate::domain::entity::user::User;
use crate::domain::permission::{Action, Resource, Subject};
use crate::domain::repository::LemonRepository;
use crate::domain::value_object::{UserId, one_time_code::OneTimeCode};
use crate::error::{LemonError, LemonResult};

/// Consume the code from a verification mail
pub struct VerifyEmailUseCase<R: LemonRepository> {
    repo: Arc<R>,
}

impl<R: LemonRepository> VerifyEmailUseCase<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self, user_id: &UserId, code: &str) -> LemonResult<User> {
        let mut user = self
            .repo
            .find_user_by_id(user_id)
            .await?
            .ok_or(LemonError::UserNotFound)?;

        if !user.is_unverified() {
            return Err(LemonError::AlreadyVerified);
        }

        let valid = user
            .verification_code_hash
            .as_deref()
            .is_some_and(|hash| OneTimeCode::matches(code, hash));
        if !valid {
            tracing::warn!(user_id = %user_id, "Wrong verification code");
            return Err(LemonError::InvalidVerificationCode);
        }

        user.mark_verified();
        self.repo.update_user(&user).await?;

        tracing::info!(user_id = %user_id, "Email verified");
        Ok(user)
    }
}

/// Issue a new code and mail it again
pub struct ResendVerificationUseCase<R: LemonRepository> {
    repo: Arc<R>,
    services: Arc<LemonServices>,
}

impl<R: LemonRepository> ResendVerificationUseCase<R> {
    pub fn new(repo: Arc<R>, services: Arc<LemonServices>) -> Self {
        Self { repo, services }
    }

    pub async fn execute(&self, subject: &Subject, user_id: &UserId) -> LemonResult<()> {
        let mut user = self
            .repo
            .find_user_by_id(user_id)
            .await?
            .ok_or(LemonError::UserNotFound)?;

        if !self.services.permission_evaluator().has_permission(
            Some(subject),
            &Resource::User(user.user_id),
            Action::Edit,
        ) {
            return Err(LemonError::Forbidden);
        }

        if !user.is_unverified() {
            return Err(LemonError::AlreadyVerified);
        }

        let code = OneTimeCode::generate();
        user.start_verification(code.hash().to_string());
        self.repo.update_user(&user).await?;

        self.services
            .mail_sender()
            .send(verification_mail(self.services.config(), &user, code.plain()))
            .await?;

        tracing::info!(user_id = %user_id, "Verification mail resent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::TestContext;
    use crate::domain::value_object::role::Role;

    /// Code from the last mail to `to`
    fn mailed_code(ctx: &TestContext, to: &str) -> String {
        let mail = ctx.mail.last_to(to).unwrap();
        let (_, code) = mail.body.split_once("code=").unwrap();
        code.split_whitespace().next().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_resend_then_verify() {
        let ctx = TestContext::new();
        let user = ctx.user("ada@example.com", &[Role::Unverified]).await;
        let subject = Subject::from(&user);

        ResendVerificationUseCase::new(ctx.repo.clone(), ctx.services.clone())
            .execute(&subject, &user.user_id)
            .await
            .unwrap();
        let code = mailed_code(&ctx, "ada@example.com");

        let verify = VerifyEmailUseCase::new(ctx.repo.clone());
        let err = verify.execute(&user.user_id, "wrong").await.unwrap_err();
        assert!(matches!(err, LemonError::InvalidVerificationCode));

        let verified = verify.execute(&user.user_id, &code).await.unwrap();
        assert!(!verified.is_unverified());
        assert!(verified.verification_code_hash.is_none());

        let err = verify.execute(&user.user_id, &code).await.unwrap_err();
        assert!(matches!(err, LemonError::AlreadyVerified));
    }

    #[tokio::test]
    async fn test_resend_only_by_owner_or_admin() {
        let ctx = TestContext::new();
        let user = ctx.user("ada@example.com", &[Role::Unverified]).await;
        let stranger = ctx.user("eve@example.com", &[]).await;
        let admin = ctx.user("root@example.com", &[Role::Admin]).await;
        let use_case = ResendVerificationUseCase::new(ctx.repo.clone(), ctx.services.clone());

        let err = use_case
            .execute(&Subject::from(&stranger), &user.user_id)
            .await
            .unwrap_err();
        assert!(matches!(err, LemonError::Forbidden));

        use_case
            .execute(&Subject::from(&admin), &user.user_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_resend_refused_once_verified() {
        let ctx = TestContext::new();
        let user = ctx.user("ada@example.com", &[]).await;

        let err = ResendVerificationUseCase::new(ctx.repo.clone(), ctx.services.clone())
            .execute(&Subject::from(&user), &user.user_id)
            .await
            .unwrap_err();
        assert!(matches!(err, LemonError::AlreadyVerified));
        assert!(ctx.mail.sent().is_empty());
    }
}
