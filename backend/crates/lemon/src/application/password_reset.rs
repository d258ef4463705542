//! Forgot / Reset Password Use Cases

use std::sync::Arc;

use kernel::error::field::FieldErrors;
use platform::crypto::hash_code;

use crate::application::mail::forgot_password_mail;
use crate::application::services::LemonServices;
use crate::domain::repository::LemonRepository;
use crate::domain::value_object::{
    email::Email, one_time_code::OneTimeCode, user_password::new_password_with_retype,
};
use crate::error::{LemonError, LemonResult};

/// Mail a reset link; silent about whether the address is known
pub struct ForgotPasswordUseCase<R: LemonRepository> {
    repo: Arc<R>,
    services: Arc<LemonServices>,
}

impl<R: LemonRepository> ForgotPasswordUseCase<R> {
    pub fn new(repo: Arc<R>, services: Arc<LemonServices>) -> Self {
        Self { repo, services }
    }

    pub async fn execute(&self, email: &str) -> LemonResult<()> {
        let email =
            Email::new(email).map_err(|e| LemonError::field("email", e.code(), e.to_string()))?;

        let Some(mut user) = self.repo.find_user_by_email(&email).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let code = OneTimeCode::generate();
        user.start_password_reset(code.hash().to_string(), self.services.config().reset_code_ttl());
        self.repo.update_user(&user).await?;

        let mail = forgot_password_mail(self.services.config(), &user, code.plain());
        if let Err(e) = self.services.mail_sender().send(mail).await {
            tracing::error!(user_id = %user.user_id, error = %e, "Failed to send password reset mail");
            return Ok(());
        }

        tracing::info!(user_id = %user.user_id, "Password reset mail sent");
        Ok(())
    }
}

pub struct ResetPasswordInput {
    pub code: String,
    pub new_password: String,
    pub retype_password: String,
}

/// Set a new password using a mailed reset code
pub struct ResetPasswordUseCase<R: LemonRepository> {
    repo: Arc<R>,
    services: Arc<LemonServices>,
}

impl<R: LemonRepository> ResetPasswordUseCase<R> {
    pub fn new(repo: Arc<R>, services: Arc<LemonServices>) -> Self {
        Self { repo, services }
    }

    pub async fn execute(&self, input: ResetPasswordInput) -> LemonResult<()> {
        let mut errors = FieldErrors::new();
        if input.code.trim().is_empty() {
            errors.add("code", "Blank", "Code must not be blank");
        }
        let password = new_password_with_retype(
            &mut errors,
            "newPassword",
            input.new_password,
            "retypePassword",
            &input.retype_password,
        );
        let (Some(password), true) = (password, errors.is_empty()) else {
            return Err(LemonError::Validation(errors));
        };

        let mut user = self
            .repo
            .find_user_by_reset_code_hash(&hash_code(input.code.trim()))
            .await?
            .ok_or(LemonError::InvalidResetCode)?;

        if !user.password_reset_pending() {
            user.clear_password_reset();
            self.repo.update_user(&user).await?;
            return Err(LemonError::InvalidResetCode);
        }

        let mut auth = self
            .repo
            .find_auth(&user.user_id)
            .await?
            .ok_or_else(|| LemonError::Internal("User has no credentials".to_string()))?;

        let hash = self
            .services
            .password_encoder()
            .encode(&password)
            .map_err(|e| LemonError::Internal(e.to_string()))?;
        auth.update_password(hash);
        self.repo.update_auth(&auth).await?;

        user.clear_password_reset();
        user.credentials_changed();
        self.repo.update_user(&user).await?;

        let revoked = self.repo.delete_sessions_for_user(&user.user_id, None).await?;

        tracing::info!(
            user_id = %user.user_id,
            sessions_revoked = revoked,
            "Password reset"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::sign_in::start_session;
    use crate::application::testing::{TestContext, fingerprint};
    use crate::domain::repository::{AuthRepository, UserRepository};
    use chrono::{Duration, Utc};
    use platform::password::ClearTextPassword;

    fn mailed_code(ctx: &TestContext, to: &str) -> String {
        let mail = ctx.mail.last_to(to).unwrap();
        let (_, code) = mail.body.split_once("code=").unwrap();
        code.split_whitespace().next().unwrap().to_string()
    }

    fn reset(code: &str, password: &str) -> ResetPasswordInput {
        ResetPasswordInput {
            code: code.to_string(),
            new_password: password.to_string(),
            retype_password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_unknown_email_is_silent() {
        let ctx = TestContext::new();
        ForgotPasswordUseCase::new(ctx.repo.clone(), ctx.services.clone())
            .execute("nobody@example.com")
            .await
            .unwrap();
        assert!(ctx.mail.sent().is_empty());
    }

    #[tokio::test]
    async fn test_forgot_then_reset() {
        let ctx = TestContext::new();
        let user = ctx.user("ada@example.com", &[]).await;
        start_session(ctx.repo.as_ref(), &ctx.services, &user, false, &fingerprint())
            .await
            .unwrap();

        ForgotPasswordUseCase::new(ctx.repo.clone(), ctx.services.clone())
            .execute("ada@example.com")
            .await
            .unwrap();
        let code = mailed_code(&ctx, "ada@example.com");

        let use_case = ResetPasswordUseCase::new(ctx.repo.clone(), ctx.services.clone());
        use_case.execute(reset(&code, "Brand-New-Pass-7")).await.unwrap();

        let auth = ctx.repo.find_auth(&user.user_id).await.unwrap().unwrap();
        let new_password = ClearTextPassword::new("Brand-New-Pass-7".to_string()).unwrap();
        assert!(ctx.services.password_encoder().matches(&new_password, &auth.password_hash));
        assert!(ctx.reload(&user).await.forgot_password_code_hash.is_none());
        assert_eq!(ctx.repo.session_count(&user.user_id).await, 0);

        // Single use
        let err = use_case
            .execute(reset(&code, "Another-Pass-8"))
            .await
            .unwrap_err();
        assert!(matches!(err, LemonError::InvalidResetCode));
    }

    #[tokio::test]
    async fn test_expired_code_rejected() {
        let ctx = TestContext::new();
        let mut user = ctx.user("ada@example.com", &[]).await;
        let code = OneTimeCode::generate();
        user.start_password_reset(code.hash().to_string(), Duration::hours(24));
        user.forgot_password_expires_at = Some(Utc::now() - Duration::minutes(1));
        ctx.repo.update_user(&user).await.unwrap();

        let err = ResetPasswordUseCase::new(ctx.repo.clone(), ctx.services.clone())
            .execute(reset(code.plain(), "Brand-New-Pass-7"))
            .await
            .unwrap_err();
        assert!(matches!(err, LemonError::InvalidResetCode));
    }

    #[tokio::test]
    async fn test_weak_password_reported_before_code_lookup() {
        let ctx = TestContext::new();
        let err = ResetPasswordUseCase::new(ctx.repo.clone(), ctx.services.clone())
            .execute(reset("", "short"))
            .await
            .unwrap_err();
        let LemonError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.has("code"));
        assert!(errors.has("newPassword"));
    }
}
