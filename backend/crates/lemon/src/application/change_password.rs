//! Change Password Use Case

use std::sync::Arc;

use kernel::error::field::FieldErrors;

use crate::application::services::LemonServices;
use crate::domain::permission::{Action, Resource, Subject};
use crate::domain::repository::LemonRepository;
use crate::domain::value_object::{
    SessionId, UserId,
    user_password::{candidate_password, new_password_with_retype},
};
use crate::error::{LemonError, LemonResult};

pub struct ChangePasswordInput {
    pub old_password: String,
    pub new_password: String,
    pub retype_password: String,
}

pub struct ChangePasswordUseCase<R: LemonRepository> {
    repo: Arc<R>,
    services: Arc<LemonServices>,
}

impl<R: LemonRepository> ChangePasswordUseCase<R> {
    pub fn new(repo: Arc<R>, services: Arc<LemonServices>) -> Self {
        Self { repo, services }
    }

    /// Change `user_id`'s password
    ///
    /// `oldPassword` is checked against the target user's current password.
    /// Every other session of that user is revoked; `current_session` survives
    /// when it belongs to the same user.
    pub async fn execute(
        &self,
        subject: &Subject,
        current_session: Option<&SessionId>,
        user_id: &UserId,
        input: ChangePasswordInput,
    ) -> LemonResult<()> {
        let mut user = self
            .repo
            .find_user_by_id(user_id)
            .await?
            .ok_or(LemonError::UserNotFound)?;

        if !self.services.permission_evaluator().has_permission(
            Some(subject),
            &Resource::User(user.user_id),
            Action::ChangePassword,
        ) {
            return Err(LemonError::Forbidden);
        }

        let mut auth = self
            .repo
            .find_auth(&user.user_id)
            .await?
            .ok_or_else(|| LemonError::Internal("User has no credentials".to_string()))?;

        let encoder = self.services.password_encoder();
        let mut errors = FieldErrors::new();

        let old_ok = candidate_password(input.old_password)
            .is_some_and(|old| encoder.matches(&old, &auth.password_hash));
        if !old_ok {
            errors.add("oldPassword", "WrongPassword", "Current password is incorrect");
        }

        let new_password = new_password_with_retype(
            &mut errors,
            "password",
            input.new_password,
            "retypePassword",
            &input.retype_password,
        );
        let (Some(new_password), true) = (new_password, errors.is_empty()) else {
            return Err(LemonError::Validation(errors));
        };

        let hash = encoder
            .encode(&new_password)
            .map_err(|e| LemonError::Internal(e.to_string()))?;
        auth.update_password(hash);
        self.repo.update_auth(&auth).await?;

        user.credentials_changed();
        self.repo.update_user(&user).await?;

        let keep = current_session.filter(|_| subject.user_id == user.user_id);
        let revoked = self
            .repo
            .delete_sessions_for_user(&user.user_id, keep)
            .await?;

        tracing::info!(
            user_id = %user.user_id,
            changed_by = %subject.user_id,
            sessions_revoked = revoked,
            "Password changed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::sign_in::start_session;
    use crate::application::testing::{TestContext, fingerprint};
    use crate::domain::repository::AuthSessionRepository;
    use crate::domain::value_object::role::Role;

    fn input(old: &str, new: &str, retype: &str) -> ChangePasswordInput {
        ChangePasswordInput {
            old_password: old.to_string(),
            new_password: new.to_string(),
            retype_password: retype.to_string(),
        }
    }

    #[tokio::test]
    async fn test_change_keeps_current_session_only() {
        let ctx = TestContext::new();
        let user = ctx.user("ada@example.com", &[]).await;
        let (current, _) = start_session(ctx.repo.as_ref(), &ctx.services, &user, false, &fingerprint())
            .await
            .unwrap();
        let (other, _) = start_session(ctx.repo.as_ref(), &ctx.services, &user, true, &fingerprint())
            .await
            .unwrap();

        ChangePasswordUseCase::new(ctx.repo.clone(), ctx.services.clone())
            .execute(
                &Subject::from(&user),
                Some(&current.session_id),
                &user.user_id,
                input(TestContext::PASSWORD, "Brand-New-Pass-7", "Brand-New-Pass-7"),
            )
            .await
            .unwrap();

        assert!(ctx.repo.find_session(&current.session_id).await.unwrap().is_some());
        assert!(ctx.repo.find_session(&other.session_id).await.unwrap().is_none());
        assert!(ctx.reload(&user).await.credentials_updated_at > user.credentials_updated_at);
    }

    #[tokio::test]
    async fn test_wrong_old_password_and_mismatch_reported() {
        let ctx = TestContext::new();
        let user = ctx.user("ada@example.com", &[]).await;

        let err = ChangePasswordUseCase::new(ctx.repo.clone(), ctx.services.clone())
            .execute(
                &Subject::from(&user),
                None,
                &user.user_id,
                input("Not-The-Password-1", "Brand-New-Pass-7", "Brand-New-Pass-8"),
            )
            .await
            .unwrap_err();
        let LemonError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.has("oldPassword"));
        assert!(errors.has("retypePassword"));
    }

    #[tokio::test]
    async fn test_only_owner_or_admin() {
        let ctx = TestContext::new();
        let user = ctx.user("ada@example.com", &[]).await;
        let stranger = ctx.user("eve@example.com", &[]).await;
        let admin = ctx.user("root@example.com", &[Role::Admin]).await;
        let use_case = ChangePasswordUseCase::new(ctx.repo.clone(), ctx.services.clone());

        let err = use_case
            .execute(
                &Subject::from(&stranger),
                None,
                &user.user_id,
                input(TestContext::PASSWORD, "Brand-New-Pass-7", "Brand-New-Pass-7"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LemonError::Forbidden));

        use_case
            .execute(
                &Subject::from(&admin),
                None,
                &user.user_id,
                input(TestContext::PASSWORD, "Brand-New-Pass-7", "Brand-New-Pass-7"),
            )
            .await
            .unwrap();
    }
}
