//! Fetch User Use Case

use std::sync::Arc;

use crate::application::services::LemonServices;
use crate::domain::entity::user::User;
use crate::domain::permission::{Action, Resource, Subject};
use crate::domain::repository::LemonRepository;
use crate::domain::value_object::{UserId, email::Email};
use crate::error::{LemonError, LemonResult};

/// A user as seen by a particular caller
#[derive(Debug)]
pub struct UserView {
    pub user: User,
    /// Whether the caller may see private fields such as the email
    pub editable: bool,
}

pub struct FetchUserUseCase<R: LemonRepository> {
    repo: Arc<R>,
    services: Arc<LemonServices>,
}

impl<R: LemonRepository> FetchUserUseCase<R> {
    pub fn new(repo: Arc<R>, services: Arc<LemonServices>) -> Self {
        Self { repo, services }
    }

    pub async fn by_id(&self, subject: Option<&Subject>, user_id: &UserId) -> LemonResult<UserView> {
        let user = self
            .repo
            .find_user_by_id(user_id)
            .await?
            .ok_or(LemonError::UserNotFound)?;
        self.view(subject, user)
    }

    pub async fn by_email(&self, subject: Option<&Subject>, email: &str) -> LemonResult<UserView> {
        let email =
            Email::new(email).map_err(|e| LemonError::field("email", e.code(), e.to_string()))?;
        let user = self
            .repo
            .find_user_by_email(&email)
            .await?
            .ok_or(LemonError::UserNotFound)?;
        self.view(subject, user)
    }

    fn view(&self, subject: Option<&Subject>, user: User) -> LemonResult<UserView> {
        let evaluator = self.services.permission_evaluator();
        let resource = Resource::User(user.user_id);

        if !evaluator.has_permission(subject, &resource, Action::View) {
            return Err(LemonError::Forbidden);
        }
        let editable = evaluator.has_permission(subject, &resource, Action::Edit);

        Ok(UserView { user, editable })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::TestContext;
    use crate::domain::value_object::role::Role;

    #[tokio::test]
    async fn test_email_visibility() {
        let ctx = TestContext::new();
        let user = ctx.user("ada@example.com", &[]).await;
        let admin = ctx.user("root@example.com", &[Role::Admin]).await;
        let use_case = FetchUserUseCase::new(ctx.repo.clone(), ctx.services.clone());

        assert!(!use_case.by_id(None, &user.user_id).await.unwrap().editable);
        assert!(
            use_case
                .by_id(Some(&Subject::from(&user)), &user.user_id)
                .await
                .unwrap()
                .editable
        );
        assert!(
            use_case
                .by_email(Some(&Subject::from(&admin)), "ADA@example.com")
                .await
                .unwrap()
                .editable
        );
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let ctx = TestContext::new();
        let use_case = FetchUserUseCase::new(ctx.repo.clone(), ctx.services.clone());

        let err = use_case.by_id(None, &UserId::new()).await.unwrap_err();
        assert!(matches!(err, LemonError::UserNotFound));

        let err = use_case.by_email(None, "not-an-email").await.unwrap_err();
        assert!(matches!(err, LemonError::Validation(_)));
    }
}
