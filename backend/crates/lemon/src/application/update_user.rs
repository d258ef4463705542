//! Update User Use Case

use std::sync::Arc;

use crate::application::services::LemonServices;
use crate::domain::entity::user::User;
use crate::domain::permission::{Action, Resource, Subject};
use crate::domain::repository::LemonRepository;
use crate::domain::value_object::{UserId, display_name::DisplayName, role::Roles};
use crate::error::{LemonError, LemonResult};

/// Fields left `None` are not touched
#[derive(Debug, Default)]
pub struct UpdateUserInput {
    pub name: Option<String>,
    pub roles: Option<Roles>,
}

pub struct UpdateUserUseCase<R: LemonRepository> {
    repo: Arc<R>,
    services: Arc<LemonServices>,
}

impl<R: LemonRepository> UpdateUserUseCase<R> {
    pub fn new(repo: Arc<R>, services: Arc<LemonServices>) -> Self {
        Self { repo, services }
    }

    pub async fn execute(
        &self,
        subject: &Subject,
        user_id: &UserId,
        input: UpdateUserInput,
    ) -> LemonResult<User> {
        let mut user = self
            .repo
            .find_user_by_id(user_id)
            .await?
            .ok_or(LemonError::UserNotFound)?;

        let evaluator = self.services.permission_evaluator();
        let resource = Resource::User(user.user_id);
        let allowed = |action| evaluator.has_permission(Some(subject), &resource, action);

        if let Some(name) = input.name {
            if !allowed(Action::Edit) {
                return Err(LemonError::Forbidden);
            }
            let name = DisplayName::new(&name)
                .map_err(|e| LemonError::field("name", e.code(), e.to_string()))?;
            user.set_name(name);
        }

        let mut revoke_sessions = false;
        if let Some(roles) = input.roles {
            if subject.user_id == user.user_id || !allowed(Action::ChangeRoles) {
                return Err(LemonError::Forbidden);
            }
            if roles != user.roles {
                tracing::info!(
                    user_id = %user.user_id,
                    changed_by = %subject.user_id,
                    roles = ?roles,
                    "User roles changed"
                );
                revoke_sessions = true;
                user.set_roles(roles);
            }
        }

        self.repo.update_user(&user).await?;

        // Sessions carry no roles, but a newly blocked user should be out now
        if revoke_sessions && user.is_blocked() {
            self.repo.delete_sessions_for_user(&user.user_id, None).await?;
        }

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::sign_in::start_session;
    use crate::application::testing::{TestContext, fingerprint};
    use crate::domain::value_object::role::Role;

    #[tokio::test]
    async fn test_owner_renames_self() {
        let ctx = TestContext::new();
        let user = ctx.user("ada@example.com", &[]).await;

        let updated = UpdateUserUseCase::new(ctx.repo.clone(), ctx.services.clone())
            .execute(
                &Subject::from(&user),
                &user.user_id,
                UpdateUserInput {
                    name: Some("Ada Lovelace".to_string()),
                    roles: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name.as_str(), "Ada Lovelace");
        assert_eq!(ctx.reload(&user).await.name.as_str(), "Ada Lovelace");
    }

    #[tokio::test]
    async fn test_owner_cannot_change_own_roles() {
        let ctx = TestContext::new();
        let admin = ctx.user("root@example.com", &[Role::Admin]).await;

        let err = UpdateUserUseCase::new(ctx.repo.clone(), ctx.services.clone())
            .execute(
                &Subject::from(&admin),
                &admin.user_id,
                UpdateUserInput {
                    name: None,
                    roles: Some(Roles::new()),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LemonError::Forbidden));
    }

    #[tokio::test]
    async fn test_admin_blocks_user_and_revokes_sessions() {
        let ctx = TestContext::new();
        let admin = ctx.user("root@example.com", &[Role::Admin]).await;
        let user = ctx.user("ada@example.com", &[]).await;
        start_session(ctx.repo.as_ref(), &ctx.services, &user, false, &fingerprint())
            .await
            .unwrap();

        let updated = UpdateUserUseCase::new(ctx.repo.clone(), ctx.services.clone())
            .execute(
                &Subject::from(&admin),
                &user.user_id,
                UpdateUserInput {
                    name: None,
                    roles: Some(Roles::from([Role::Blocked])),
                },
            )
            .await
            .unwrap();
        assert!(updated.is_blocked());
        assert_eq!(ctx.repo.session_count(&user.user_id).await, 0);
    }

    #[tokio::test]
    async fn test_stranger_cannot_edit() {
        let ctx = TestContext::new();
        let user = ctx.user("ada@example.com", &[]).await;
        let stranger = ctx.user("eve@example.com", &[]).await;

        let err = UpdateUserUseCase::new(ctx.repo.clone(), ctx.services.clone())
            .execute(
                &Subject::from(&stranger),
                &user.user_id,
                UpdateUserInput {
                    name: Some("Mallory".to_string()),
                    roles: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, LemonError::Forbidden));
    }
}
