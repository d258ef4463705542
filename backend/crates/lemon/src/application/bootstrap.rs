//! Start-up Tasks
//!
//! Creates the first administrator when configured and sweeps expired
//! sessions.

use std::sync::Arc;

use crate::application::services::LemonServices;
use crate::domain::entity::{auth::Auth, user::User};
use crate::domain::repository::LemonRepository;
use crate::domain::value_object::{
    UserId,
    display_name::{DISPLAY_NAME_MAX_CHARS, DisplayName},
    email::Email,
    role::{Role, Roles},
    user_password::new_password,
};
use crate::error::{LemonError, LemonResult};

/// Credentials of the administrator created on first start
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSeed")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

pub struct BootstrapUseCase<R: LemonRepository> {
    repo: Arc<R>,
    services: Arc<LemonServices>,
}

impl<R: LemonRepository> BootstrapUseCase<R> {
    pub fn new(repo: Arc<R>, services: Arc<LemonServices>) -> Self {
        Self { repo, services }
    }

    /// Returns the id of a newly created admin, if one was created
    pub async fn execute(&self, admin: Option<AdminSeed>) -> LemonResult<Option<UserId>> {
        let created = match admin {
            Some(seed) => self.create_admin(seed).await?,
            None => None,
        };

        self.repo.cleanup_expired_sessions().await?;
        Ok(created)
    }

    async fn create_admin(&self, seed: AdminSeed) -> LemonResult<Option<UserId>> {
        let email = Email::new(&seed.email)
            .map_err(|e| LemonError::field("adminEmail", e.code(), e.to_string()))?;

        if self.repo.exists_by_email(&email).await? {
            tracing::debug!(email = %email, "Admin already present");
            return Ok(None);
        }

        let password = new_password("adminPassword", seed.password)
            .map_err(|e| LemonError::Validation(e.into()))?;
        let hash = self
            .services
            .password_encoder()
            .encode(&password)
            .map_err(|e| LemonError::Internal(e.to_string()))?;

        let name = admin_name(&email);
        let mut user = User::new(email, name);
        user.set_roles(Roles::from([Role::Admin]));

        self.repo
            .create_user_with_auth(&user, &Auth::new(user.user_id, hash))
            .await?;

        tracing::info!(user_id = %user.user_id, email = %user.email, "Created first admin");
        Ok(Some(user.user_id))
    }
}

/// The local part of the address, cut to fit a display name
fn admin_name(email: &Email) -> DisplayName {
    let local: String = email
        .as_str()
        .split('@')
        .next()
        .unwrap_or_default()
        .chars()
        .take(DISPLAY_NAME_MAX_CHARS)
        .collect();
    DisplayName::new(local).unwrap_or_else(|_| DisplayName::from_db("Admin"))
}
