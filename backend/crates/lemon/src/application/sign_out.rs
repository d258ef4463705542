//! Sign Out Use Case

use std::sync::Arc;

use crate::application::services::LemonServices;
use crate::domain::repository::LemonRepository;
use crate::error::LemonResult;

pub struct SignOutUseCase<R: LemonRepository> {
    repo: Arc<R>,
    services: Arc<LemonServices>,
}

impl<R: LemonRepository> SignOutUseCase<R> {
    pub fn new(repo: Arc<R>, services: Arc<LemonServices>) -> Self {
        Self { repo, services }
    }

    /// Delete the session behind `session_token`, if it is one of ours
    ///
    /// Signing out without a valid session is not an error.
    pub async fn execute(&self, session_token: Option<&str>) -> LemonResult<()> {
        let Some(session_id) = session_token.and_then(|t| self.services.session_tokens().verify(t))
        else {
            return Ok(());
        };

        self.repo.delete_session(&session_id).await?;
        tracing::info!(session_id = %session_id, "User signed out");
        Ok(())
    }
}
