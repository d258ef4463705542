//! In-memory repository
//!
//! Used when no database is configured, and by the tests. Everything lives
//! behind one `RwLock`, so each call sees a consistent snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::entity::{auth::Auth, auth_session::AuthSession, user::User};
use crate::domain::repository::{AuthRepository, AuthSessionRepository, UserRepository};
use crate::domain::value_object::{SessionId, UserId, email::Email};
use crate::error::{LemonError, LemonResult};

#[derive(Default)]
struct Store {
    users: HashMap<UserId, User>,
    auths: HashMap<UserId, Auth>,
    sessions: HashMap<SessionId, AuthSession>,
}

#[derive(Clone, Default)]
pub struct InMemoryLemonRepository {
    store: Arc<RwLock<Store>>,
}

impl InMemoryLemonRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions of `user_id` (test helper)
    pub async fn session_count(&self, user_id: &UserId) -> usize {
        self.store
            .read()
            .await
            .sessions
            .values()
            .filter(|s| &s.user_id == user_id)
            .count()
    }
}

impl std::fmt::Debug for InMemoryLemonRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryLemonRepository").finish_non_exhaustive()
    }
}

fn duplicate_email() -> LemonError {
    LemonError::field("email", "DuplicateEmail", "Email already in use")
}

impl UserRepository for InMemoryLemonRepository {
    async fn create_user_with_auth(&self, user: &User, auth: &Auth) -> LemonResult<()> {
        let mut store = self.store.write().await;
        if store.users.values().any(|u| u.email == user.email) {
            return Err(duplicate_email());
        }
        store.users.insert(user.user_id, user.clone());
        store.auths.insert(auth.user_id, auth.clone());
        Ok(())
    }

    async fn find_user_by_id(&self, user_id: &UserId) -> LemonResult<Option<User>> {
        Ok(self.store.read().await.users.get(user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &Email) -> LemonResult<Option<User>> {
        Ok(self
            .store
            .read()
            .await
            .users
            .values()
            .find(|u| &u.email == email)
            .cloned())
    }

    async fn find_user_by_reset_code_hash(&self, code_hash: &str) -> LemonResult<Option<User>> {
        Ok(self
            .store
            .read()
            .await
            .users
            .values()
            .find(|u| u.forgot_password_code_hash.as_deref() == Some(code_hash))
            .cloned())
    }

    async fn exists_by_email(&self, email: &Email) -> LemonResult<bool> {
        Ok(self
            .store
            .read()
            .await
            .users
            .values()
            .any(|u| &u.email == email))
    }

    async fn update_user(&self, user: &User) -> LemonResult<()> {
        let mut store = self.store.write().await;
        if store
            .users
            .values()
            .any(|u| u.email == user.email && u.user_id != user.user_id)
        {
            return Err(duplicate_email());
        }
        match store.users.get_mut(&user.user_id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(LemonError::UserNotFound),
        }
    }
}

impl AuthRepository for InMemoryLemonRepository {
    async fn find_auth(&self, user_id: &UserId) -> LemonResult<Option<Auth>> {
        Ok(self.store.read().await.auths.get(user_id).cloned())
    }

    async fn update_auth(&self, auth: &Auth) -> LemonResult<()> {
        self.store
            .write()
            .await
            .auths
            .insert(auth.user_id, auth.clone());
        Ok(())
    }

    async fn record_login_attempt(&self, user_id: &UserId) -> LemonResult<Option<Auth>> {
        let mut store = self.store.write().await;
        Ok(store
            .auths
            .get_mut(user_id)
            .filter(|auth| !auth.is_locked())
            .map(|auth| {
                auth.record_failure();
                auth.clone()
            }))
    }
}

impl AuthSessionRepository for InMemoryLemonRepository {
    async fn create_session(&self, session: &AuthSession) -> LemonResult<()> {
        self.store
            .write()
            .await
            .sessions
            .insert(session.session_id, session.clone());
        Ok(())
    }

    async fn find_session(&self, session_id: &SessionId) -> LemonResult<Option<AuthSession>> {
        Ok(self
            .store
            .read()
            .await
            .sessions
            .get(session_id)
            .filter(|s| !s.is_expired())
            .cloned())
    }

    async fn update_session(&self, session: &AuthSession) -> LemonResult<()> {
        if let Some(existing) = self.store.write().await.sessions.get_mut(&session.session_id) {
            existing.expires_at_ms = session.expires_at_ms;
            existing.last_activity_at = session.last_activity_at;
        }
        Ok(())
    }

    async fn delete_session(&self, session_id: &SessionId) -> LemonResult<()> {
        self.store.write().await.sessions.remove(session_id);
        Ok(())
    }

    async fn delete_sessions_for_user(
        &self,
        user_id: &UserId,
        except: Option<&SessionId>,
    ) -> LemonResult<u64> {
        let mut store = self.store.write().await;
        let before = store.sessions.len();
        store
            .sessions
            .retain(|id, s| &s.user_id != user_id || Some(id) == except);
        Ok((before - store.sessions.len()) as u64)
    }

    async fn cleanup_expired_sessions(&self) -> LemonResult<u64> {
        let now_ms = Utc::now().timestamp_millis();
        let mut store = self.store.write().await;
        let before = store.sessions.len();
        store.sessions.retain(|_, s| s.expires_at_ms >= now_ms);
        let deleted = (before - store.sessions.len()) as u64;

        tracing::info!(sessions_deleted = deleted, "Cleaned up expired auth sessions");
        Ok(deleted)
    }
}
