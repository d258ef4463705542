//! Repository Traits
//!
//! Interfaces for data persistence. Implementations are in the infra layer.

use crate::domain::entity::{auth::Auth, auth_session::AuthSession, user::User};
use crate::domain::value_object::{SessionId, UserId, email::Email};
use crate::error::LemonResult;

/// User repository trait
#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    /// Insert a new user and their credentials in one transaction
    ///
    /// A duplicate email is reported as a field error and nothing is stored.
    async fn create_user_with_auth(&self, user: &User, auth: &Auth) -> LemonResult<()>;

    async fn find_user_by_id(&self, user_id: &UserId) -> LemonResult<Option<User>>;

    async fn find_user_by_email(&self, email: &Email) -> LemonResult<Option<User>>;

    /// Find the user holding a reset code with this hash; expiry is checked by the caller
    async fn find_user_by_reset_code_hash(&self, code_hash: &str) -> LemonResult<Option<User>>;

    async fn exists_by_email(&self, email: &Email) -> LemonResult<bool>;

    async fn update_user(&self, user: &User) -> LemonResult<()>;
}

/// Auth credentials repository trait
#[trait_variant::make(AuthRepository: Send)]
pub trait LocalAuthRepository {
    async fn find_auth(&self, user_id: &UserId) -> LemonResult<Option<Auth>>;

    async fn update_auth(&self, auth: &Auth) -> LemonResult<()>;

    /// Count a login attempt against an unlocked account in a single write
    ///
    /// Returns the updated credentials, or `None` when the account is locked
    /// or has no credentials. Reaching [`Auth::MAX_LOGIN_FAILURES`] locks it.
    async fn record_login_attempt(&self, user_id: &UserId) -> LemonResult<Option<Auth>>;
}

/// Auth session repository trait
#[trait_variant::make(AuthSessionRepository: Send)]
pub trait LocalAuthSessionRepository {
    async fn create_session(&self, session: &AuthSession) -> LemonResult<()>;

    /// Find an unexpired session by id; fingerprint checks are the caller's
    async fn find_session(&self, session_id: &SessionId) -> LemonResult<Option<AuthSession>>;

    /// Persist expiry and last activity
    async fn update_session(&self, session: &AuthSession) -> LemonResult<()>;

    async fn delete_session(&self, session_id: &SessionId) -> LemonResult<()>;

    /// Delete all sessions for a user, optionally keeping one
    async fn delete_sessions_for_user(
        &self,
        user_id: &UserId,
        except: Option<&SessionId>,
    ) -> LemonResult<u64>;

    async fn cleanup_expired_sessions(&self) -> LemonResult<u64>;
}

/// Everything Lemon persists, behind one cloneable handle
pub trait LemonRepository:
    UserRepository + AuthRepository + AuthSessionRepository + Clone + Send + Sync + 'static
{
}

impl<T> LemonRepository for T where
    T: UserRepository + AuthRepository + AuthSessionRepository + Clone + Send + Sync + 'static
{
}
