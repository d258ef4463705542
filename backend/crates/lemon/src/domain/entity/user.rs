//! User Entity
//!
//! Profile, roles and the pending one-time codes of a user. Credentials
//! live in the separate [`Auth`](super::auth::Auth) entity.

use chrono::{DateTime, Duration, Utc};

use crate::domain::value_object::{
    UserId,
    display_name::DisplayName,
    email::Email,
    role::{Role, Roles},
};

#[derive(Debug, Clone)]
pub struct User {
    pub user_id: UserId,
    /// Unique, lower-cased
    pub email: Email,
    pub name: DisplayName,
    pub roles: Roles,
    /// SHA-256 of the pending email verification code
    pub verification_code_hash: Option<String>,
    /// SHA-256 of the pending password reset code
    pub forgot_password_code_hash: Option<String>,
    pub forgot_password_expires_at: Option<DateTime<Utc>>,
    /// Bumped on every password change
    pub credentials_updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// A freshly signed-up user; always starts unverified
    pub fn new(email: Email, name: DisplayName) -> Self {
        let now = Utc::now();
        Self {
            user_id: UserId::new(),
            email,
            name,
            roles: Roles::from([Role::Unverified]),
            verification_code_hash: None,
            forgot_password_code_hash: None,
            forgot_password_expires_at: None,
            credentials_updated_at: now,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_unverified(&self) -> bool {
        self.has_role(Role::Unverified)
    }

    pub fn is_blocked(&self) -> bool {
        self.has_role(Role::Blocked)
    }

    /// Verified and not blocked
    pub fn is_good_user(&self) -> bool {
        !self.is_unverified() && !self.is_blocked()
    }

    pub fn is_good_admin(&self) -> bool {
        self.is_good_user() && self.has_role(Role::Admin)
    }

    pub fn record_login(&mut self) {
        let now = Utc::now();
        self.last_login_at = Some(now);
        self.updated_at = now;
    }

    pub fn set_name(&mut self, name: DisplayName) {
        self.name = name;
        self.updated_at = Utc::now();
    }

    pub fn set_roles(&mut self, roles: Roles) {
        self.roles = roles;
        self.updated_at = Utc::now();
    }

    /// Store the hash of a newly mailed verification code
    pub fn start_verification(&mut self, code_hash: String) {
        self.verification_code_hash = Some(code_hash);
        self.updated_at = Utc::now();
    }

    /// Code accepted: drop `Unverified` and forget the code
    pub fn mark_verified(&mut self) {
        self.roles.remove(&Role::Unverified);
        self.verification_code_hash = None;
        self.updated_at = Utc::now();
    }

    pub fn start_password_reset(&mut self, code_hash: String, ttl: Duration) {
        let now = Utc::now();
        self.forgot_password_code_hash = Some(code_hash);
        self.forgot_password_expires_at = Some(now + ttl);
        self.updated_at = now;
    }

    /// Whether a reset code is pending and not yet expired
    pub fn password_reset_pending(&self) -> bool {
        match (&self.forgot_password_code_hash, self.forgot_password_expires_at) {
            (Some(_), Some(expires_at)) => Utc::now() < expires_at,
            _ => false,
        }
    }

    pub fn clear_password_reset(&mut self) {
        self.forgot_password_code_hash = None;
        self.forgot_password_expires_at = None;
        self.updated_at = Utc::now();
    }

    pub fn credentials_changed(&mut self) {
        let now = Utc::now();
        self.credentials_updated_at = now;
        self.updated_at = now;
    }
}
