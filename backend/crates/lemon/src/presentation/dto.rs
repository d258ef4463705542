//! API DTOs (Data Transfer Objects)

use serde::{Deserialize, Serialize};

use crate::application::fetch_user::UserView;
use crate::domain::entity::user::User;
use crate::domain::value_object::role::Role;

// ============================================================================
// User
// ============================================================================

/// A user as returned by every endpoint
///
/// `email` is present only for callers allowed to edit the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub email: Option<String>,
    pub name: String,
    pub roles: Vec<Role>,
    pub unverified: bool,
    pub blocked: bool,
    pub admin: bool,
    pub good_user: bool,
    pub good_admin: bool,
}

impl UserDto {
    pub fn new(user: &User, with_email: bool) -> Self {
        Self {
            id: user.user_id.to_string(),
            email: with_email.then(|| user.email.as_str().to_string()),
            name: user.name.as_str().to_string(),
            roles: user.roles.iter().copied().collect(),
            unverified: user.is_unverified(),
            blocked: user.is_blocked(),
            admin: user.has_role(Role::Admin),
            good_user: user.is_good_user(),
            good_admin: user.is_good_admin(),
        }
    }

    /// The caller's own record
    pub fn own(user: &User) -> Self {
        Self::new(user, true)
    }
}

impl From<UserView> for UserDto {
    fn from(view: UserView) -> Self {
        Self::new(&view.user, view.editable)
    }
}

// ============================================================================
// Context
// ============================================================================

/// Properties the front-end needs before anyone signs in
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedProperties {
    pub application_url: String,
    pub re_captcha_site_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextResponse {
    pub context: SharedProperties,
    pub user: Option<UserDto>,
}

// ============================================================================
// Sign Up / Sign In
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub retype_password: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub captcha_response: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

// ============================================================================
// User management
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct FetchByEmailQuery {
    pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub roles: Option<Vec<Role>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub retype_password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerificationRequest {
    #[serde(default)]
    pub code: String,
}

// ============================================================================
// Password reset
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub new_password: String,
    #[serde(default)]
    pub retype_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::{display_name::DisplayName, email::Email};

    #[test]
    fn test_user_dto_shape() {
        let user = User::new(
            Email::new("ada@example.com").unwrap(),
            DisplayName::new("Ada").unwrap(),
        );

        let json = serde_json::to_value(UserDto::new(&user, false)).unwrap();
        assert!(json.get("email").is_none());
        assert_eq!(json["roles"], serde_json::json!(["UNVERIFIED"]));
        assert_eq!(json["goodUser"], false);

        let json = serde_json::to_value(UserDto::own(&user)).unwrap();
        assert_eq!(json["email"], "ada@example.com");
    }

    #[test]
    fn test_context_key_names() {
        let json = serde_json::to_value(SharedProperties {
            application_url: "http://localhost".to_string(),
            re_captcha_site_key: None,
        })
        .unwrap();
        assert!(json.get("applicationUrl").is_some());
        assert!(json.get("reCaptchaSiteKey").is_some());
    }
}
