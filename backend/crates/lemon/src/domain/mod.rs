//! Domain Layer
//!
//! Contains entities, value objects, permission rules and repository traits.

pub mod entity;
pub mod permission;
pub mod repository;
pub mod value_object;

// Re-exports
pub use entity::{auth::Auth, auth_session::AuthSession, user::User};
pub use permission::{Action, LemonPermissionEvaluator, PermissionEvaluator, Resource, Subject};
pub use repository::{AuthRepository, AuthSessionRepository, LemonRepository, UserRepository};
