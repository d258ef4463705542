//! Lemon - Authentication and user management backend
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, permissions, repository traits
//! - `application/` - Use cases and application services
//! - `infra/` - PostgreSQL and in-memory repositories
//! - `presentation/` - HTTP handlers, DTOs, router
//!
//! ## Features
//! - Sign up with email verification, sign in, sign out
//! - Remember-me login with rotating signing keys
//! - Forgot/reset password by mailed one-time code
//! - Role based permissions (UNVERIFIED, BLOCKED, ADMIN)
//! - One stable error payload for every failure
//!
//! ## Security Model
//! - Passwords hashed with Argon2id, optionally peppered
//! - Sessions bound to the client fingerprint (User-Agent)
//! - Remember-me tokens die with a password change
//! - Login failures are indistinguishable to the caller

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::{LemonConfig, RememberMeKey};
pub use application::services::{LemonServices, LemonServicesBuilder};
pub use application::{AdminSeed, BootstrapUseCase};
pub use error::{LemonError, LemonResult};
pub use infra::{InMemoryLemonRepository, PgLemonRepository};
pub use presentation::router::{lemon_router, lemon_router_generic};

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}
