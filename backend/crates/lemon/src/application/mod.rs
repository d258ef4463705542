//! Application Layer
//!
//! Use cases and application services.

pub mod bootstrap;
pub mod change_password;
pub mod check_session;
pub mod config;
pub mod fetch_user;
pub mod mail;
pub mod password_reset;
pub mod remember_me;
pub mod services;
pub mod sign_in;
pub mod sign_out;
pub mod sign_up;
pub mod token;
pub mod update_user;
pub mod verification;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use bootstrap::{AdminSeed, BootstrapUseCase};
pub use change_password::{ChangePasswordInput, ChangePasswordUseCase};
pub use check_session::{CheckSessionUseCase, Principal};
pub use config::{LemonConfig, RememberMeKey};
pub use fetch_user::{FetchUserUseCase, UserView};
pub use password_reset::{ForgotPasswordUseCase, ResetPasswordInput, ResetPasswordUseCase};
pub use remember_me::{RememberMeLoginOutput, RememberMeLoginUseCase};
pub use services::{LemonServices, LemonServicesBuilder};
pub use sign_in::{ClientFingerprint, SignInInput, SignInOutput, SignInUseCase};
pub use sign_out::SignOutUseCase;
pub use sign_up::{SignUpInput, SignUpOutput, SignUpUseCase};
pub use token::{RememberMeTokens, SessionTokenSigner};
pub use update_user::{UpdateUserInput, UpdateUserUseCase};
pub use verification::{ResendVerificationUseCase, VerifyEmailUseCase};
