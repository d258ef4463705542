//! Test fixtures shared by the use-case and router tests

use std::sync::Arc;

use platform::captcha::CaptchaVerifier;
use platform::client::ClientFingerprint;
use platform::crypto::{constant_time_eq, sha256, to_base64};
use platform::mail::MockMailSender;
use platform::password::{ClearTextPassword, HashedPassword, PasswordEncoder, PasswordHashError};

use crate::application::config::LemonConfig;
use crate::application::services::LemonServices;
use crate::domain::entity::{auth::Auth, user::User};
use crate::domain::repository::UserRepository;
use crate::domain::value_object::{
    display_name::DisplayName,
    email::Email,
    role::{Role, Roles},
};
use crate::infra::memory::InMemoryLemonRepository;

pub const USER_AGENT: &str = "lemon-test-agent";

pub fn fingerprint() -> ClientFingerprint {
    ClientFingerprint::for_user_agent(USER_AGENT, None)
}

/// Unsalted SHA-256 encoder; Argon2 is too slow for unit tests
pub struct FastTestEncoder;

impl PasswordEncoder for FastTestEncoder {
    fn encode(&self, password: &ClearTextPassword) -> Result<HashedPassword, PasswordHashError> {
        Ok(HashedPassword::new(format!(
            "test${}",
            to_base64(&sha256(password.as_bytes()))
        )))
    }

    fn matches(&self, password: &ClearTextPassword, hashed: &HashedPassword) -> bool {
        match self.encode(password) {
            Ok(encoded) => constant_time_eq(encoded.as_str().as_bytes(), hashed.as_str().as_bytes()),
            Err(_) => false,
        }
    }
}

pub struct TestContext {
    pub repo: Arc<InMemoryLemonRepository>,
    pub services: Arc<LemonServices>,
    pub mail: Arc<MockMailSender>,
}

impl TestContext {
    pub const PASSWORD: &'static str = "Correct-Horse-42";

    pub fn new() -> Self {
        Self::build(LemonServices::builder(LemonConfig::development()))
    }

    pub fn with_captcha(verifier: Arc<dyn CaptchaVerifier>) -> Self {
        Self::build(LemonServices::builder(LemonConfig::development()).captcha_verifier(verifier))
    }

    fn build(builder: crate::application::services::LemonServicesBuilder) -> Self {
        let mail = Arc::new(MockMailSender::new());
        let services = builder
            .password_encoder(Arc::new(FastTestEncoder))
            .mail_sender(mail.clone())
            .build()
            .unwrap();
        Self {
            repo: Arc::new(InMemoryLemonRepository::new()),
            services: Arc::new(services),
            mail,
        }
    }

    /// Store a user with [`Self::PASSWORD`] and exactly `roles`
    pub async fn user(&self, email: &str, roles: &[Role]) -> User {
        let mut user = User::new(
            Email::new(email).unwrap(),
            DisplayName::new(email.split('@').next().unwrap_or("user")).unwrap(),
        );
        user.set_roles(roles.iter().copied().collect::<Roles>());

        let password = ClearTextPassword::new(Self::PASSWORD.to_string()).unwrap();
        let hash = self.services.password_encoder().encode(&password).unwrap();
        self.repo
            .create_user_with_auth(&user, &Auth::new(user.user_id, hash))
            .await
            .unwrap();
        user
    }

    pub async fn reload(&self, user: &User) -> User {
        self.repo
            .find_user_by_id(&user.user_id)
            .await
            .unwrap()
            .unwrap()
    }
}
