//! Sign Up Use Case
//!
//! Creates an unverified user, mails the verification link and signs the
//! new user in.

use std::net::IpAddr;
use std::sync::Arc;

use kernel::error::field::FieldErrors;

use crate::application::mail::verification_mail;
use crate::application::services::LemonServices;
use crate::application::sign_in::{ClientFingerprint, start_session};
use crate::domain::entity::{auth::Auth, user::User};
use crate::domain::repository::LemonRepository;
use crate::domain::value_object::{
    display_name::DisplayName, email::Email, one_time_code::OneTimeCode,
    user_password::new_password_with_retype,
};
use crate::error::{LemonError, LemonResult};

/// Sign up input
pub struct SignUpInput {
    pub email: String,
    pub password: String,
    pub retype_password: String,
    pub name: String,
    pub captcha_response: String,
}

/// Sign up output
#[derive(Debug)]
pub struct SignUpOutput {
    pub user: User,
    pub session_token: String,
}

/// Sign up use case
pub struct SignUpUseCase<R: LemonRepository> {
    repo: Arc<R>,
    services: Arc<LemonServices>,
}

impl<R: LemonRepository> SignUpUseCase<R> {
    pub fn new(repo: Arc<R>, services: Arc<LemonServices>) -> Self {
        Self { repo, services }
    }

    pub async fn execute(
        &self,
        input: SignUpInput,
        fingerprint: ClientFingerprint,
    ) -> LemonResult<SignUpOutput> {
        let mut errors = FieldErrors::new();

        let email = Email::new(&input.email)
            .map_err(|e| errors.add("email", e.code(), e.to_string()))
            .ok();
        let name = DisplayName::new(&input.name)
            .map_err(|e| errors.add("name", e.code(), e.to_string()))
            .ok();
        let password = new_password_with_retype(
            &mut errors,
            "password",
            input.password,
            "retypePassword",
            &input.retype_password,
        );

        if !self
            .services
            .captcha_verifier()
            .verify(&input.captcha_response, fingerprint.ip)
            .await?
        {
            errors.add("captchaResponse", "InvalidCaptcha", "CAPTCHA verification failed");
        }

        if let Some(email) = &email {
            if self.repo.exists_by_email(email).await? {
                errors.add("email", "DuplicateEmail", "Email already in use");
            }
        }

        let (Some(email), Some(name), Some(password), true) =
            (email, name, password, errors.is_empty())
        else {
            return Err(LemonError::Validation(errors));
        };

        let password_hash = self
            .services
            .password_encoder()
            .encode(&password)
            .map_err(|e| LemonError::Internal(e.to_string()))?;

        let mut user = User::new(email, name);
        let code = OneTimeCode::generate();
        user.start_verification(code.hash().to_string());

        self.repo
            .create_user_with_auth(&user, &Auth::new(user.user_id, password_hash))
            .await?;

        tracing::info!(user_id = %user.user_id, "User signed up");

        // A lost mail can be resent; it must not undo the signup
        let mail = verification_mail(self.services.config(), &user, code.plain());
        if let Err(e) = self.services.mail_sender().send(mail).await {
            tracing::error!(user_id = %user.user_id, error = %e, "Failed to send verification mail");
        }

        let (_, session_token) =
            start_session(self.repo.as_ref(), &self.services, &user, false, &fingerprint).await?;

        Ok(SignUpOutput {
            user,
            session_token,
        })
    }
}
