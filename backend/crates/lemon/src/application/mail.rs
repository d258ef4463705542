//! Mail Templates
//!
//! Links carry the plain one-time code; only its hash is stored.

use platform::mail::MailMessage;

use crate::application::config::LemonConfig;
use crate::domain::entity::user::User;

pub const VERIFICATION_SUBJECT: &str = "Please verify your email";
pub const FORGOT_PASSWORD_SUBJECT: &str = "Forgot password?";

fn base_url(config: &LemonConfig) -> &str {
    config.application_url.trim_end_matches('/')
}

pub fn verification_link(config: &LemonConfig, user: &User, code: &str) -> String {
    format!(
        "{}/users/{}/verification?code={}",
        base_url(config),
        user.user_id,
        code
    )
}

pub fn reset_password_link(config: &LemonConfig, code: &str) -> String {
    format!("{}/reset-password?code={}", base_url(config), code)
}

pub fn verification_mail(config: &LemonConfig, user: &User, code: &str) -> MailMessage {
    let body = format!(
        "Hi {},\n\nPlease verify your email by visiting the link below:\n\n{}\n",
        user.name.as_str(),
        verification_link(config, user, code)
    );
    MailMessage::new(user.email.as_str(), VERIFICATION_SUBJECT, body)
}

pub fn forgot_password_mail(config: &LemonConfig, user: &User, code: &str) -> MailMessage {
    let body = format!(
        "Hi {},\n\nSomebody asked to reset your password. If it was you, visit the link below \
         within {} hours:\n\n{}\n\nOtherwise you can ignore this mail.\n",
        user.name.as_str(),
        config.reset_code_ttl.as_secs() / 3600,
        reset_password_link(config, code)
    );
    MailMessage::new(user.email.as_str(), FORGOT_PASSWORD_SUBJECT, body)
}
