//! Lemon Services
//!
//! Every pluggable concern sits behind a trait. [`LemonServicesBuilder`]
//! takes whatever the application supplies and installs a default for each
//! concern left unset, logging the choice.

use std::sync::Arc;

use kernel::error::normalizer::ErrorNormalizer;
use platform::captcha::{CaptchaVerifier, NoopCaptchaVerifier, RecaptchaVerifier};
use platform::mail::{MailSender, MockMailSender, SmtpConfig, SmtpMailSender};
use platform::password::{Argon2PasswordEncoder, PasswordEncoder};

use crate::application::config::LemonConfig;
use crate::application::token::{RememberMeTokens, SessionTokenSigner};
use crate::domain::permission::{LemonPermissionEvaluator, PermissionEvaluator};
use crate::error::{LemonResult, fallback_handlers};

/// Shared, immutable service bundle handed to every use case
pub struct LemonServices {
    config: LemonConfig,
    password_encoder: Arc<dyn PasswordEncoder>,
    mail_sender: Arc<dyn MailSender>,
    captcha_verifier: Arc<dyn CaptchaVerifier>,
    permission_evaluator: Arc<dyn PermissionEvaluator>,
    error_normalizer: Arc<ErrorNormalizer>,
    session_tokens: SessionTokenSigner,
    remember_me_tokens: RememberMeTokens,
}

impl LemonServices {
    pub fn builder(config: LemonConfig) -> LemonServicesBuilder {
        LemonServicesBuilder::new(config)
    }

    pub fn config(&self) -> &LemonConfig {
        &self.config
    }

    pub fn password_encoder(&self) -> &dyn PasswordEncoder {
        self.password_encoder.as_ref()
    }

    pub fn mail_sender(&self) -> &dyn MailSender {
        self.mail_sender.as_ref()
    }

    pub fn captcha_verifier(&self) -> &dyn CaptchaVerifier {
        self.captcha_verifier.as_ref()
    }

    pub fn permission_evaluator(&self) -> &dyn PermissionEvaluator {
        self.permission_evaluator.as_ref()
    }

    pub fn error_normalizer(&self) -> Arc<ErrorNormalizer> {
        self.error_normalizer.clone()
    }

    pub fn session_tokens(&self) -> &SessionTokenSigner {
        &self.session_tokens
    }

    pub fn remember_me_tokens(&self) -> &RememberMeTokens {
        &self.remember_me_tokens
    }
}

impl std::fmt::Debug for LemonServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LemonServices")
            .field("application_url", &self.config.application_url)
            .field("error_normalizer", &self.error_normalizer)
            .finish_non_exhaustive()
    }
}

pub struct LemonServicesBuilder {
    config: LemonConfig,
    password_encoder: Option<Arc<dyn PasswordEncoder>>,
    mail_sender: Option<Arc<dyn MailSender>>,
    captcha_verifier: Option<Arc<dyn CaptchaVerifier>>,
    permission_evaluator: Option<Arc<dyn PermissionEvaluator>>,
    error_normalizer: Option<ErrorNormalizer>,
    smtp: Option<SmtpConfig>,
    recaptcha_secret_key: Option<String>,
}

impl LemonServicesBuilder {
    pub fn new(config: LemonConfig) -> Self {
        Self {
            config,
            password_encoder: None,
            mail_sender: None,
            captcha_verifier: None,
            permission_evaluator: None,
            error_normalizer: None,
            smtp: None,
            recaptcha_secret_key: None,
        }
    }

    pub fn password_encoder(mut self, encoder: Arc<dyn PasswordEncoder>) -> Self {
        self.password_encoder = Some(encoder);
        self
    }

    pub fn mail_sender(mut self, sender: Arc<dyn MailSender>) -> Self {
        self.mail_sender = Some(sender);
        self
    }

    pub fn captcha_verifier(mut self, verifier: Arc<dyn CaptchaVerifier>) -> Self {
        self.captcha_verifier = Some(verifier);
        self
    }

    pub fn permission_evaluator(mut self, evaluator: Arc<dyn PermissionEvaluator>) -> Self {
        self.permission_evaluator = Some(evaluator);
        self
    }

    /// Application normalizer; Lemon's own handlers are appended behind its handlers
    pub fn error_normalizer(mut self, normalizer: ErrorNormalizer) -> Self {
        self.error_normalizer = Some(normalizer);
        self
    }

    /// SMTP settings used when no mail sender is supplied
    pub fn smtp(mut self, smtp: Option<SmtpConfig>) -> Self {
        self.smtp = smtp;
        self
    }

    /// reCAPTCHA secret used when no verifier is supplied
    pub fn recaptcha_secret_key(mut self, secret: Option<String>) -> Self {
        self.recaptcha_secret_key = secret.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn build(self) -> LemonResult<LemonServices> {
        let config = self.config;

        let password_encoder = match self.password_encoder {
            Some(encoder) => encoder,
            None => {
                tracing::info!("Configuring Argon2PasswordEncoder");
                Arc::new(Argon2PasswordEncoder::new(config.password_pepper.clone()))
            }
        };

        let mail_sender: Arc<dyn MailSender> = match (self.mail_sender, self.smtp) {
            (Some(sender), _) => sender,
            (None, Some(smtp)) => {
                tracing::info!(host = %smtp.host, port = smtp.port, "Configuring SmtpMailSender");
                Arc::new(SmtpMailSender::new(&smtp)?)
            }
            (None, None) => {
                tracing::info!("Configuring MockMailSender");
                Arc::new(MockMailSender::new())
            }
        };

        let captcha_verifier: Arc<dyn CaptchaVerifier> =
            match (self.captcha_verifier, self.recaptcha_secret_key) {
                (Some(verifier), _) => verifier,
                (None, Some(secret)) => {
                    tracing::info!("Configuring RecaptchaVerifier");
                    Arc::new(RecaptchaVerifier::new(secret)?)
                }
                (None, None) => {
                    tracing::info!("Configuring NoopCaptchaVerifier");
                    Arc::new(NoopCaptchaVerifier)
                }
            };

        let permission_evaluator = match self.permission_evaluator {
            Some(evaluator) => evaluator,
            None => {
                tracing::info!("Configuring LemonPermissionEvaluator");
                Arc::new(LemonPermissionEvaluator)
            }
        };

        let error_normalizer = match self.error_normalizer {
            Some(normalizer) => normalizer,
            None => {
                tracing::info!("Configuring ErrorNormalizer");
                ErrorNormalizer::new()
            }
        };
        let error_normalizer = fallback_handlers()
            .into_iter()
            .fold(error_normalizer, ErrorNormalizer::with_fallback_handler);

        if config.remember_me_keys.is_empty() {
            tracing::warn!("No remember-me keys configured; remember-me is disabled");
        }

        let session_tokens = SessionTokenSigner::new(config.session_secret);
        let remember_me_tokens = RememberMeTokens::new(
            config.remember_me_keys.clone(),
            config.session_ttl(true),
        );

        Ok(LemonServices {
            config,
            password_encoder,
            mail_sender,
            captcha_verifier,
            permission_evaluator,
            error_normalizer: Arc::new(error_normalizer),
            session_tokens,
            remember_me_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::permission::{Action, Resource, Subject};
    use crate::domain::value_object::UserId;

    struct DenyAll;

    impl PermissionEvaluator for DenyAll {
        fn has_permission(&self, _: Option<&Subject>, _: &Resource, _: Action) -> bool {
            false
        }
    }

    #[test]
    fn test_defaults_installed() {
        let services = LemonServices::builder(LemonConfig::development())
            .build()
            .unwrap();
        assert!(services.remember_me_tokens().is_enabled());
        // Kernel defaults plus Lemon's fallbacks
        assert_eq!(services.error_normalizer().handler_count(), 5);
        assert!(services.permission_evaluator().has_permission(
            None,
            &Resource::User(UserId::new()),
            Action::View
        ));
    }

    #[test]
    fn test_supplied_evaluator_wins() {
        let services = LemonServices::builder(LemonConfig::development())
            .permission_evaluator(Arc::new(DenyAll))
            .build()
            .unwrap();
        assert!(!services.permission_evaluator().has_permission(
            None,
            &Resource::User(UserId::new()),
            Action::View
        ));
    }

    #[test]
    fn test_blank_recaptcha_secret_means_noop() {
        let builder = LemonServices::builder(LemonConfig::development())
            .recaptcha_secret_key(Some("  ".to_string()));
        assert!(builder.recaptcha_secret_key.is_none());
    }
}
