//! CAPTCHA verification
//!
//! [`RecaptchaVerifier`] checks a Google reCAPTCHA response against the
//! `siteverify` endpoint. [`NoopCaptchaVerifier`] accepts everything and is
//! used when no secret key is configured.

use std::{net::IpAddr, time::Duration};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

pub const RECAPTCHA_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

#[derive(Debug, Error)]
pub enum CaptchaError {
    #[error("CAPTCHA service unreachable: {0}")]
    Request(#[from] reqwest::Error),
}

#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    /// Whether `response` is a valid solution. `Err` means the check itself
    /// could not be made.
    async fn verify(&self, response: &str, remote_ip: Option<IpAddr>) -> Result<bool, CaptchaError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCaptchaVerifier;

#[async_trait]
impl CaptchaVerifier for NoopCaptchaVerifier {
    async fn verify(&self, _response: &str, _remote_ip: Option<IpAddr>) -> Result<bool, CaptchaError> {
        Ok(true)
    }
}

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(rename = "error-codes", default)]
    error_codes: Vec<String>,
}

pub struct RecaptchaVerifier {
    client: reqwest::Client,
    secret_key: String,
    verify_url: String,
}

impl RecaptchaVerifier {
    pub fn new(secret_key: impl Into<String>) -> Result<Self, CaptchaError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            secret_key: secret_key.into(),
            verify_url: RECAPTCHA_VERIFY_URL.to_string(),
        })
    }

    /// Point at a different endpoint (self-hosted proxy, test server)
    pub fn with_verify_url(mut self, url: impl Into<String>) -> Self {
        self.verify_url = url.into();
        self
    }
}

#[async_trait]
impl CaptchaVerifier for RecaptchaVerifier {
    async fn verify(&self, response: &str, remote_ip: Option<IpAddr>) -> Result<bool, CaptchaError> {
        if response.trim().is_empty() {
            return Ok(false);
        }

        let mut form = vec![
            ("secret", self.secret_key.clone()),
            ("response", response.to_string()),
        ];
        if let Some(ip) = remote_ip {
            form.push(("remoteip", ip.to_string()));
        }

        let result: SiteVerifyResponse = self
            .client
            .post(&self.verify_url)
            .form(&form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !result.success {
            tracing::debug!(error_codes = ?result.error_codes, "CAPTCHA rejected");
        }
        Ok(result.success)
    }
}

impl std::fmt::Debug for RecaptchaVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecaptchaVerifier")
            .field("verify_url", &self.verify_url)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}
