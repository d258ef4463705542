//! Server Configuration
//!
//! Everything is read through a key lookup so tests don't need to touch the
//! process environment.

use std::net::SocketAddr;

use anyhow::{Context, bail};
use base64::Engine;
use base64::engine::general_purpose;
use lemon::{AdminSeed, LemonConfig, RememberMeKey};
use lemon::application::config::SameSite;
use platform::cors::CorsConfig;
use platform::crypto::random_secret;
use platform::mail::SmtpConfig;

const DEFAULT_PORT: u16 = 9000;

#[derive(Debug)]
pub struct AppConfig {
    pub addr: SocketAddr,
    /// In-memory storage when unset
    pub database_url: Option<String>,
    pub lemon: LemonConfig,
    pub recaptcha_secret_key: Option<String>,
    /// Mails are only logged when unset
    pub smtp: Option<SmtpConfig>,
    pub cors: CorsConfig,
    pub json_prefix: bool,
    pub admin: Option<AdminSeed>,
}

impl AppConfig {
    /// Load from the process environment
    ///
    /// Release builds refuse to start without a session secret.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), !cfg!(debug_assertions))
    }

    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        production: bool,
    ) -> anyhow::Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = match get("LEMON_PORT") {
            Some(port) => port.parse().context("LEMON_PORT must be a port number")?,
            None => DEFAULT_PORT,
        };

        let session_secret = match get("LEMON_SESSION_SECRET") {
            Some(secret) => decode_secret(&secret).context("Invalid LEMON_SESSION_SECRET")?,
            None if production => bail!("LEMON_SESSION_SECRET must be set in production"),
            None => {
                tracing::warn!("LEMON_SESSION_SECRET not set, using a random secret");
                random_secret()
            }
        };

        let remember_me_keys = match get("LEMON_REMEMBER_ME_KEYS") {
            Some(keys) => parse_remember_me_keys(&keys)?,
            None if production => Vec::new(),
            None => RememberMeKey::random("dev").into_iter().collect(),
        };

        let password_pepper = get("LEMON_PASSWORD_PEPPER")
            .map(|p| general_purpose::STANDARD.decode(p))
            .transpose()
            .context("LEMON_PASSWORD_PEPPER must be base64")?;

        let cookie_same_site = match get("LEMON_COOKIE_SAME_SITE").as_deref() {
            None => SameSite::Lax,
            Some(v) if v.eq_ignore_ascii_case("lax") => SameSite::Lax,
            Some(v) if v.eq_ignore_ascii_case("strict") => SameSite::Strict,
            Some(v) if v.eq_ignore_ascii_case("none") => SameSite::None,
            Some(v) => bail!("LEMON_COOKIE_SAME_SITE must be Lax, Strict or None, got {v}"),
        };

        let defaults = LemonConfig::default();
        let lemon = LemonConfig {
            application_url: get("LEMON_APPLICATION_URL").unwrap_or(defaults.application_url),
            recaptcha_site_key: get("LEMON_RECAPTCHA_SITE_KEY"),
            session_secret,
            remember_me_keys,
            cookie_secure: parse_bool(get("LEMON_COOKIE_SECURE"), production)
                .context("LEMON_COOKIE_SECURE must be true or false")?,
            cookie_same_site,
            password_pepper,
            ..defaults
        };

        let smtp = match get("MAIL_HOST") {
            Some(host) => {
                let port = match get("MAIL_PORT") {
                    Some(port) => port.parse().context("MAIL_PORT must be a port number")?,
                    None => 587,
                };
                Some(SmtpConfig {
                    host,
                    port,
                    username: get("MAIL_USERNAME"),
                    password: get("MAIL_PASSWORD"),
                    from: get("MAIL_FROM").unwrap_or_else(|| "noreply@localhost".to_string()),
                    starttls: parse_bool(get("MAIL_STARTTLS"), true)
                        .context("MAIL_STARTTLS must be true or false")?,
                })
            }
            None => None,
        };

        let admin = match (get("LEMON_ADMIN_EMAIL"), get("LEMON_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed { email, password }),
            (None, None) => None,
            _ => bail!("LEMON_ADMIN_EMAIL and LEMON_ADMIN_PASSWORD must be set together"),
        };

        Ok(Self {
            addr: SocketAddr::from(([0, 0, 0, 0], port)),
            database_url: get("DATABASE_URL"),
            lemon,
            recaptcha_secret_key: get("LEMON_RECAPTCHA_SECRET_KEY"),
            smtp,
            cors: CorsConfig::with_origins(&get("LEMON_CORS_ALLOWED_ORIGINS").unwrap_or_default()),
            json_prefix: parse_bool(get("LEMON_ENABLED_JSON_PREFIX"), true)
                .context("LEMON_ENABLED_JSON_PREFIX must be true or false")?,
            admin,
        })
    }
}

fn parse_bool(value: Option<String>, default: bool) -> anyhow::Result<bool> {
    match value {
        None => Ok(default),
        Some(v) => v.to_ascii_lowercase().parse::<bool>().map_err(Into::into),
    }
}

fn decode_secret(value: &str) -> anyhow::Result<[u8; 32]> {
    let bytes = general_purpose::STANDARD.decode(value)?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| anyhow::anyhow!("expected 32 bytes, got {}", b.len()))
}

/// `kid:base64,kid:base64`; the first key signs new tokens
fn parse_remember_me_keys(value: &str) -> anyhow::Result<Vec<RememberMeKey>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (kid, key) = entry
                .split_once(':')
                .context("LEMON_REMEMBER_ME_KEYS entries must look like kid:base64")?;
            let key = general_purpose::STANDARD
                .decode(key.trim())
                .with_context(|| format!("Remember-me key {kid} is not base64"))?;
            RememberMeKey::new(kid.trim(), key)
                .with_context(|| format!("Invalid remember-me key id {kid:?}"))
        })
        .collect()
}
