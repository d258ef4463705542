//! Application Configuration
//!
//! Configuration for the Lemon application layer.

use std::time::Duration;

use platform::cookie::CookieConfig;
use platform::crypto::random_secret;

/// Re-export SameSite from platform
pub use platform::cookie::SameSite;

/// One remember-me signing key
#[derive(Clone, PartialEq, Eq)]
pub struct RememberMeKey {
    /// Key id embedded in every token; must not contain `.` or `:`
    pub kid: String,
    pub key: Vec<u8>,
}

impl RememberMeKey {
    pub fn new(kid: impl Into<String>, key: impl Into<Vec<u8>>) -> Option<Self> {
        let kid = kid.into();
        if kid.is_empty() || kid.contains(['.', ':']) {
            return None;
        }
        Some(Self {
            kid,
            key: key.into(),
        })
    }

    pub fn random(kid: impl Into<String>) -> Option<Self> {
        Self::new(kid, random_secret().to_vec())
    }
}

impl std::fmt::Debug for RememberMeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RememberMeKey")
            .field("kid", &self.kid)
            .finish_non_exhaustive()
    }
}

/// Lemon application configuration
#[derive(Debug, Clone)]
pub struct LemonConfig {
    /// Public URL of the front-end; mail links point here
    pub application_url: String,
    /// reCAPTCHA site key shared with the client through `/context`
    pub recaptcha_site_key: Option<String>,
    /// Session secret key for HMAC signing (32 bytes)
    pub session_secret: [u8; 32],
    /// Remember-me keys; the first signs, all of them verify
    pub remember_me_keys: Vec<RememberMeKey>,
    /// Session TTL without "Remember Me" (12 hours)
    pub session_ttl_short: Duration,
    /// Session and remember-me token TTL with "Remember Me" (2 weeks)
    pub session_ttl_long: Duration,
    /// Lifetime of a password reset code (24 hours)
    pub reset_code_ttl: Duration,
    /// Whether to require Secure cookie
    pub cookie_secure: bool,
    /// SameSite policy
    pub cookie_same_site: SameSite,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
}

impl Default for LemonConfig {
    fn default() -> Self {
        Self {
            application_url: "http://localhost:9000".to_string(),
            recaptcha_site_key: None,
            session_secret: [0u8; 32],
            remember_me_keys: Vec::new(),
            session_ttl_short: Duration::from_secs(12 * 3600),
            session_ttl_long: Duration::from_secs(14 * 24 * 3600),
            reset_code_ttl: Duration::from_secs(24 * 3600),
            cookie_secure: true,
            cookie_same_site: SameSite::Lax,
            password_pepper: None,
        }
    }
}

impl LemonConfig {
    /// Create config with random secrets (for development)
    pub fn with_random_secret() -> Self {
        Self {
            session_secret: random_secret(),
            remember_me_keys: RememberMeKey::random("dev").into_iter().collect(),
            ..Default::default()
        }
    }

    /// Create config for development (insecure cookie)
    pub fn development() -> Self {
        Self {
            cookie_secure: false,
            ..Self::with_random_secret()
        }
    }

    pub fn session_ttl_short_ms(&self) -> i64 {
        self.session_ttl_short.as_millis() as i64
    }

    pub fn session_ttl_long_ms(&self) -> i64 {
        self.session_ttl_long.as_millis() as i64
    }

    /// Session lifetime for a sign-in with or without "Remember Me"
    pub fn session_ttl(&self, remember_me: bool) -> chrono::Duration {
        if remember_me {
            chrono::Duration::milliseconds(self.session_ttl_long_ms())
        } else {
            chrono::Duration::milliseconds(self.session_ttl_short_ms())
        }
    }

    pub fn reset_code_ttl(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.reset_code_ttl.as_millis() as i64)
    }

    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }

    fn apply_cookie_policy(&self, mut cookie: CookieConfig) -> CookieConfig {
        cookie.secure = self.cookie_secure;
        cookie.same_site = self.cookie_same_site;
        cookie
    }

    pub fn session_cookie(&self) -> CookieConfig {
        self.apply_cookie_policy(CookieConfig::session())
    }

    pub fn remember_me_cookie(&self) -> CookieConfig {
        self.apply_cookie_policy(CookieConfig::remember_me(
            self.session_ttl_long.as_secs() as i64,
        ))
    }
}
