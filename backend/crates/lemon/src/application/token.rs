//! Session and Remember-Me Tokens
//!
//! Session token: `{session_id}.{sig}` where `sig` is the base64url
//! HMAC-SHA256 of the session id. The session itself lives server side.
//!
//! Remember-me token: `{kid}.{user_id}.{expires_at_ms}.{sig}` where `sig`
//! covers `kid:user_id:expires_at_ms:password_hash`. Nothing is stored;
//! changing the password changes the signed material, so every outstanding
//! token stops verifying.

use chrono::{Duration, Utc};
use platform::crypto::{from_base64_url, hmac_sha256, to_base64_url, verify_hmac_sha256};
use platform::password::HashedPassword;

use crate::application::config::RememberMeKey;
use crate::domain::value_object::{SessionId, UserId};

/// Signs and verifies session cookie values
#[derive(Clone)]
pub struct SessionTokenSigner {
    secret: [u8; 32],
}

impl SessionTokenSigner {
    pub fn new(secret: [u8; 32]) -> Self {
        Self { secret }
    }

    pub fn sign(&self, session_id: &SessionId) -> String {
        let session_id = session_id.to_string();
        let signature = hmac_sha256(&self.secret, session_id.as_bytes());
        format!("{}.{}", session_id, to_base64_url(&signature))
    }

    /// Session id carried by a well-formed, correctly signed token
    pub fn verify(&self, token: &str) -> Option<SessionId> {
        let (session_id, signature) = token.split_once('.')?;
        let signature = from_base64_url(signature).ok()?;

        if !verify_hmac_sha256(&self.secret, session_id.as_bytes(), &signature) {
            return None;
        }
        session_id.parse().ok()
    }
}

/// Parsed but not yet verified remember-me token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RememberMeClaims {
    pub kid: String,
    pub user_id: UserId,
    pub expires_at_ms: i64,
    signature: Vec<u8>,
}

impl RememberMeClaims {
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp_millis() > self.expires_at_ms
    }
}

/// Issues and verifies stateless remember-me tokens with key rotation
#[derive(Clone)]
pub struct RememberMeTokens {
    keys: Vec<RememberMeKey>,
    ttl: Duration,
}

impl RememberMeTokens {
    pub fn new(keys: Vec<RememberMeKey>, ttl: Duration) -> Self {
        Self { keys, ttl }
    }

    pub fn is_enabled(&self) -> bool {
        !self.keys.is_empty()
    }

    fn signed_material(kid: &str, user_id: &UserId, expires_at_ms: i64, hash: &HashedPassword) -> String {
        format!("{}:{}:{}:{}", kid, user_id, expires_at_ms, hash.as_str())
    }

    /// Token for `user_id`, signed with the current key
    ///
    /// `None` when no key is configured.
    pub fn issue(&self, user_id: &UserId, password_hash: &HashedPassword) -> Option<String> {
        let current = self.keys.first()?;
        let expires_at_ms = (Utc::now() + self.ttl).timestamp_millis();

        let material = Self::signed_material(&current.kid, user_id, expires_at_ms, password_hash);
        let signature = hmac_sha256(&current.key, material.as_bytes());

        Some(format!(
            "{}.{}.{}.{}",
            current.kid,
            user_id,
            expires_at_ms,
            to_base64_url(&signature)
        ))
    }

    /// Split a token into its claims; signature and expiry are not checked
    pub fn parse(&self, token: &str) -> Option<RememberMeClaims> {
        let mut parts = token.split('.');
        let (kid, user_id, expires_at_ms, signature) =
            (parts.next()?, parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() || kid.is_empty() {
            return None;
        }

        Some(RememberMeClaims {
            kid: kid.to_string(),
            user_id: user_id.parse().ok()?,
            expires_at_ms: expires_at_ms.parse().ok()?,
            signature: from_base64_url(signature).ok()?,
        })
    }

    /// Whether `claims` were signed by a known key over `password_hash` and
    /// have not expired
    pub fn verify(&self, claims: &RememberMeClaims, password_hash: &HashedPassword) -> bool {
        let Some(key) = self.keys.iter().find(|k| k.kid == claims.kid) else {
            tracing::debug!(kid = %claims.kid, "Remember-me token signed with unknown key");
            return false;
        };
        if claims.is_expired() {
            return false;
        }

        let material =
            Self::signed_material(&claims.kid, &claims.user_id, claims.expires_at_ms, password_hash);
        verify_hmac_sha256(&key.key, material.as_bytes(), &claims.signature)
    }
}
