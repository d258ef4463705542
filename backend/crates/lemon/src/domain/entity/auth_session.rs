//! Auth Session Entity
//!
//! Represents an authenticated user session.
//! Stored server side; the cookie only carries a signed reference.

use chrono::{DateTime, Duration, Utc};
use platform::client::ClientFingerprint;

use crate::domain::value_object::{SessionId, UserId};

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub session_id: SessionId,
    pub user_id: UserId,
    /// Session expiration (Unix timestamp ms)
    pub expires_at_ms: i64,
    /// Whether "Remember Me" was checked
    pub remember_me: bool,
    /// SHA-256 of the User-Agent that created the session
    pub client_fingerprint_hash: Vec<u8>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl AuthSession {
    /// Create a new auth session
    ///
    /// TTL is provided by the application layer (config), not hard-coded here.
    pub fn new(
        user_id: UserId,
        remember_me: bool,
        fingerprint: &ClientFingerprint,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();

        Self {
            session_id: SessionId::new(),
            user_id,
            expires_at_ms: (now + ttl).timestamp_millis(),
            remember_me,
            client_fingerprint_hash: fingerprint.hash.to_vec(),
            client_ip: fingerprint.ip_string(),
            user_agent: fingerprint.user_agent.clone(),
            created_at: now,
            last_activity_at: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp_millis() > self.expires_at_ms
    }

    pub fn touch(&mut self) {
        self.last_activity_at = Utc::now();
    }

    pub fn remaining_ms(&self) -> i64 {
        let now_ms = Utc::now().timestamp_millis();
        (self.expires_at_ms - now_ms).max(0)
    }

    /// Slide a remember-me session forward
    ///
    /// Extends to (now + ttl_long) once less than half of ttl_long remains.
    /// Returns whether the expiry moved.
    pub fn extend_if_needed(&mut self, ttl_long: Duration) -> bool {
        if !self.remember_me {
            return false;
        }

        let now = Utc::now();
        if self.expires_at_ms < (now + (ttl_long / 2)).timestamp_millis() {
            self.expires_at_ms = (now + ttl_long).timestamp_millis();
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fingerprint() -> ClientFingerprint {
        ClientFingerprint::for_user_agent("test-agent", None)
    }

    #[test]
    fn test_new_session() {
        let session = AuthSession::new(UserId::new(), false, &fingerprint(), Duration::hours(1));
        assert!(!session.is_expired());
        assert!(session.remaining_ms() > 0);
        assert_eq!(session.user_agent.as_deref(), Some("test-agent"));
        assert!(fingerprint().matches(&session.client_fingerprint_hash));
    }

    #[test]
    fn test_expired_session() {
        let session = AuthSession::new(UserId::new(), false, &fingerprint(), Duration::seconds(-1));
        assert!(session.is_expired());
        assert_eq!(session.remaining_ms(), 0);
    }

    #[test]
    fn test_extend_only_remember_me_past_half_life() {
        let ttl_long = Duration::days(14);

        let mut short = AuthSession::new(UserId::new(), false, &fingerprint(), Duration::hours(1));
        assert!(!short.extend_if_needed(ttl_long));

        let mut fresh = AuthSession::new(UserId::new(), true, &fingerprint(), ttl_long);
        assert!(!fresh.extend_if_needed(ttl_long));

        let mut aging = AuthSession::new(UserId::new(), true, &fingerprint(), Duration::days(3));
        let before = aging.expires_at_ms;
        assert!(aging.extend_if_needed(ttl_long));
        assert!(aging.expires_at_ms > before);
    }
}
