//! Client identification utilities
//!
//! Sessions are bound to the User-Agent that created them; the client IP is
//! recorded for audit logs and CAPTCHA verification.

use axum::http::{HeaderMap, header};
use std::net::IpAddr;

use crate::crypto::sha256;

/// Client fingerprint derived from request headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientFingerprint {
    /// SHA-256 hash of the User-Agent header (empty string when absent)
    pub hash: [u8; 32],
    /// Client IP address (from X-Forwarded-For or direct connection)
    pub ip: Option<IpAddr>,
    /// Original User-Agent string (for logging/display)
    pub user_agent: Option<String>,
}

impl ClientFingerprint {
    pub fn new(hash: [u8; 32], ip: Option<IpAddr>, user_agent: Option<String>) -> Self {
        Self {
            hash,
            ip,
            user_agent,
        }
    }

    /// Fingerprint for a given User-Agent, mostly for tests and background jobs
    pub fn for_user_agent(user_agent: &str, ip: Option<IpAddr>) -> Self {
        Self::new(sha256(user_agent.as_bytes()), ip, Some(user_agent.to_string()))
    }

    /// Whether a stored fingerprint hash belongs to this client
    pub fn matches(&self, stored: &[u8]) -> bool {
        crate::crypto::constant_time_eq(&self.hash, stored)
    }

    /// Get IP as string (for database storage)
    pub fn ip_string(&self) -> Option<String> {
        self.ip.map(|ip| ip.to_string())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum FingerprintError {
    #[error("Header {0} is not valid visible ASCII")]
    InvalidHeader(&'static str),
}

/// Extract client fingerprint from request headers
///
/// A missing User-Agent hashes as the empty string; an unreadable one is an
/// error, since browsers never send that.
pub fn extract_fingerprint(
    headers: &HeaderMap,
    client_ip: Option<IpAddr>,
) -> Result<ClientFingerprint, FingerprintError> {
    let user_agent = match headers.get(header::USER_AGENT) {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| FingerprintError::InvalidHeader("User-Agent"))?,
        ),
        None => None,
    };

    let hash = sha256(user_agent.unwrap_or_default().as_bytes());

    Ok(ClientFingerprint::new(
        hash,
        client_ip,
        user_agent.map(str::to_string),
    ))
}

/// Extract client IP address from headers
///
/// Checks X-Forwarded-For header first (for reverse proxy setups),
/// then falls back to direct connection IP.
pub fn extract_client_ip(headers: &HeaderMap, direct_ip: Option<IpAddr>) -> Option<IpAddr> {
    if let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first_ip) = xff.split(',').next() {
            if let Ok(ip) = first_ip.trim().parse::<IpAddr>() {
                return Some(ip);
            }
        }
    }
    direct_ip
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_fingerprint() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_static("Mozilla/5.0 Test Browser"),
        );

        let fp = extract_fingerprint(&headers, None).unwrap();
        assert_eq!(fp.hash, sha256(b"Mozilla/5.0 Test Browser"));
        assert_eq!(fp.user_agent, Some("Mozilla/5.0 Test Browser".to_string()));
        assert!(fp.matches(&sha256(b"Mozilla/5.0 Test Browser")));
        assert!(!fp.matches(&sha256(b"curl/8.0")));
    }

    #[test]
    fn test_extract_fingerprint_missing_ua() {
        let headers = HeaderMap::new();
        let fp = extract_fingerprint(&headers, None).unwrap();
        assert_eq!(fp.hash, sha256(b""));
        assert_eq!(fp.user_agent, None);
    }

    #[test]
    fn test_extract_fingerprint_invalid_ua() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_bytes(&[0xff, 0xfe]).unwrap(),
        );
        assert!(matches!(
            extract_fingerprint(&headers, None),
            Err(FingerprintError::InvalidHeader("User-Agent"))
        ));
    }

    #[test]
    fn test_extract_client_ip_xff() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("192.168.1.1, 10.0.0.1"),
        );

        let ip = extract_client_ip(&headers, None);
        assert_eq!(ip, Some("192.168.1.1".parse().unwrap()));
    }

    #[test]
    fn test_extract_client_ip_direct() {
        let headers = HeaderMap::new();
        let direct: IpAddr = "127.0.0.1".parse().unwrap();

        let ip = extract_client_ip(&headers, Some(direct));
        assert_eq!(ip, Some(direct));
    }
}
