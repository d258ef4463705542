//! Cookie Management Infrastructure
//!
//! `Set-Cookie` rendering and `Cookie` header parsing for the session and
//! remember-me cookies.

use axum::http::{HeaderMap, HeaderValue, header};

/// Default name of the session cookie
pub const SESSION_COOKIE_NAME: &str = "lemon_session";

/// Name of the remember-me cookie (and the login form parameter)
pub const REMEMBER_ME_COOKIE_NAME: &str = "rememberMe";

/// SameSite policy for cookies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Cookie configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieConfig {
    pub name: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
    pub path: String,
    pub max_age_secs: Option<i64>,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self::session()
    }
}

impl CookieConfig {
    /// Browser-session cookie carrying the signed session token
    pub fn session() -> Self {
        Self {
            name: SESSION_COOKIE_NAME.to_string(),
            secure: true,
            http_only: true,
            same_site: SameSite::Lax,
            path: "/".to_string(),
            max_age_secs: None,
        }
    }

    /// Persistent cookie carrying the remember-me token
    pub fn remember_me(max_age_secs: i64) -> Self {
        Self {
            name: REMEMBER_ME_COOKIE_NAME.to_string(),
            max_age_secs: Some(max_age_secs),
            ..Self::session()
        }
    }

    /// Same cookie without `Secure`, for plain-http local development
    pub fn insecure(mut self) -> Self {
        self.secure = false;
        self
    }

    /// Build Set-Cookie header value
    pub fn build_set_cookie(&self, value: &str) -> String {
        let mut cookie = format!("{}={}", self.name, value);

        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str(&format!("; SameSite={}", self.same_site.as_str()));
        cookie.push_str(&format!("; Path={}", self.path));

        if let Some(max_age) = self.max_age_secs {
            cookie.push_str(&format!("; Max-Age={}", max_age));
        }

        cookie
    }

    /// Build Set-Cookie header for deletion (expired)
    pub fn build_delete_cookie(&self) -> String {
        let mut cookie = format!("{}=; HttpOnly", self.name);
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str(&format!(
            "; SameSite={}; Path={}; Max-Age=0",
            self.same_site.as_str(),
            self.path
        ));
        cookie
    }

    /// Set-Cookie header value for `value`
    ///
    /// Token values are base64url and dot separated, so this only fails on
    /// a misconfigured cookie name.
    pub fn set_cookie_header(&self, value: &str) -> Option<HeaderValue> {
        HeaderValue::from_str(&self.build_set_cookie(value)).ok()
    }

    pub fn delete_cookie_header(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&self.build_delete_cookie()).ok()
    }
}

/// Extract a cookie value from headers
///
/// Looks through every `Cookie` header, since HTTP/2 clients may split them.
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|cookie| {
            let (key, value) = cookie.trim().split_once('=')?;

            if key == name && !value.is_empty() {
                Some(value.to_string())
            } else {
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_config_build() {
        let config = CookieConfig {
            name: "test".to_string(),
            secure: true,
            http_only: true,
            same_site: SameSite::Lax,
            path: "/api".to_string(),
            max_age_secs: Some(3600),
        };

        let cookie = config.build_set_cookie("value123");
        assert!(cookie.contains("test=value123"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/api"));
        assert!(cookie.contains("Max-Age=3600"));
    }

    #[test]
    fn test_remember_me_cookie_is_persistent() {
        let config = CookieConfig::remember_me(1_209_600).insecure();
        let cookie = config.build_set_cookie("k1.abc.123.sig");
        assert!(cookie.starts_with("rememberMe=k1.abc.123.sig"));
        assert!(cookie.contains("Max-Age=1209600"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn test_delete_cookie() {
        let cookie = CookieConfig::session().build_delete_cookie();
        assert!(cookie.starts_with("lemon_session=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.contains("Secure"));
    }

    #[test]
    fn test_extract_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("foo=bar; lemon_session=abc123; other=xyz"),
        );
        headers.append(header::COOKIE, HeaderValue::from_static("rememberMe=r1"));

        assert_eq!(
            extract_cookie(&headers, SESSION_COOKIE_NAME),
            Some("abc123".to_string())
        );
        assert_eq!(
            extract_cookie(&headers, REMEMBER_ME_COOKIE_NAME),
            Some("r1".to_string())
        );
        assert_eq!(extract_cookie(&headers, "foo"), Some("bar".to_string()));
        assert_eq!(extract_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_extract_cookie_ignores_cleared_value() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("lemon_session="));
        assert_eq!(extract_cookie(&headers, SESSION_COOKIE_NAME), None);
    }
}
