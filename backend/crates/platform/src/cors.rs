//! CORS configuration
//!
//! Builds a `tower_http` [`CorsLayer`] from a list of allowed origins. No
//! layer is produced when the list is empty, so same-origin deployments
//! carry no CORS headers at all.

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

const DEFAULT_ALLOWED_HEADERS: &[&str] = &[
    "accept",
    "accept-encoding",
    "accept-language",
    "cache-control",
    "connection",
    "content-length",
    "content-type",
    "cookie",
    "host",
    "origin",
    "pragma",
    "referer",
    "user-agent",
    "x-requested-with",
    "x-xsrf-token",
];

const DEFAULT_EXPOSED_HEADERS: &[&str] = &[
    "cache-control",
    "connection",
    "content-type",
    "date",
    "expires",
    "pragma",
    "server",
    "set-cookie",
    "transfer-encoding",
    "x-content-type-options",
    "x-xss-protection",
    "x-frame-options",
    "x-application-context",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<Method>,
    pub allowed_headers: Vec<String>,
    pub exposed_headers: Vec<String>,
    pub allow_credentials: bool,
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allowed_methods: vec![
                Method::GET,
                Method::HEAD,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::TRACE,
                Method::OPTIONS,
                Method::PATCH,
            ],
            allowed_headers: DEFAULT_ALLOWED_HEADERS.iter().map(|s| s.to_string()).collect(),
            exposed_headers: DEFAULT_EXPOSED_HEADERS.iter().map(|s| s.to_string()).collect(),
            allow_credentials: true,
            max_age_secs: 3600,
        }
    }
}

impl CorsConfig {
    /// Default settings for a comma separated origin list
    pub fn with_origins(origins: &str) -> Self {
        Self {
            allowed_origins: origins
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            ..Self::default()
        }
    }

    /// The CORS layer, or `None` when no origin is allowed
    ///
    /// Unparseable origins and header names are skipped with a warning. A `*`
    /// entry allows every origin by echoing the request's `Origin` back.
    pub fn layer(&self) -> Option<CorsLayer> {
        let allow_origin = if self.allowed_origins.iter().any(|origin| origin == "*") {
            tracing::warn!("CORS allows any origin");
            AllowOrigin::mirror_request()
        } else {
            let origins = self.origin_values();
            if origins.is_empty() {
                return None;
            }
            tracing::info!(origins = ?self.allowed_origins, "Configuring CORS");
            AllowOrigin::list(origins)
        };

        Some(
            CorsLayer::new()
                .allow_origin(allow_origin)
                .allow_methods(self.allowed_methods.clone())
                .allow_headers(header_names(&self.allowed_headers))
                .expose_headers(header_names(&self.exposed_headers))
                .allow_credentials(self.allow_credentials)
                .max_age(Duration::from_secs(self.max_age_secs)),
        )
    }

    fn origin_values(&self) -> Vec<HeaderValue> {
        self
            .allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect()
    }
}

fn header_names(names: &[String]) -> Vec<HeaderName> {
    names
        .iter()
        .filter_map(|name| match HeaderName::from_bytes(name.as_bytes()) {
            Ok(header) => Some(header),
            Err(_) => {
                tracing::warn!(header = %name, "Ignoring invalid CORS header name");
                None
            }
        })
        .collect()
}
