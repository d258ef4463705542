//! JSON vulnerability prefix
//!
//! Prefixes JSON response bodies with `)]}',\n` so that they cannot be
//! evaluated as script by a cross-origin `<script src>` include. Clients
//! strip the prefix before parsing (AngularJS `$http` does this natively).

use axum::{
    body::{Body, Bytes, to_bytes},
    extract::Request,
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// The prefix, byte for byte
pub const JSON_PREFIX: &[u8] = b")]}',\n";

/// Prepend [`JSON_PREFIX`] when `enabled`
pub fn apply_json_prefix(body: &[u8], enabled: bool) -> Vec<u8> {
    if !enabled {
        return body.to_vec();
    }
    let mut out = Vec::with_capacity(JSON_PREFIX.len() + body.len());
    out.extend_from_slice(JSON_PREFIX);
    out.extend_from_slice(body);
    out
}

/// Remove [`JSON_PREFIX`] if the body starts with it
pub fn strip_json_prefix(body: &[u8]) -> &[u8] {
    body.strip_prefix(JSON_PREFIX).unwrap_or(body)
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| {
            let mime = ct.split(';').next().unwrap_or_default().trim();
            mime.eq_ignore_ascii_case("application/json") || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

/// Middleware prefixing every JSON response
///
/// Install with `axum::middleware::from_fn(json_prefix_middleware)` when the
/// prefix is enabled.
pub async fn json_prefix_middleware(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    if !is_json(response.headers()) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes: Bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, "Failed to buffer JSON response body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(apply_json_prefix(&bytes, true)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, middleware, routing::get};
    use tower::ServiceExt;

    #[test]
    fn test_prefix_bytes() {
        assert_eq!(JSON_PREFIX, &[b')', b']', b'}', b'\'', b',', b'\n']);
    }

    #[test]
    fn test_apply_and_strip() {
        let body = br#"{"a":1}"#;
        let prefixed = apply_json_prefix(body, true);
        assert!(prefixed.starts_with(JSON_PREFIX));
        assert_eq!(strip_json_prefix(&prefixed), body);

        assert_eq!(apply_json_prefix(body, false), body.to_vec());
        assert_eq!(strip_json_prefix(body), body);
    }

    #[test]
    fn test_is_json() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
        assert!(is_json(&headers));
        headers.insert(
            header::CONTENT_TYPE,
            "application/problem+json; charset=utf-8".parse().unwrap(),
        );
        assert!(is_json(&headers));
        headers.insert(header::CONTENT_TYPE, "text/plain".parse().unwrap());
        assert!(!is_json(&headers));
    }

    #[tokio::test]
    async fn test_middleware_prefixes_json_only() {
        let app = Router::new()
            .route("/json", get(|| async { Json(serde_json::json!({"ok": true})) }))
            .route("/text", get(|| async { "plain" }))
            .layer(middleware::from_fn(json_prefix_middleware));

        let res = app
            .clone()
            .oneshot(Request::builder().uri("/json").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(JSON_PREFIX));
        let value: serde_json::Value = serde_json::from_slice(strip_json_prefix(&bytes)).unwrap();
        assert_eq!(value["ok"], true);

        let res = app
            .oneshot(Request::builder().uri("/text").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"plain");
    }
}
