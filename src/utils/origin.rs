// src/utils/origin.rs

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use url::Url;

use crate::{config::Config, error::AppError};

/// Axum Middleware: Origin allow-list.
///
/// Requests without an `Origin` header, same-origin requests and requests
/// from a configured origin pass through. Everything else gets 403.
pub async fn origin_guard(
    State(config): State<Config>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if is_origin_allowed(req.headers(), &config.allowed_origins) {
        return next.run(req).await;
    }

    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    tracing::warn!("Rejected request from origin {}", origin);

    AppError::Forbidden("Origin not allowed".to_string()).into_response()
}

pub fn is_origin_allowed(headers: &HeaderMap, allowed_origins: &[String]) -> bool {
    let Some(origin) = headers.get(header::ORIGIN) else {
        return true;
    };
    let Ok(origin) = origin.to_str() else {
        return false;
    };
    let origin = origin.trim_end_matches('/');

    if allowed_origins.iter().any(|allowed| allowed == origin) {
        return true;
    }

    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok());

    match (origin_authority(origin), host) {
        (Some(authority), Some(host)) => authority.eq_ignore_ascii_case(host),
        _ => false,
    }
}

/// `host[:port]` of an origin, in the form a `Host` header carries it.
fn origin_authority(origin: &str) -> Option<String> {
    let url = Url::parse(origin).ok()?;
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(origin: Option<&'static str>, host: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static(host));
        if let Some(origin) = origin {
            headers.insert(header::ORIGIN, HeaderValue::from_static(origin));
        }
        headers
    }

    #[test]
    fn missing_origin_passes() {
        assert!(is_origin_allowed(&headers(None, "blog.example"), &[]));
    }

    #[test]
    fn same_origin_passes() {
        assert!(is_origin_allowed(
            &headers(Some("https://blog.example"), "blog.example"),
            &[]
        ));
        assert!(is_origin_allowed(
            &headers(Some("http://localhost:3000"), "localhost:3000"),
            &[]
        ));
    }

    #[test]
    fn listed_origin_passes() {
        let allowed = vec!["https://friend.example".to_string()];
        assert!(is_origin_allowed(
            &headers(Some("https://friend.example"), "blog.example"),
            &allowed
        ));
    }

    #[test]
    fn foreign_origin_is_rejected() {
        let allowed = vec!["https://friend.example".to_string()];
        assert!(!is_origin_allowed(
            &headers(Some("https://evil.example"), "blog.example"),
            &allowed
        ));
        assert!(!is_origin_allowed(
            &headers(Some("http://localhost:4000"), "localhost:3000"),
            &allowed
        ));
    }
}
