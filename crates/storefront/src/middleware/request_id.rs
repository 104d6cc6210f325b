//! Correlation IDs for cart requests.
//!
//! The storefront usually sits behind the shop's web tier, which may already
//! have tagged the request; the cart client and `sf-cli` never set one. Each
//! request therefore carries either the inbound `x-request-id` (when it is
//! short and printable) or a fresh UUID v4. The ID goes on the request span,
//! onto the Sentry scope, and back out on the response.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Span;
use uuid::Uuid;

/// Header carrying the correlation ID in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 128;

/// Inbound correlation ID worth keeping, if any.
///
/// Empty, oversized or non-printable values are dropped so log lines and
/// Sentry tags stay readable.
fn inbound_request_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|id| {
            !id.is_empty()
                && id.len() <= MAX_REQUEST_ID_LEN
                && id.bytes().all(|b| b.is_ascii_graphic())
        })
}

/// Tag the request with a correlation ID and echo it on the response.
pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = inbound_request_id(request.headers())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    Span::current().record("request_id", &request_id);
    sentry::configure_scope(|scope| {
        scope.set_tag("request_id", &request_id);
    });

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(value) {
            headers.insert(REQUEST_ID_HEADER, value);
        }
        headers
    }

    #[test]
    fn test_keeps_upstream_id() {
        assert_eq!(inbound_request_id(&headers("edge-7f3a")), Some("edge-7f3a"));
    }

    #[test]
    fn test_drops_unusable_ids() {
        assert_eq!(inbound_request_id(&HeaderMap::new()), None);
        assert_eq!(inbound_request_id(&headers("")), None);
        assert_eq!(inbound_request_id(&headers("has space")), None);
        assert_eq!(inbound_request_id(&headers(&"a".repeat(129))), None);
        assert!(inbound_request_id(&headers(&"a".repeat(128))).is_some());
    }
}
