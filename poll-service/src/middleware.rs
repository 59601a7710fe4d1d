//! Middleware for resolving the client address

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::debug;

/// Client address as seen by the service, stored as a request extension.
/// `None` when no header or socket address was available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub Option<String>);

const CF_CONNECTING_IP: HeaderName = HeaderName::from_static("cf-connecting-ip");
const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Pick the client IP. With `trust_proxy_headers`:
/// CF-Connecting-IP > X-Forwarded-For (first) > socket. Otherwise only the
/// socket address counts.
pub fn resolve_client_ip<B>(
    req: &Request<B>,
    trust_proxy_headers: bool,
) -> Option<(String, &'static str)> {
    let header = |name: &HeaderName| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
    };

    if trust_proxy_headers {
        if let Some(ip) = header(&CF_CONNECTING_IP).filter(|s| !s.is_empty()) {
            return Some((ip.to_string(), "cf-connecting-ip"));
        }

        if let Some(first) = header(&X_FORWARDED_FOR)
            .and_then(|s| s.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            return Some((first.to_string(), "x-forwarded-for"));
        }
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| (info.0.ip().to_string(), "socket"))
}

// Record the client IP for anonymous voter attribution. X-Forwarded-For is
// rewritten to the resolved address so the rate limiter keys on the same
// value and never on an untrusted header.
pub async fn inject_client_ip(
    State(trust_proxy_headers): State<bool>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let client_ip = resolve_client_ip(&req, trust_proxy_headers);
    req.headers_mut().remove(X_FORWARDED_FOR);

    let client_ip = match client_ip {
        Some((ip, source)) => {
            debug!("client_ip_source={} ip={}", source, ip);
            if let Ok(value) = HeaderValue::from_str(&ip) {
                req.headers_mut().insert(X_FORWARDED_FOR, value);
            }
            Some(ip)
        }
        None => {
            debug!("client_ip_source=unavailable");
            None
        }
    };
    req.extensions_mut().insert(ClientIp(client_ip));

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_cloudflare_header_wins() {
        let req = Request::builder()
            .header("cf-connecting-ip", "1.1.1.1")
            .header("x-forwarded-for", "2.2.2.2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            resolve_client_ip(&req, true),
            Some(("1.1.1.1".to_string(), "cf-connecting-ip"))
        );
    }

    #[test]
    fn test_first_forwarded_address_is_used() {
        let req = Request::builder()
            .header("x-forwarded-for", " 3.3.3.3 , 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            resolve_client_ip(&req, true),
            Some(("3.3.3.3".to_string(), "x-forwarded-for"))
        );
    }

    #[test]
    fn test_socket_address_fallback() {
        let mut req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(resolve_client_ip(&req, true), None);

        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));
        assert_eq!(
            resolve_client_ip(&req, true),
            Some(("127.0.0.1".to_string(), "socket"))
        );
    }

    #[test]
    fn test_untrusted_headers_are_ignored() {
        let mut req = Request::builder()
            .header("cf-connecting-ip", "1.1.1.1")
            .header("x-forwarded-for", "2.2.2.2")
            .body(Body::empty())
            .unwrap();
        assert_eq!(resolve_client_ip(&req, false), None);

        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 7], 4000))));
        assert_eq!(
            resolve_client_ip(&req, false),
            Some(("10.0.0.7".to_string(), "socket"))
        );
    }
}
