//! Client-IP resolution (spec.md §4.3): `CF-Connecting-IP`, `X-Real-IP`,
//! first token of `X-Forwarded-For` (split on `,`), then the transport
//! peer address. Unresolvable yields the literal `"unknown"`.

use axum::http::HeaderMap;
use std::net::SocketAddr;

pub fn resolve(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(ip) = header_str(headers, "cf-connecting-ip") {
        return ip;
    }
    if let Some(ip) = header_str(headers, "x-real-ip") {
        return ip;
    }
    if let Some(forwarded) = header_str(headers, "x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next() {
            let trimmed = first.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
    }
    match peer {
        Some(addr) => addr.ip().to_string(),
        None => "unknown".to_string(),
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn prefers_cf_connecting_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("cf-connecting-ip", HeaderValue::from_static("1.1.1.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("2.2.2.2"));
        assert_eq!(resolve(&headers, None), "1.1.1.1");
    }

    #[test]
    fn falls_back_to_first_forwarded_for_token() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("3.3.3.3, 4.4.4.4"));
        assert_eq!(resolve(&headers, None), "3.3.3.3");
    }

    #[test]
    fn falls_back_to_unknown_when_unresolvable() {
        let headers = HeaderMap::new();
        assert_eq!(resolve(&headers, None), "unknown");
    }

    #[test]
    fn falls_back_to_peer_address() {
        let headers = HeaderMap::new();
        let peer: SocketAddr = "5.5.5.5:1234".parse().unwrap();
        assert_eq!(resolve(&headers, Some(peer)), "5.5.5.5");
    }
}
