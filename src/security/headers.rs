//! Client identity behind reverse proxies.
//!
//! Each trusted proxy appends the address it received the request from to
//! `X-Forwarded-For`, so with `n` trusted proxies the client is the entry `n`
//! hops in from the right. Entries further left are client-controlled.

use axum::http::HeaderMap;
use std::net::SocketAddr;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Resolve the caller's address.
///
/// With `proxy_count == 0`, or without a usable header, the socket peer is
/// the caller. Chains shorter than `proxy_count` resolve to their leftmost
/// entry.
pub fn client_ip(headers: &HeaderMap, peer: SocketAddr, proxy_count: usize) -> String {
    if proxy_count > 0 {
        if let Some(forwarded) = headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
            let hops: Vec<&str> = forwarded.split(',').collect();
            let index = hops.len().saturating_sub(proxy_count);
            let client = hops[index].trim();
            if !client.is_empty() {
                return client.to_string();
            }
        }
    }
    peer.ip().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn forwarded(chain: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_str(chain).unwrap());
        headers
    }

    fn peer() -> SocketAddr {
        "10.0.0.1:51234".parse().unwrap()
    }

    #[test]
    fn test_no_proxies_uses_peer() {
        let headers = forwarded("1.1.1.1, 2.2.2.2");
        assert_eq!(client_ip(&headers, peer(), 0), "10.0.0.1");
    }

    #[test]
    fn test_missing_header_uses_peer() {
        assert_eq!(client_ip(&HeaderMap::new(), peer(), 2), "10.0.0.1");
    }

    #[test]
    fn test_hops_counted_from_right() {
        let headers = forwarded("1.1.1.1, 2.2.2.2, 3.3.3.3");
        assert_eq!(client_ip(&headers, peer(), 1), "3.3.3.3");
        assert_eq!(client_ip(&headers, peer(), 2), "2.2.2.2");
        assert_eq!(client_ip(&headers, peer(), 3), "1.1.1.1");
    }

    #[test]
    fn test_short_chain_clamps_to_leftmost() {
        let headers = forwarded("4.4.4.4,5.5.5.5");
        assert_eq!(client_ip(&headers, peer(), 5), "4.4.4.4");
    }

    #[test]
    fn test_blank_entry_falls_back_to_peer() {
        let headers = forwarded(" , 6.6.6.6");
        assert_eq!(client_ip(&headers, peer(), 2), "10.0.0.1");
    }

    #[test]
    fn test_ipv6_peer() {
        let peer: SocketAddr = "[::1]:8080".parse().unwrap();
        assert_eq!(client_ip(&HeaderMap::new(), peer, 0), "::1");
    }
}
