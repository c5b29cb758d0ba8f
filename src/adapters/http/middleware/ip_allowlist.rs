//! Source-IP allowlist middleware.
//!
//! The payment provider sends notifications only from published address
//! ranges. When enforcement is enabled, everything else receives 403.
//!
//! The client IP is the socket peer. Forwarding headers are read only when
//! the peer is a configured trusted proxy; then the right-most
//! `X-Forwarded-For` entry that is not itself a trusted proxy is the client,
//! falling back to `X-Real-IP`.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::adapters::http::error::ErrorResponse;
use crate::domain::foundation::ValidationError;

/// An IPv4 or IPv6 network in CIDR notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpNetwork {
    addr: IpAddr,
    prefix: u8,
}

impl IpNetwork {
    pub fn contains(&self, ip: IpAddr) -> bool {
        match (self.addr, normalize(ip)) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                let mask = prefix_mask_u32(self.prefix);
                u32::from(net) & mask == u32::from(ip) & mask
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                let mask = prefix_mask_u128(self.prefix);
                u128::from(net) & mask == u128::from(ip) & mask
            }
            _ => false,
        }
    }
}

/// IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) compare as IPv4.
fn normalize(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
        v4 => v4,
    }
}

fn prefix_mask_u32(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    }
}

fn prefix_mask_u128(prefix: u8) -> u128 {
    if prefix == 0 {
        0
    } else {
        u128::MAX << (128 - u32::from(prefix))
    }
}

impl FromStr for IpNetwork {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::invalid_format("network", format!("'{}': {}", s, reason));

        let (addr, prefix) = match s.trim().split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (s.trim(), None),
        };
        let addr: IpAddr = addr.parse().map_err(|_| invalid("not an IP address"))?;
        let max = if addr.is_ipv4() { 32 } else { 128 };
        let prefix = match prefix {
            Some(p) => p.parse::<u8>().map_err(|_| invalid("bad prefix length"))?,
            None => max,
        };
        if prefix > max {
            return Err(invalid("prefix length out of range"));
        }
        Ok(Self { addr, prefix })
    }
}

impl fmt::Display for IpNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

/// Set of networks allowed to call the protected routes.
#[derive(Debug, Clone, Default)]
pub struct IpAllowlist {
    networks: Vec<IpNetwork>,
    trusted_proxies: Vec<IpNetwork>,
}

impl IpAllowlist {
    pub fn new(networks: Vec<IpNetwork>) -> Self {
        Self {
            networks,
            trusted_proxies: Vec::new(),
        }
    }

    /// Parses every entry; any malformed entry is an error.
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Result<Self, ValidationError> {
        Ok(Self::new(parse_networks(entries)?))
    }

    /// Reverse proxies whose forwarding headers are believed.
    pub fn with_trusted_proxies<S: AsRef<str>>(
        mut self,
        entries: &[S],
    ) -> Result<Self, ValidationError> {
        self.trusted_proxies = parse_networks(entries)?;
        Ok(self)
    }

    pub fn allows(&self, ip: IpAddr) -> bool {
        self.networks.iter().any(|n| n.contains(ip))
    }

    fn is_trusted_proxy(&self, ip: IpAddr) -> bool {
        self.trusted_proxies.iter().any(|n| n.contains(ip))
    }

    /// Resolves the originating client of a request that arrived from `peer`.
    ///
    /// Returns `None` when the source cannot be determined.
    pub fn client_ip(&self, headers: &HeaderMap, peer: Option<IpAddr>) -> Option<IpAddr> {
        let peer = peer?;
        if !self.is_trusted_proxy(peer) {
            return Some(peer);
        }

        if let Some(forwarded) = header_str(headers, "X-Forwarded-For") {
            let mut hops = Vec::new();
            for entry in forwarded.split(',') {
                hops.push(entry.trim().parse::<IpAddr>().ok()?);
            }
            return Some(
                hops.into_iter()
                    .rev()
                    .find(|hop| !self.is_trusted_proxy(*hop))
                    .unwrap_or(peer),
            );
        }

        if let Some(real_ip) = header_str(headers, "X-Real-IP") {
            return real_ip.trim().parse().ok();
        }

        Some(peer)
    }
}

fn parse_networks<S: AsRef<str>>(entries: &[S]) -> Result<Vec<IpNetwork>, ValidationError> {
    entries.iter().map(|e| e.as_ref().parse()).collect()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|h| h.to_str().ok())
}

pub async fn ip_allowlist_middleware(
    State(allowlist): State<Arc<IpAllowlist>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let peer = connect_info.map(|ConnectInfo(addr)| addr.ip());
    let client_ip = allowlist.client_ip(request.headers(), peer);

    match client_ip {
        Some(ip) if allowlist.allows(ip) => next.run(request).await,
        other => {
            tracing::warn!(
                client_ip = ?other,
                peer = ?peer,
                path = %request.uri().path(),
                "Rejected request from address outside allowlist"
            );
            (
                StatusCode::FORBIDDEN,
                Json(ErrorResponse::forbidden("Source address not allowed")),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::post;
    use axum::{middleware, Router};
    use tower::ServiceExt;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // IpNetwork
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn v4_network_membership() {
        let net: IpNetwork = "185.71.76.0/27".parse().unwrap();
        assert!(net.contains(ip("185.71.76.0")));
        assert!(net.contains(ip("185.71.76.31")));
        assert!(!net.contains(ip("185.71.76.32")));
        assert!(net.contains(ip("::ffff:185.71.76.5")));
    }

    #[test]
    fn v6_network_membership() {
        let net: IpNetwork = "2a02:5180::/32".parse().unwrap();
        assert!(net.contains(ip("2a02:5180:0:1::2")));
        assert!(!net.contains(ip("2a02:5181::1")));
        assert!(!net.contains(ip("185.71.76.1")));
    }

    #[test]
    fn bare_address_is_single_host() {
        let net: IpNetwork = "77.75.156.11".parse().unwrap();
        assert_eq!(net.to_string(), "77.75.156.11/32");
        assert!(!net.contains(ip("77.75.156.12")));
    }

    #[test]
    fn malformed_networks_are_rejected() {
        assert!("77.75.153.0/33".parse::<IpNetwork>().is_err());
        assert!("not-an-ip/8".parse::<IpNetwork>().is_err());
        assert!(IpAllowlist::parse(&["10.0.0.0/8", "bogus"]).is_err());
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Client IP resolution
    // ════════════════════════════════════════════════════════════════════════════

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                value.parse().unwrap(),
            );
        }
        map
    }

    fn behind_proxy() -> IpAllowlist {
        IpAllowlist::parse(&["185.71.76.0/27"])
            .unwrap()
            .with_trusted_proxies(&["10.0.0.0/8"])
            .unwrap()
    }

    #[test]
    fn direct_peer_ignores_forwarding_headers() {
        let list = behind_proxy();
        let forged = headers(&[
            ("X-Forwarded-For", "185.71.76.10"),
            ("X-Real-IP", "185.71.76.10"),
        ]);
        assert_eq!(
            list.client_ip(&forged, Some(ip("203.0.113.9"))),
            Some(ip("203.0.113.9"))
        );
    }

    #[test]
    fn trusted_proxy_yields_rightmost_untrusted_hop() {
        let list = behind_proxy();
        let chain = headers(&[("X-Forwarded-For", "185.71.76.10, 198.51.100.7, 10.0.0.3")]);
        assert_eq!(list.client_ip(&chain, Some(ip("10.0.0.2"))), Some(ip("198.51.100.7")));
    }

    #[test]
    fn trusted_proxy_falls_back_to_real_ip_then_peer() {
        let list = behind_proxy();
        let real = headers(&[("X-Real-IP", "185.71.76.4")]);
        assert_eq!(list.client_ip(&real, Some(ip("10.0.0.2"))), Some(ip("185.71.76.4")));
        assert_eq!(list.client_ip(&HeaderMap::new(), Some(ip("10.0.0.2"))), Some(ip("10.0.0.2")));
    }

    #[test]
    fn garbage_forwarding_chain_is_unresolved() {
        let list = behind_proxy();
        let bad = headers(&[("X-Forwarded-For", "185.71.76.10, nonsense")]);
        assert_eq!(list.client_ip(&bad, Some(ip("10.0.0.2"))), None);
    }

    #[test]
    fn unknown_peer_is_unresolved() {
        assert_eq!(behind_proxy().client_ip(&HeaderMap::new(), None), None);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Middleware
    // ════════════════════════════════════════════════════════════════════════════

    fn app(allowlist: IpAllowlist) -> Router {
        Router::new()
            .route("/hook", post(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(Arc::new(allowlist), ip_allowlist_middleware))
    }

    fn request(peer: Option<&str>, header: Option<(&str, &str)>) -> Request {
        let mut builder = axum::http::Request::post("/hook");
        if let Some((name, value)) = header {
            builder = builder.header(name, value);
        }
        let mut request = builder.body(Body::empty()).unwrap();
        if let Some(peer) = peer {
            let addr: SocketAddr = peer.parse().unwrap();
            request.extensions_mut().insert(ConnectInfo(addr));
        }
        request
    }

    #[tokio::test]
    async fn allows_listed_peer() {
        let response = app(behind_proxy())
            .oneshot(request(Some("185.71.76.10:443"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn forged_forwarding_header_from_unlisted_peer_is_forbidden() {
        let response = app(behind_proxy())
            .oneshot(request(
                Some("203.0.113.9:4444"),
                Some(("X-Forwarded-For", "185.71.76.10")),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn listed_client_behind_trusted_proxy_is_allowed() {
        let response = app(behind_proxy())
            .oneshot(request(
                Some("10.0.0.2:51000"),
                Some(("X-Forwarded-For", "185.71.76.10")),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn rejects_request_without_known_source() {
        let response = app(behind_proxy())
            .oneshot(request(None, Some(("X-Real-IP", "185.71.76.10"))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
