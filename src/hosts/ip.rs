use axum::extract::ConnectInfo;
use axum::http::HeaderMap;
use axum::routing::get;
use axum::Router;
use std::net::{IpAddr, SocketAddr};

pub fn routes(router: Router) -> Router {
    router.route("/", get(caller_ip))
}

#[allow(clippy::unused_async)]
async fn caller_ip(ConnectInfo(peer): ConnectInfo<SocketAddr>, headers: HeaderMap) -> String {
    format!("{}\n", real_ip(&headers, peer))
}

/// The client address as reported by a proxy in front of us, or the peer address.
#[must_use]
pub fn real_ip(headers: &HeaderMap, peer: SocketAddr) -> IpAddr {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next());
    let real = headers.get("x-real-ip").and_then(|v| v.to_str().ok());
    forwarded
        .into_iter()
        .chain(real)
        .find_map(|v| v.trim().parse().ok())
        .unwrap_or_else(|| peer.ip())
}
