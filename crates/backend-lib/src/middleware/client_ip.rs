// crates/backend-lib/src/middleware/client_ip.rs

use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    middleware::Next,
    response::Response,
};

use crate::AppState;

/// Address of the client, when it could be determined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub Option<IpAddr>);

/// Record the client address as a [`ClientIp`] request extension.
///
/// The socket peer address is used unless `trust_proxy_headers` is set, in
/// which case `X-Real-IP` from the reverse proxy wins.
pub async fn client_ip(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();

    let forwarded = if state.orchestrator.settings().trust_proxy_headers {
        parts
            .headers
            .get("x-real-ip")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.trim().parse::<IpAddr>().ok())
    } else {
        None
    };
    let peer = ConnectInfo::<SocketAddr>::from_request_parts(&mut parts, &state)
        .await
        .ok()
        .map(|ConnectInfo(addr)| addr.ip());

    parts.extensions.insert(ClientIp(forwarded.or(peer)));
    next.run(Request::from_parts(parts, body)).await
}
