pub mod health;
pub mod preview;
pub mod redirect;
pub mod verify;

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use std::net::SocketAddr;

use linkrift_shared::botdetect;
use linkrift_shared::types::{ClickEvent, LinkSnapshot};

use crate::AppState;

/// `302 Found` with a `Location` header -- the one redirect status the
/// data plane emits.
pub(crate) fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

/// Determine the real client IP, preferring common proxy headers.
pub(crate) fn extract_ip(headers: &HeaderMap, addr: SocketAddr) -> String {
    if let Some(xff) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(ip) = xff.split(',').next().map(str::trim) {
            if !ip.is_empty() {
                return ip.to_owned();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        if !real_ip.is_empty() {
            return real_ip.to_owned();
        }
    }

    addr.ip().to_string()
}

pub(crate) fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// Hand a click to the tracker unless the User-Agent classifies as a bot.
/// Never blocks; the tracker drops on overload.
pub(crate) fn track_if_human(
    state: &AppState,
    snapshot: &LinkSnapshot,
    headers: &HeaderMap,
    addr: SocketAddr,
) {
    let user_agent = header_str(headers, "user-agent");
    if botdetect::is_bot(user_agent) {
        return;
    }
    state.tracker.track(ClickEvent {
        link_id: snapshot.id,
        short_code: snapshot.short_code.clone(),
        ip: extract_ip(headers, addr),
        user_agent: user_agent.to_owned(),
        referer: header_str(headers, "referer").to_owned(),
        timestamp: Utc::now(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwarded_header_wins_over_socket_addr() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        let addr: SocketAddr = "127.0.0.1:9999".parse().unwrap();
        assert_eq!(extract_ip(&headers, addr), "203.0.113.9");
    }

    #[test]
    fn socket_addr_is_the_fallback() {
        let headers = HeaderMap::new();
        let addr: SocketAddr = "192.0.2.4:1234".parse().unwrap();
        assert_eq!(extract_ip(&headers, addr), "192.0.2.4");
    }
}
