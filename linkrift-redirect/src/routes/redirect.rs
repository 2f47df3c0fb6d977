use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;

use linkrift_shared::license::Feature;

use crate::pages::{self, ErrorPage};
use crate::routes::{found, header_str, track_if_human};
use crate::rules;
use crate::AppState;

/// Short codes that must never resolve; browsers request them constantly.
const RESERVED_CODES: &[&str] = &["favicon.ico", "robots.txt"];

pub(crate) fn unlock_cookie_name(short_code: &str) -> String {
    format!("lr_auth_{short_code}")
}

/// `GET /:short_code` -- the redirect hot path.
///
/// Policy order: reserved → resolve → active → expiry → click limit →
/// password gate → rules → track (humans only) → `302 Found`.
pub async fn redirect(
    State(state): State<Arc<AppState>>,
    Path(short_code): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Response {
    if RESERVED_CODES.contains(&short_code.as_str()) {
        return StatusCode::NOT_FOUND.into_response();
    }

    let snapshot = match state.resolver.resolve(&short_code).await {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => return pages::render_error(ErrorPage::NotFound),
        Err(e) => {
            tracing::error!(short_code = %short_code, error = %e, "resolve failed");
            return pages::render_error(ErrorPage::Internal);
        }
    };

    if !snapshot.is_active {
        return pages::render_error(ErrorPage::Disabled);
    }
    if snapshot.is_expired(Utc::now()) {
        return pages::render_error(ErrorPage::Expired);
    }
    if snapshot.is_over_limit() {
        return pages::render_error(ErrorPage::LimitReached);
    }

    if snapshot.has_password {
        let unlocked = jar
            .get(&unlock_cookie_name(&short_code))
            .map(|cookie| cookie.value() == "1")
            .unwrap_or(false);
        if !unlocked {
            // The gate page itself is not a visit; nothing is tracked.
            return pages::render_password_page(&short_code, None);
        }
    }

    let destination = resolve_destination(&state, &snapshot, header_str(&headers, "user-agent"));

    track_if_human(&state, &snapshot, &headers, addr);

    found(destination)
}

/// Pick the rule-engine destination when one matches, the snapshot's
/// otherwise. Rules still apply to bot traffic (deterministic routing).
pub(crate) fn resolve_destination<'a>(
    state: &AppState,
    snapshot: &'a linkrift_shared::types::LinkSnapshot,
    user_agent: &str,
) -> &'a str {
    if !snapshot.rules.is_empty() && state.license.has_feature(Feature::LinkRules) {
        if let Some(destination) = rules::apply_rules(&snapshot.rules, user_agent) {
            return destination;
        }
    }
    &snapshot.destination_url
}
