use std::net::SocketAddr;
use std::sync::Arc;

use argon2::password_hash::PasswordHash;
use argon2::{Argon2, PasswordVerifier};
use axum::extract::{ConnectInfo, Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Form;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;

use crate::models::VerifyForm;
use crate::pages::{self, ErrorPage};
use crate::ratelimit;
use crate::routes::redirect::{resolve_destination, unlock_cookie_name};
use crate::routes::{found, header_str, track_if_human};
use crate::AppState;

/// `POST /:short_code/verify` -- password-gate submission.
///
/// A wrong password re-renders the form at `200` so the response shape
/// never leaks whether the code or the password was at fault; a match sets
/// the unlock cookie and redirects.
pub async fn verify(
    State(state): State<Arc<AppState>>,
    Path(short_code): Path<String>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    jar: CookieJar,
    headers: HeaderMap,
    Form(form): Form<VerifyForm>,
) -> Response {
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

    let destination =
        resolve_destination(&state, &snapshot, header_str(&headers, "user-agent")).to_owned();

    if !snapshot.has_password {
        // The gate was removed between form render and submit.
        track_if_human(&state, &snapshot, &headers, addr);
        return found(&destination);
    }

    let Some(password_hash) = snapshot.password_hash.as_deref() else {
        tracing::error!(short_code = %short_code, "password-gated link has no stored hash");
        return pages::render_error(ErrorPage::Internal);
    };

    let ip = crate::routes::extract_ip(&headers, addr);
    if !ratelimit::allow_verify_attempt(&state.redis, &ip, state.config.verify_rpm).await {
        return pages::render_password_page(&short_code, Some("Too many attempts, please wait a minute"));
    }

    if !verify_password(&form.password, password_hash) {
        return pages::render_password_page(&short_code, Some("Incorrect password"));
    }

    track_if_human(&state, &snapshot, &headers, addr);

    let cookie = Cookie::build((unlock_cookie_name(&short_code), "1"))
        .path(format!("/{short_code}"))
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    let jar = jar.add(cookie);

    (jar, found(&destination)).into_response()
}

/// Argon2id verification; the PHC string comes from the management plane.
fn verify_password(password: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::error!(error = %e, "stored password hash is not a valid PHC string");
            return false;
        }
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    // argon2id hash of "hunter2" generated by the management plane's hasher.
    const HUNTER2_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$L5zfY1AlDaFpWA1qgXxHnw$leoLz8iJxS/nXMe09PbzH5TzOUFh1hwjJQZBsaBxXSY";

    #[test]
    fn correct_password_verifies() {
        assert!(verify_password("hunter2", HUNTER2_HASH));
    }

    #[test]
    fn wrong_password_fails() {
        assert!(!verify_password("hunter3", HUNTER2_HASH));
        assert!(!verify_password("", HUNTER2_HASH));
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify_password("hunter2", "not-a-phc-string"));
    }

    #[test]
    fn unlock_cookie_is_scoped_per_code() {
        assert_eq!(unlock_cookie_name("abc"), "lr_auth_abc");
    }
}
