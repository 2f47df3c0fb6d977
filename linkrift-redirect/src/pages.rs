//! HTML pages the redirect plane renders itself: the policy error pages
//! and the password form. Text is deliberately bland -- no internals, no
//! echoes beyond what the visitor already typed.

use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPage {
    NotFound,
    Disabled,
    Expired,
    LimitReached,
    Internal,
}

impl ErrorPage {
    pub fn title(&self) -> &'static str {
        match self {
            Self::NotFound => "Link Not Found",
            Self::Disabled => "Link Disabled",
            Self::Expired => "Link Expired",
            Self::LimitReached => "Link Limit Reached",
            Self::Internal => "Something Went Wrong",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::NotFound => "The link you followed does not exist or has been removed.",
            Self::Disabled => "This link has been disabled by its owner.",
            Self::Expired => "This link has expired and is no longer available.",
            Self::LimitReached => "This link has reached its click limit.",
            Self::Internal => "An unexpected error occurred. Please try again later.",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Disabled | Self::Expired | Self::LimitReached => StatusCode::GONE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate<'a> {
    title: &'a str,
    message: &'a str,
}

#[derive(Template)]
#[template(path = "password.html")]
struct PasswordTemplate<'a> {
    short_code: &'a str,
    error: Option<&'a str>,
}

pub fn render_error(page: ErrorPage) -> Response {
    let template = ErrorTemplate {
        title: page.title(),
        message: page.message(),
    };
    match template.render() {
        Ok(body) => (page.status(), Html(body)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "error page render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
        }
    }
}

pub fn render_password_page(short_code: &str, error: Option<&str>) -> Response {
    let template = PasswordTemplate { short_code, error };
    match template.render() {
        Ok(body) => (StatusCode::OK, Html(body)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "password page render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_pages_carry_stable_titles() {
        let body = ErrorTemplate {
            title: ErrorPage::Expired.title(),
            message: ErrorPage::Expired.message(),
        }
        .render()
        .unwrap();
        assert!(body.contains("Link Expired"));

        assert_eq!(ErrorPage::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorPage::Disabled.status(), StatusCode::GONE);
        assert_eq!(ErrorPage::LimitReached.status(), StatusCode::GONE);
    }

    #[test]
    fn password_form_posts_to_the_verify_endpoint() {
        let body = PasswordTemplate {
            short_code: "abc",
            error: None,
        }
        .render()
        .unwrap();
        assert!(body.contains(r#"action="/abc/verify""#));
        assert!(body.contains(r#"name="password""#));
        assert!(!body.contains("Incorrect password"));
    }

    #[test]
    fn password_form_re_renders_with_the_error() {
        let body = PasswordTemplate {
            short_code: "abc",
            error: Some("Incorrect password"),
        }
        .render()
        .unwrap();
        assert!(body.contains("Incorrect password"));
    }
}
