use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{service}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E1xxx: Redirect errors
/// - E2xxx: Click-processing errors
/// - E3xxx: Webhook errors
/// - E4xxx: License errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    ServiceUnavailable,
    BadRequest,

    // Redirect (E1xxx)
    LinkNotFound,
    LinkDisabled,
    LinkExpired,
    LinkLimitReached,
    PasswordRequired,
    PasswordIncorrect,

    // Clicks (E2xxx)
    EventDecodeFailed,

    // Webhooks (E3xxx)
    WebhookNotFound,
    WebhookDisabled,
    DeliveryNotFound,

    // License (E4xxx)
    LicenseInvalid,
    LicenseExpired,
    FeatureNotLicensed,
    LimitExceeded,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::ServiceUnavailable => "E0006",
            Self::BadRequest => "E0007",

            // Redirect
            Self::LinkNotFound => "E1001",
            Self::LinkDisabled => "E1002",
            Self::LinkExpired => "E1003",
            Self::LinkLimitReached => "E1004",
            Self::PasswordRequired => "E1005",
            Self::PasswordIncorrect => "E1006",

            // Clicks
            Self::EventDecodeFailed => "E2001",

            // Webhooks
            Self::WebhookNotFound => "E3001",
            Self::WebhookDisabled => "E3002",
            Self::DeliveryNotFound => "E3003",

            // License
            Self::LicenseInvalid => "E4001",
            Self::LicenseExpired => "E4002",
            Self::FeatureNotLicensed => "E4003",
            Self::LimitExceeded => "E4004",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError | Self::ServiceUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError | Self::BadRequest | Self::EventDecodeFailed => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound | Self::LinkNotFound | Self::WebhookNotFound
            | Self::DeliveryNotFound => StatusCode::NOT_FOUND,
            Self::LinkDisabled | Self::LinkExpired | Self::LinkLimitReached => StatusCode::GONE,
            Self::Unauthorized | Self::PasswordRequired | Self::PasswordIncorrect
            | Self::LicenseInvalid | Self::LicenseExpired => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::FeatureNotLicensed | Self::WebhookDisabled => {
                StatusCode::FORBIDDEN
            }
            Self::LimitExceeded => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known {
                code,
                message,
                details,
            } => {
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (code.status_code(), resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                match err {
                    diesel::result::Error::NotFound => (
                        StatusCode::NOT_FOUND,
                        ApiErrorResponse::new("E0003", "resource not found"),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiErrorResponse::new("E0001", "database error"),
                    ),
                }
            }
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_taxonomy_maps_to_the_documented_statuses() {
        assert_eq!(ErrorCode::LinkNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::LinkDisabled.status_code(), StatusCode::GONE);
        assert_eq!(ErrorCode::LinkExpired.status_code(), StatusCode::GONE);
        assert_eq!(ErrorCode::LinkLimitReached.status_code(), StatusCode::GONE);
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(ErrorCode::LinkNotFound.code(), "E1001");
        assert_eq!(ErrorCode::LicenseInvalid.code(), "E4001");
    }
}
