use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use verihire_core::{DomainError, LockReason, SecurityError};
use verihire_directory::DirectoryStoreError;
use verihire_security::credentials::LoginError;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn security_error_to_response(err: SecurityError) -> axum::response::Response {
    match err {
        SecurityError::RateLimitExceeded { .. } => {
            json_error(StatusCode::TOO_MANY_REQUESTS, "rate_limited", err.to_string())
        }
        SecurityError::AuthenticationFailed => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", err.to_string())
        }
        SecurityError::AccountLocked {
            reason: LockReason::TooManyAttempts,
        } => json_error(StatusCode::TOO_MANY_REQUESTS, "account_locked", err.to_string()),
        SecurityError::AccountLocked {
            reason: LockReason::Deactivated,
        } => json_error(StatusCode::FORBIDDEN, "account_deactivated", err.to_string()),
        SecurityError::AuthorizationDenied => {
            json_error(StatusCode::FORBIDDEN, "permission_denied", err.to_string())
        }
        SecurityError::DuplicateResource(_) => {
            json_error(StatusCode::CONFLICT, "duplicate", err.to_string())
        }
    }
}

pub fn login_error_to_response(err: LoginError) -> axum::response::Response {
    match err {
        LoginError::Denied(err) => security_error_to_response(err),
        LoginError::Storage(msg) => {
            tracing::error!(error = %msg, "login storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "storage failure")
        }
    }
}

pub fn directory_error_to_response(err: DirectoryStoreError) -> axum::response::Response {
    match err {
        DirectoryStoreError::Duplicate(what) => {
            json_error(StatusCode::CONFLICT, "duplicate", format!("duplicate {what}"))
        }
        DirectoryStoreError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DirectoryStoreError::Domain(err) => domain_error_to_response(err),
        DirectoryStoreError::Storage(msg) => {
            tracing::error!(error = %msg, "directory storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "storage failure")
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}
