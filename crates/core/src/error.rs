//! Shared error taxonomy.
//!
//! Two layers:
//! - [`DomainError`]: deterministic business/domain failures (validation,
//!   invariants, conflicts). Infrastructure concerns belong elsewhere.
//! - [`SecurityError`]: terminal outcomes of the request security pipeline
//!   (rate limiting, authentication, authorization). These map 1:1 onto the
//!   responses the HTTP layer surfaces and are never retried automatically.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,

    /// A conflict occurred (e.g. stale data, uniqueness collision).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}

/// Why an account is refusing logins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockReason {
    /// Too many failed attempts from the client IP inside the lockout window.
    TooManyAttempts,
    /// The account itself has been deactivated by an administrator.
    Deactivated,
}

impl LockReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            LockReason::TooManyAttempts => "locked",
            LockReason::Deactivated => "deactivated",
        }
    }
}

/// Terminal security-pipeline failure for a request.
///
/// Rate-limit and authorization failures are terminal for the request and
/// surfaced to the caller as the described kind. Decryption degradation is
/// deliberately *not* part of this taxonomy: ciphertext that cannot be read
/// falls back to the stored value (see `verihire-pii`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SecurityError {
    /// Over the fixed-window threshold for the request's limit class.
    #[error("rate limit exceeded for class '{class}'")]
    RateLimitExceeded { class: &'static str },

    /// Credentials did not match any active account.
    #[error("invalid credentials")]
    AuthenticationFailed,

    /// Lockout window active or account deactivated.
    #[error("account {}", reason.as_str())]
    AccountLocked { reason: LockReason },

    /// Role/tenant permission check failed.
    #[error("permission denied")]
    AuthorizationDenied,

    /// A uniqueness constraint collision (e.g. company registration number).
    #[error("duplicate resource: {0}")]
    DuplicateResource(String),
}
