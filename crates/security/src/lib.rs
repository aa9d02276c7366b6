//! `verihire-security` — the per-request security pipeline.
//!
//! Every request passes through, in order: context capture
//! ([`RequestContext`]), rate limiting ([`rate_limit`]), authentication
//! ([`credentials`] for logins, session validation otherwise) and
//! authorization (`verihire-auth`). [`SecurityPipeline`] is the single facade
//! the HTTP layer talks to.

pub mod context;
pub mod credentials;
pub mod pipeline;
pub mod rate_limit;

pub use context::RequestContext;
pub use credentials::{
    CredentialVerifier, LoginError, LoginOutcome, SessionError, TokenIssuer, UserDirectory,
    UserDirectoryError, UserRecord, LOCKOUT_THRESHOLD, LOCKOUT_WINDOW_SECS,
};
pub use pipeline::SecurityPipeline;
pub use rate_limit::{CounterError, CounterStore, LimitClass, RateLimiter, WINDOW_SECS};
