//! In-memory store twins for tests and development.
//!
//! Behaviorally equivalent to the Postgres implementations; mutations that
//! carry an audit entry apply both under the store's write lock so a caller
//! never observes one without the other.

pub mod audit;
pub mod counters;
pub mod directory;
pub mod sessions;
pub mod users;

pub use audit::{InMemoryAuditLogStore, InMemorySecurityEventStore};
pub use counters::InMemoryCounterStore;
pub use directory::InMemoryDirectoryStore;
pub use sessions::InMemorySessionStore;
pub use users::InMemoryUserDirectory;
