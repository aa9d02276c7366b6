//! `verihire-infra` — store implementations and background plumbing.
//!
//! Every port defined by the domain crates gets two implementations here: an
//! in-memory twin for tests and development, and a Postgres-backed one for
//! production. The Redis counter store is compiled in behind the `redis`
//! feature. Bulk import jobs and outbound mail also live here; they are
//! infrastructure concerns the domain crates only see through ports.

pub mod jobs;
pub mod mail;
pub mod memory;
pub mod postgres;

#[cfg(feature = "redis")]
pub mod redis_counters;

#[cfg(test)]
mod integration_tests;

pub use jobs::{BulkJob, EmployeeBulkImporter, EmployeeRow, InMemoryJobStore, JobId, JobStatus, RowError};
pub use mail::{LogMailSender, MailError, MailSender};
pub use memory::{
    InMemoryAuditLogStore, InMemoryCounterStore, InMemoryDirectoryStore,
    InMemorySecurityEventStore, InMemorySessionStore, InMemoryUserDirectory,
};
pub use postgres::{
    ensure_schema, PostgresAuditLogStore, PostgresCounterStore, PostgresDirectoryStore,
    PostgresSecurityEventStore,
};

#[cfg(feature = "redis")]
pub use redis_counters::RedisCounterStore;
