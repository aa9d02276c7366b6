//! Bulk import jobs.
//!
//! Row parsing happens upstream; the importer consumes already-parsed rows,
//! creates employee records one by one, tracks per-row failures on the job,
//! and finalizes with a bulk-import audit entry and an optional completion
//! mail.

pub mod importer;
pub mod store;
pub mod types;

pub use importer::{EmployeeBulkImporter, EmployeeRow};
pub use store::{InMemoryJobStore, JobStore, JobStoreError};
pub use types::{BulkJob, JobId, JobStatus, RowError};
