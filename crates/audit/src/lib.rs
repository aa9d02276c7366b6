//! `verihire-audit` — tamper-evident audit trail + security event records.
//!
//! Two complementary, append-only histories:
//! - [`AuditEntry`]: before/after state and actor metadata for every mutation.
//! - [`SecurityEvent`]: suspicious or violating activity, independent of the
//!   audit trail, with an explicit administrative resolution projection.
//!
//! Rows are created exactly once by the component observing the event and are
//! never mutated afterwards, except a security event's resolution fields.
//! Store ports live in [`store`]; implementations live in `verihire-infra`.

pub mod event;
pub mod log;
pub mod store;

pub use event::{ResolveError, SecurityEvent, SecurityEventKind, Severity};
pub use log::{changed_fields, ActorMeta, AuditAction, AuditEntry, EntityRef};
pub use store::{
    AuditLogFilter, AuditLogStore, AuditStoreError, SecurityEventFilter, SecurityEventStore,
};
