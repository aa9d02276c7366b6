//! `verihire-directory` — tenant data: companies, departments, employees and
//! employment positions.
//!
//! Employee PII attributes exist here only as [`verihire_pii::EncryptedText`];
//! plaintext is materialized transiently through [`employee::EmployeePii`].
//! The exactly-one-current-position invariant is enforced by
//! [`store::DirectoryStore::assign_position`], which demotes the prior current
//! position inside the same transaction as the new insert.

pub mod company;
pub mod employee;
pub mod position;
pub mod store;

pub use company::{Company, Department};
pub use employee::{Employee, EmployeePii};
pub use position::{EmployeePosition, EmploymentType};
pub use store::{DirectoryStore, DirectoryStoreError, EmployeeFilter};
