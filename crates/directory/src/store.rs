//! Store port for tenant directory data.
//!
//! Mutation methods take the [`AuditEntry`] describing the change so that
//! implementations persist the audit row in the same transaction as the
//! mutation itself. A mutation either lands together with its audit row or
//! not at all.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use verihire_audit::AuditEntry;
use verihire_core::{DomainError, EmployeeId, PositionId, TenantId};

use crate::company::{Company, Department};
use crate::employee::Employee;
use crate::position::EmployeePosition;

#[derive(Debug, Error)]
pub enum DirectoryStoreError {
    #[error("duplicate {0}")]
    Duplicate(String),

    #[error("not found")]
    NotFound,

    #[error("storage failure: {0}")]
    Storage(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Query filter for employee listings; always tenant-scoped.
#[derive(Debug, Clone)]
pub struct EmployeeFilter {
    pub company: TenantId,
    pub active_only: bool,
    pub limit: Option<usize>,
}

impl EmployeeFilter {
    pub fn for_company(company: TenantId) -> Self {
        Self {
            company,
            active_only: false,
            limit: None,
        }
    }
}

/// Directory persistence port.
///
/// Companies are unique by registration number; employees belong to exactly
/// one company; at most one position per employee is current.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn create_company(
        &self,
        company: Company,
        audit: AuditEntry,
    ) -> Result<TenantId, DirectoryStoreError>;

    async fn update_company(
        &self,
        company: Company,
        audit: AuditEntry,
    ) -> Result<(), DirectoryStoreError>;

    async fn get_company(&self, id: TenantId) -> Result<Company, DirectoryStoreError>;

    async fn list_companies(&self) -> Result<Vec<Company>, DirectoryStoreError>;

    async fn create_department(
        &self,
        department: Department,
        audit: AuditEntry,
    ) -> Result<(), DirectoryStoreError>;

    async fn list_departments(
        &self,
        company: TenantId,
    ) -> Result<Vec<Department>, DirectoryStoreError>;

    async fn create_employee(
        &self,
        employee: Employee,
        audit: AuditEntry,
    ) -> Result<EmployeeId, DirectoryStoreError>;

    async fn update_employee(
        &self,
        employee: Employee,
        audit: AuditEntry,
    ) -> Result<(), DirectoryStoreError>;

    async fn delete_employee(
        &self,
        id: EmployeeId,
        audit: AuditEntry,
    ) -> Result<(), DirectoryStoreError>;

    async fn get_employee(&self, id: EmployeeId) -> Result<Employee, DirectoryStoreError>;

    async fn list_employees(
        &self,
        filter: EmployeeFilter,
    ) -> Result<Vec<Employee>, DirectoryStoreError>;

    /// Insert a new position and demote the employee's prior current one, if
    /// any, to `end_prior_on`. Both writes and the audit row commit together.
    async fn assign_position(
        &self,
        position: EmployeePosition,
        end_prior_on: NaiveDate,
        audit: AuditEntry,
    ) -> Result<PositionId, DirectoryStoreError>;

    async fn positions_for(
        &self,
        employee: EmployeeId,
    ) -> Result<Vec<EmployeePosition>, DirectoryStoreError>;

    async fn current_position(
        &self,
        employee: EmployeeId,
    ) -> Result<Option<EmployeePosition>, DirectoryStoreError>;
}

#[async_trait]
impl<S> DirectoryStore for Arc<S>
where
    S: DirectoryStore + ?Sized,
{
    async fn create_company(
        &self,
        company: Company,
        audit: AuditEntry,
    ) -> Result<TenantId, DirectoryStoreError> {
        (**self).create_company(company, audit).await
    }

    async fn update_company(
        &self,
        company: Company,
        audit: AuditEntry,
    ) -> Result<(), DirectoryStoreError> {
        (**self).update_company(company, audit).await
    }

    async fn get_company(&self, id: TenantId) -> Result<Company, DirectoryStoreError> {
        (**self).get_company(id).await
    }

    async fn list_companies(&self) -> Result<Vec<Company>, DirectoryStoreError> {
        (**self).list_companies().await
    }

    async fn create_department(
        &self,
        department: Department,
        audit: AuditEntry,
    ) -> Result<(), DirectoryStoreError> {
        (**self).create_department(department, audit).await
    }

    async fn list_departments(
        &self,
        company: TenantId,
    ) -> Result<Vec<Department>, DirectoryStoreError> {
        (**self).list_departments(company).await
    }

    async fn create_employee(
        &self,
        employee: Employee,
        audit: AuditEntry,
    ) -> Result<EmployeeId, DirectoryStoreError> {
        (**self).create_employee(employee, audit).await
    }

    async fn update_employee(
        &self,
        employee: Employee,
        audit: AuditEntry,
    ) -> Result<(), DirectoryStoreError> {
        (**self).update_employee(employee, audit).await
    }

    async fn delete_employee(
        &self,
        id: EmployeeId,
        audit: AuditEntry,
    ) -> Result<(), DirectoryStoreError> {
        (**self).delete_employee(id, audit).await
    }

    async fn get_employee(&self, id: EmployeeId) -> Result<Employee, DirectoryStoreError> {
        (**self).get_employee(id).await
    }

    async fn list_employees(
        &self,
        filter: EmployeeFilter,
    ) -> Result<Vec<Employee>, DirectoryStoreError> {
        (**self).list_employees(filter).await
    }

    async fn assign_position(
        &self,
        position: EmployeePosition,
        end_prior_on: NaiveDate,
        audit: AuditEntry,
    ) -> Result<PositionId, DirectoryStoreError> {
        (**self).assign_position(position, end_prior_on, audit).await
    }

    async fn positions_for(
        &self,
        employee: EmployeeId,
    ) -> Result<Vec<EmployeePosition>, DirectoryStoreError> {
        (**self).positions_for(employee).await
    }

    async fn current_position(
        &self,
        employee: EmployeeId,
    ) -> Result<Option<EmployeePosition>, DirectoryStoreError> {
        (**self).current_position(employee).await
    }
}
