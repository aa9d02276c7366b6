use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row, Transaction};
use uuid::Uuid;

use verihire_audit::AuditEntry;
use verihire_core::{DepartmentId, EmployeeId, PositionId, TenantId, UserId};
use verihire_directory::position::EmploymentType;
use verihire_directory::store::{DirectoryStore, DirectoryStoreError, EmployeeFilter};
use verihire_directory::{Company, Department, Employee, EmployeePosition};
use verihire_pii::EncryptedText;

use super::audit::PostgresAuditLogStore;
use super::is_unique_violation;

fn storage(err: impl std::fmt::Display) -> DirectoryStoreError {
    DirectoryStoreError::Storage(err.to_string())
}

fn map_insert_error(err: sqlx::Error, what: &str) -> DirectoryStoreError {
    if is_unique_violation(&err) {
        DirectoryStoreError::Duplicate(what.to_string())
    } else {
        storage(err)
    }
}

fn company_from_row(row: &PgRow) -> Company {
    Company {
        id: TenantId::from_uuid(row.get("id")),
        name: row.get("name"),
        registration_number: row.get("registration_number"),
        registration_date: row.get("registration_date"),
        address: row.get("address"),
        contact_person: row.get("contact_person"),
        email: row.get("email"),
        phone: row.get("phone"),
        employee_count: row.get::<i64, _>("employee_count") as u32,
        created_by: row.get::<Option<Uuid>, _>("created_by").map(UserId::from_uuid),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn employee_from_row(row: &PgRow) -> Employee {
    Employee {
        id: EmployeeId::from_uuid(row.get("id")),
        company: TenantId::from_uuid(row.get("company")),
        name: EncryptedText::from_stored(row.get::<String, _>("name")),
        employee_ref: EncryptedText::from_stored(row.get::<String, _>("employee_ref")),
        email: EncryptedText::from_stored(row.get::<String, _>("email")),
        phone: EncryptedText::from_stored(row.get::<String, _>("phone")),
        is_active: row.get("is_active"),
        date_joined: row.get("date_joined"),
        created_by: row.get::<Option<Uuid>, _>("created_by").map(UserId::from_uuid),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn position_from_row(row: &PgRow) -> Result<EmployeePosition, DirectoryStoreError> {
    let employment_type: String = row.get("employment_type");
    Ok(EmployeePosition {
        id: PositionId::from_uuid(row.get("id")),
        employee: EmployeeId::from_uuid(row.get("employee")),
        department: row
            .get::<Option<Uuid>, _>("department")
            .map(DepartmentId::from_uuid),
        title: row.get("title"),
        duties: row.get("duties"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        is_current: row.get("is_current"),
        employment_type: EmploymentType::parse(&employment_type)
            .map_err(DirectoryStoreError::Domain)?,
        salary_cents: row.get("salary_cents"),
        created_by: row.get::<Option<Uuid>, _>("created_by").map(UserId::from_uuid),
        created_at: row.get("created_at"),
    })
}

/// Postgres-backed directory store.
///
/// Each audited mutation runs in one transaction together with its audit
/// row; partial outcomes cannot be observed.
#[derive(Debug, Clone)]
pub struct PostgresDirectoryStore {
    pool: Arc<PgPool>,
}

impl PostgresDirectoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    async fn finish(
        mut tx: Transaction<'_, sqlx::Postgres>,
        audit: &AuditEntry,
    ) -> Result<(), DirectoryStoreError> {
        PostgresAuditLogStore::insert_in_tx(&mut tx, audit)
            .await
            .map_err(storage)?;
        tx.commit().await.map_err(storage)
    }
}

#[async_trait]
impl DirectoryStore for PostgresDirectoryStore {
    async fn create_company(
        &self,
        company: Company,
        audit: AuditEntry,
    ) -> Result<TenantId, DirectoryStoreError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;
        sqlx::query(
            r#"
            INSERT INTO companies (
                id, name, registration_number, registration_date, address,
                contact_person, email, phone, employee_count, created_by,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(company.id.as_uuid())
        .bind(&company.name)
        .bind(&company.registration_number)
        .bind(company.registration_date)
        .bind(&company.address)
        .bind(&company.contact_person)
        .bind(&company.email)
        .bind(&company.phone)
        .bind(company.employee_count as i64)
        .bind(company.created_by.map(|u| *u.as_uuid()))
        .bind(company.created_at)
        .bind(company.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_insert_error(e, "company registration number"))?;

        Self::finish(tx, &audit).await?;
        Ok(company.id)
    }

    async fn update_company(
        &self,
        company: Company,
        audit: AuditEntry,
    ) -> Result<(), DirectoryStoreError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;
        let result = sqlx::query(
            r#"
            UPDATE companies SET
                name = $2, registration_number = $3, registration_date = $4,
                address = $5, contact_person = $6, email = $7, phone = $8,
                updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(company.id.as_uuid())
        .bind(&company.name)
        .bind(&company.registration_number)
        .bind(company.registration_date)
        .bind(&company.address)
        .bind(&company.contact_person)
        .bind(&company.email)
        .bind(&company.phone)
        .bind(company.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_insert_error(e, "company registration number"))?;

        if result.rows_affected() == 0 {
            return Err(DirectoryStoreError::NotFound);
        }
        Self::finish(tx, &audit).await
    }

    async fn get_company(&self, id: TenantId) -> Result<Company, DirectoryStoreError> {
        let row = sqlx::query("SELECT * FROM companies WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(self.pool.as_ref())
            .await
            .map_err(storage)?
            .ok_or(DirectoryStoreError::NotFound)?;
        Ok(company_from_row(&row))
    }

    async fn list_companies(&self) -> Result<Vec<Company>, DirectoryStoreError> {
        let rows = sqlx::query("SELECT * FROM companies ORDER BY name")
            .fetch_all(self.pool.as_ref())
            .await
            .map_err(storage)?;
        Ok(rows.iter().map(company_from_row).collect())
    }

    async fn create_department(
        &self,
        department: Department,
        audit: AuditEntry,
    ) -> Result<(), DirectoryStoreError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;
        sqlx::query(
            "INSERT INTO departments (id, company, name, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(department.id.as_uuid())
        .bind(department.company.as_uuid())
        .bind(&department.name)
        .bind(department.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_insert_error(e, "department"))?;
        Self::finish(tx, &audit).await
    }

    async fn list_departments(
        &self,
        company: TenantId,
    ) -> Result<Vec<Department>, DirectoryStoreError> {
        let rows = sqlx::query("SELECT * FROM departments WHERE company = $1 ORDER BY name")
            .bind(company.as_uuid())
            .fetch_all(self.pool.as_ref())
            .await
            .map_err(storage)?;
        Ok(rows
            .iter()
            .map(|row| Department {
                id: DepartmentId::from_uuid(row.get("id")),
                company: TenantId::from_uuid(row.get("company")),
                name: row.get("name"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    async fn create_employee(
        &self,
        employee: Employee,
        audit: AuditEntry,
    ) -> Result<EmployeeId, DirectoryStoreError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;
        sqlx::query(
            r#"
            INSERT INTO employees (
                id, company, name, employee_ref, email, phone, is_active,
                date_joined, created_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(employee.id.as_uuid())
        .bind(employee.company.as_uuid())
        .bind(employee.name.as_stored())
        .bind(employee.employee_ref.as_stored())
        .bind(employee.email.as_stored())
        .bind(employee.phone.as_stored())
        .bind(employee.is_active)
        .bind(employee.date_joined)
        .bind(employee.created_by.map(|u| *u.as_uuid()))
        .bind(employee.created_at)
        .bind(employee.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_insert_error(e, "employee"))?;

        sqlx::query("UPDATE companies SET employee_count = employee_count + 1 WHERE id = $1")
            .bind(employee.company.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(storage)?;

        Self::finish(tx, &audit).await?;
        Ok(employee.id)
    }

    async fn update_employee(
        &self,
        employee: Employee,
        audit: AuditEntry,
    ) -> Result<(), DirectoryStoreError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;
        let result = sqlx::query(
            r#"
            UPDATE employees SET
                name = $2, employee_ref = $3, email = $4, phone = $5,
                is_active = $6, updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(employee.id.as_uuid())
        .bind(employee.name.as_stored())
        .bind(employee.employee_ref.as_stored())
        .bind(employee.email.as_stored())
        .bind(employee.phone.as_stored())
        .bind(employee.is_active)
        .bind(employee.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        if result.rows_affected() == 0 {
            return Err(DirectoryStoreError::NotFound);
        }
        Self::finish(tx, &audit).await
    }

    async fn delete_employee(
        &self,
        id: EmployeeId,
        audit: AuditEntry,
    ) -> Result<(), DirectoryStoreError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;
        let row = sqlx::query("DELETE FROM employees WHERE id = $1 RETURNING company")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(storage)?
            .ok_or(DirectoryStoreError::NotFound)?;

        let company: Uuid = row.get("company");
        sqlx::query(
            "UPDATE companies SET employee_count = GREATEST(employee_count - 1, 0) WHERE id = $1",
        )
        .bind(company)
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        Self::finish(tx, &audit).await
    }

    async fn get_employee(&self, id: EmployeeId) -> Result<Employee, DirectoryStoreError> {
        let row = sqlx::query("SELECT * FROM employees WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(self.pool.as_ref())
            .await
            .map_err(storage)?
            .ok_or(DirectoryStoreError::NotFound)?;
        Ok(employee_from_row(&row))
    }

    async fn list_employees(
        &self,
        filter: EmployeeFilter,
    ) -> Result<Vec<Employee>, DirectoryStoreError> {
        let limit = filter.limit.unwrap_or(500) as i64;
        let rows = sqlx::query(
            r#"
            SELECT * FROM employees
            WHERE company = $1 AND ($2 = FALSE OR is_active)
            ORDER BY created_at
            LIMIT $3
            "#,
        )
        .bind(filter.company.as_uuid())
        .bind(filter.active_only)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(storage)?;
        Ok(rows.iter().map(employee_from_row).collect())
    }

    async fn assign_position(
        &self,
        position: EmployeePosition,
        end_prior_on: NaiveDate,
        audit: AuditEntry,
    ) -> Result<PositionId, DirectoryStoreError> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        sqlx::query(
            r#"
            UPDATE employee_positions SET
                is_current = FALSE,
                end_date = COALESCE(end_date, $2)
            WHERE employee = $1 AND is_current
            "#,
        )
        .bind(position.employee.as_uuid())
        .bind(end_prior_on)
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        sqlx::query(
            r#"
            INSERT INTO employee_positions (
                id, employee, department, title, duties, start_date, end_date,
                is_current, employment_type, salary_cents, created_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(position.id.as_uuid())
        .bind(position.employee.as_uuid())
        .bind(position.department.map(|d| *d.as_uuid()))
        .bind(&position.title)
        .bind(&position.duties)
        .bind(position.start_date)
        .bind(position.end_date)
        .bind(position.is_current)
        .bind(position.employment_type.as_str())
        .bind(position.salary_cents)
        .bind(position.created_by.map(|u| *u.as_uuid()))
        .bind(position.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_insert_error(e, "employee position"))?;

        Self::finish(tx, &audit).await?;
        Ok(position.id)
    }

    async fn positions_for(
        &self,
        employee: EmployeeId,
    ) -> Result<Vec<EmployeePosition>, DirectoryStoreError> {
        let rows = sqlx::query(
            "SELECT * FROM employee_positions WHERE employee = $1 ORDER BY start_date DESC",
        )
        .bind(employee.as_uuid())
        .fetch_all(self.pool.as_ref())
        .await
        .map_err(storage)?;
        rows.iter().map(position_from_row).collect()
    }

    async fn current_position(
        &self,
        employee: EmployeeId,
    ) -> Result<Option<EmployeePosition>, DirectoryStoreError> {
        let row = sqlx::query(
            "SELECT * FROM employee_positions WHERE employee = $1 AND is_current LIMIT 1",
        )
        .bind(employee.as_uuid())
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(storage)?;
        row.as_ref().map(position_from_row).transpose()
    }
}
