//! Request/response DTOs and JSON mapping helpers.
//!
//! Employee responses are the only place stored PII is decrypted; every
//! other surface (audit payloads included) carries the stored tokens.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use verihire_directory::{Company, Department, Employee, EmployeePosition};
use verihire_infra::jobs::BulkJob;
use verihire_pii::FieldCipher;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CompanyRequest {
    pub name: String,
    pub registration_number: String,
    pub registration_date: NaiveDate,
    pub address: String,
    pub contact_person: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DepartmentRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct EmployeeRequest {
    pub company_id: String,
    pub name: String,
    #[serde(default)]
    pub employee_ref: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct EmployeeUpdateRequest {
    pub name: String,
    #[serde(default)]
    pub employee_ref: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct PositionRequest {
    pub title: String,
    #[serde(default)]
    pub duties: Option<String>,
    pub start_date: NaiveDate,
    pub employment_type: String,
    #[serde(default)]
    pub department_id: Option<String>,
    #[serde(default)]
    pub salary_cents: Option<i64>,
    /// End date written onto the superseded current position.
    #[serde(default)]
    pub end_prior_on: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct BulkImportRow {
    pub name: String,
    #[serde(default)]
    pub employee_ref: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct BulkImportRequest {
    pub company_id: String,
    pub rows: Vec<BulkImportRow>,
    #[serde(default)]
    pub notify_email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

pub fn company_to_json(company: &Company) -> JsonValue {
    json!({
        "id": company.id.to_string(),
        "name": company.name,
        "registration_number": company.registration_number,
        "registration_date": company.registration_date,
        "address": company.address,
        "contact_person": company.contact_person,
        "email": company.email,
        "phone": company.phone,
        "employee_count": company.employee_count,
        "created_at": company.created_at,
        "updated_at": company.updated_at,
    })
}

pub fn department_to_json(department: &Department) -> JsonValue {
    json!({
        "id": department.id.to_string(),
        "company_id": department.company.to_string(),
        "name": department.name,
        "created_at": department.created_at,
    })
}

pub fn employee_to_json(employee: &Employee, cipher: &FieldCipher) -> JsonValue {
    let pii = employee.pii(cipher);
    json!({
        "id": employee.id.to_string(),
        "company_id": employee.company.to_string(),
        "name": pii.name,
        "employee_ref": pii.employee_ref,
        "email": pii.email,
        "phone": pii.phone,
        "is_active": employee.is_active,
        "date_joined": employee.date_joined,
        "created_at": employee.created_at,
        "updated_at": employee.updated_at,
    })
}

pub fn position_to_json(position: &EmployeePosition) -> JsonValue {
    json!({
        "id": position.id.to_string(),
        "employee_id": position.employee.to_string(),
        "department_id": position.department.map(|d| d.to_string()),
        "title": position.title,
        "duties": position.duties,
        "start_date": position.start_date,
        "end_date": position.end_date,
        "is_current": position.is_current,
        "employment_type": position.employment_type.as_str(),
        "salary_cents": position.salary_cents,
        "created_at": position.created_at,
    })
}

pub fn job_to_json(job: &BulkJob) -> JsonValue {
    json!({
        "id": job.id.to_string(),
        "company_id": job.company.to_string(),
        "operation": job.operation,
        "status": job.status,
        "total_rows": job.total_rows,
        "processed_rows": job.processed_rows,
        "succeeded": job.succeeded,
        "errors": job.errors,
    })
}
