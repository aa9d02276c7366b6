//! Employee, position and bulk-import endpoints.
//!
//! PII is decrypted only when building a response body. Audit snapshots carry
//! the stored (encrypted) field values.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use verihire_audit::{AuditAction, AuditEntry, EntityRef};
use verihire_core::{EmployeeId, TenantId};
use verihire_directory::{Employee, EmployeePii, EmployeePosition, EmployeeFilter, EmploymentType};
use verihire_infra::jobs::{EmployeeRow, JobId, JobStoreError};
use verihire_security::RequestContext;

use crate::app::dto;
use crate::app::errors::{
    directory_error_to_response, domain_error_to_response, json_error, security_error_to_response,
};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create).get(list))
        .route("/bulk", post(bulk_import))
        .route("/bulk/:job_id", get(bulk_status))
        .route("/:id", get(retrieve).put(update).delete(destroy))
        .route("/:id/positions", post(assign_position).get(list_positions))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default)]
    company_id: Option<String>,
    #[serde(default)]
    active_only: bool,
    #[serde(default)]
    limit: Option<usize>,
}

fn parse_employee_id(raw: &str) -> Result<EmployeeId, axum::response::Response> {
    raw.parse::<EmployeeId>()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid employee id"))
}

fn parse_tenant_id(raw: &str) -> Result<TenantId, axum::response::Response> {
    raw.parse::<TenantId>()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid company id"))
}

fn require_principal(
    ctx: &RequestContext,
) -> Result<verihire_auth::Principal, axum::response::Response> {
    ctx.principal.clone().ok_or_else(|| {
        json_error(StatusCode::UNAUTHORIZED, "unauthorized", "missing session")
    })
}

async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<dto::EmployeeRequest>,
) -> axum::response::Response {
    let now = Utc::now();
    let principal = match require_principal(&ctx) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let company_id = match parse_tenant_id(&body.company_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let company = match services.directory.get_company(company_id).await {
        Ok(company) => company,
        Err(err) => return directory_error_to_response(err),
    };
    if let Err(err) = services
        .pipeline
        .authorize(&ctx, &principal, "employee", "create", Some(&company), now)
        .await
    {
        return security_error_to_response(err);
    }

    let pii = EmployeePii {
        name: body.name,
        employee_ref: body.employee_ref,
        email: body.email,
        phone: body.phone,
    };
    let employee = match Employee::new(
        company.id,
        &pii,
        &services.cipher,
        Some(principal.user_id),
        now,
    ) {
        Ok(employee) => employee,
        Err(err) => return domain_error_to_response(err),
    };

    let entry = AuditEntry::new(AuditAction::Create, ctx.actor_meta(), now)
        .entity(EntityRef::new("employees", employee.id))
        .snapshots(None, Some(employee.snapshot()));

    match services.directory.create_employee(employee, entry).await {
        Ok(id) => (
            StatusCode::CREATED,
            Json(json!({ "id": id.to_string() })),
        )
            .into_response(),
        Err(err) => directory_error_to_response(err),
    }
}

async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ListQuery>,
) -> axum::response::Response {
    let now = Utc::now();
    let principal = match require_principal(&ctx) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    // Default to the caller's own company when no explicit tenant is asked
    // for; admins without a company must name one.
    let company_id = match &query.company_id {
        Some(raw) => match parse_tenant_id(raw) {
            Ok(id) => id,
            Err(resp) => return resp,
        },
        None => match principal.company() {
            Some(id) => id,
            None => {
                return json_error(
                    StatusCode::BAD_REQUEST,
                    "validation_error",
                    "company_id query parameter is required",
                )
            }
        },
    };

    if let Err(err) = services
        .pipeline
        .authorize(&ctx, &principal, "employee", "list", Some(&company_id), now)
        .await
    {
        return security_error_to_response(err);
    }

    let mut filter = EmployeeFilter::for_company(company_id);
    filter.active_only = query.active_only;
    filter.limit = query.limit;

    match services.directory.list_employees(filter).await {
        Ok(employees) => {
            let rows: Vec<_> = employees
                .iter()
                .map(|e| dto::employee_to_json(e, &services.cipher))
                .collect();
            (StatusCode::OK, Json(json!({ "employees": rows }))).into_response()
        }
        Err(err) => directory_error_to_response(err),
    }
}

async fn retrieve(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let now = Utc::now();
    let principal = match require_principal(&ctx) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let id = match parse_employee_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let employee = match services.directory.get_employee(id).await {
        Ok(employee) => employee,
        Err(err) => return directory_error_to_response(err),
    };
    if let Err(err) = services
        .pipeline
        .authorize(&ctx, &principal, "employee", "retrieve", Some(&employee), now)
        .await
    {
        return security_error_to_response(err);
    }

    let entry = AuditEntry::new(AuditAction::View, ctx.actor_meta(), now)
        .entity(EntityRef::new("employees", employee.id));
    services.pipeline.log(entry).await;

    (
        StatusCode::OK,
        Json(dto::employee_to_json(&employee, &services.cipher)),
    )
        .into_response()
}

async fn update(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::EmployeeUpdateRequest>,
) -> axum::response::Response {
    let now = Utc::now();
    let principal = match require_principal(&ctx) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let id = match parse_employee_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let mut employee = match services.directory.get_employee(id).await {
        Ok(employee) => employee,
        Err(err) => return directory_error_to_response(err),
    };
    if let Err(err) = services
        .pipeline
        .authorize(&ctx, &principal, "employee", "update", Some(&employee), now)
        .await
    {
        return security_error_to_response(err);
    }

    let old = employee.snapshot();
    let pii = EmployeePii {
        name: body.name,
        employee_ref: body.employee_ref,
        email: body.email,
        phone: body.phone,
    };
    if let Err(err) = employee.update_pii(&pii, &services.cipher, now) {
        return domain_error_to_response(err);
    }
    employee.is_active = body.is_active;
    let new = employee.snapshot();

    let entry = AuditEntry::new(AuditAction::Update, ctx.actor_meta(), now)
        .entity(EntityRef::new("employees", employee.id))
        .snapshots(Some(old), Some(new));

    match services.directory.update_employee(employee.clone(), entry).await {
        Ok(()) => (
            StatusCode::OK,
            Json(dto::employee_to_json(&employee, &services.cipher)),
        )
            .into_response(),
        Err(err) => directory_error_to_response(err),
    }
}

async fn destroy(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let now = Utc::now();
    let principal = match require_principal(&ctx) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let id = match parse_employee_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let employee = match services.directory.get_employee(id).await {
        Ok(employee) => employee,
        Err(err) => return directory_error_to_response(err),
    };
    if let Err(err) = services
        .pipeline
        .authorize(&ctx, &principal, "employee", "destroy", Some(&employee), now)
        .await
    {
        return security_error_to_response(err);
    }

    let entry = AuditEntry::new(AuditAction::Delete, ctx.actor_meta(), now)
        .entity(EntityRef::new("employees", employee.id))
        .snapshots(Some(employee.snapshot()), None);

    match services.directory.delete_employee(id, entry).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "deleted" }))).into_response(),
        Err(err) => directory_error_to_response(err),
    }
}

async fn assign_position(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::PositionRequest>,
) -> axum::response::Response {
    let now = Utc::now();
    let principal = match require_principal(&ctx) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let id = match parse_employee_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let employee = match services.directory.get_employee(id).await {
        Ok(employee) => employee,
        Err(err) => return directory_error_to_response(err),
    };
    if let Err(err) = services
        .pipeline
        .authorize(&ctx, &principal, "employee", "update", Some(&employee), now)
        .await
    {
        return security_error_to_response(err);
    }

    let employment_type = match EmploymentType::parse(&body.employment_type) {
        Ok(kind) => kind,
        Err(err) => return domain_error_to_response(err),
    };

    let mut position = match EmployeePosition::new(
        id,
        body.title,
        body.start_date,
        employment_type,
        Some(principal.user_id),
        now,
    ) {
        Ok(position) => position,
        Err(err) => return domain_error_to_response(err),
    };
    if let Some(raw) = &body.department_id {
        match raw.parse() {
            Ok(department) => position = position.with_department(department),
            Err(_) => {
                return json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid department id")
            }
        }
    }
    if let Some(duties) = body.duties {
        position = position.with_duties(duties);
    }
    if let Some(cents) = body.salary_cents {
        position = position.with_salary_cents(cents);
    }

    let entry = AuditEntry::new(AuditAction::Create, ctx.actor_meta(), now)
        .entity(EntityRef::new("employee_positions", position.id))
        .snapshots(None, Some(position.snapshot()));

    // The superseded current position, if any, is closed on the new
    // position's start date unless the caller names a different day.
    let end_prior_on = body.end_prior_on.unwrap_or(body.start_date);

    match services
        .directory
        .assign_position(position, end_prior_on, entry)
        .await
    {
        Ok(position_id) => (
            StatusCode::CREATED,
            Json(json!({ "id": position_id.to_string() })),
        )
            .into_response(),
        Err(err) => directory_error_to_response(err),
    }
}

async fn list_positions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let now = Utc::now();
    let principal = match require_principal(&ctx) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let id = match parse_employee_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let employee = match services.directory.get_employee(id).await {
        Ok(employee) => employee,
        Err(err) => return directory_error_to_response(err),
    };
    if let Err(err) = services
        .pipeline
        .authorize(&ctx, &principal, "employee", "retrieve", Some(&employee), now)
        .await
    {
        return security_error_to_response(err);
    }

    match services.directory.positions_for(id).await {
        Ok(positions) => {
            let rows: Vec<_> = positions.iter().map(dto::position_to_json).collect();
            (StatusCode::OK, Json(json!({ "positions": rows }))).into_response()
        }
        Err(err) => directory_error_to_response(err),
    }
}

async fn bulk_import(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<dto::BulkImportRequest>,
) -> axum::response::Response {
    let now = Utc::now();
    let principal = match require_principal(&ctx) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let company_id = match parse_tenant_id(&body.company_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let company = match services.directory.get_company(company_id).await {
        Ok(company) => company,
        Err(err) => return directory_error_to_response(err),
    };
    if let Err(err) = services
        .pipeline
        .authorize(&ctx, &principal, "bulk", "operations", Some(&company), now)
        .await
    {
        return security_error_to_response(err);
    }
    if body.rows.is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "validation_error", "no rows to import");
    }

    let rows: Vec<EmployeeRow> = body
        .rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| EmployeeRow {
            row_number: i + 1,
            pii: EmployeePii {
                name: row.name,
                employee_ref: row.employee_ref,
                email: row.email,
                phone: row.phone,
            },
        })
        .collect();

    let mut actor = ctx.actor_meta();
    actor.user = Some(principal.user_id);

    match services
        .importer
        .run(
            company.id,
            rows,
            &services.cipher,
            actor,
            body.notify_email.as_deref(),
            now,
        )
        .await
    {
        Ok(job) => (StatusCode::ACCEPTED, Json(dto::job_to_json(&job))).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "bulk import failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "storage failure")
        }
    }
}

async fn bulk_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(job_id): Path<String>,
) -> axum::response::Response {
    let now = Utc::now();
    let principal = match require_principal(&ctx) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let job_id = match job_id.parse::<Uuid>() {
        Ok(id) => JobId(id),
        Err(_) => return json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid job id"),
    };

    let job = match services.jobs.get(job_id).await {
        Ok(job) => job,
        Err(JobStoreError::NotFound) => {
            return json_error(StatusCode::NOT_FOUND, "not_found", "job not found")
        }
        Err(JobStoreError::Storage(msg)) => {
            tracing::error!(error = %msg, "job store failure");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "storage failure");
        }
    };

    if let Err(err) = services
        .pipeline
        .authorize(&ctx, &principal, "bulk", "operations", Some(&job.company), now)
        .await
    {
        return security_error_to_response(err);
    }

    (StatusCode::OK, Json(dto::job_to_json(&job))).into_response()
}
