//! Company and department endpoints.
//!
//! Mutations carry their audit entry into the store so the write and the
//! trail commit together; reads log a VIEW entry fire-and-forget.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

use verihire_audit::{changed_fields, AuditAction, AuditEntry, EntityRef};
use verihire_core::TenantId;
use verihire_directory::{Company, Department};
use verihire_security::RequestContext;

use crate::app::dto;
use crate::app::errors::{
    directory_error_to_response, domain_error_to_response, json_error, security_error_to_response,
};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create).get(list))
        .route("/:id", get(retrieve).put(update))
        .route("/:id/departments", post(create_department).get(list_departments))
}

fn parse_company_id(raw: &str) -> Result<TenantId, axum::response::Response> {
    raw.parse::<TenantId>()
        .map_err(|_| json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid company id"))
}

async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<dto::CompanyRequest>,
) -> axum::response::Response {
    let now = Utc::now();
    let Some(principal) = ctx.principal.clone() else {
        return json_error(StatusCode::UNAUTHORIZED, "unauthorized", "missing session");
    };
    if let Err(err) = services
        .pipeline
        .authorize(&ctx, &principal, "company", "create", None, now)
        .await
    {
        return security_error_to_response(err);
    }

    let mut company = match Company::new(
        body.name,
        body.registration_number,
        body.registration_date,
        body.address,
        body.contact_person,
        body.email,
        Some(principal.user_id),
        now,
    ) {
        Ok(company) => company,
        Err(err) => return domain_error_to_response(err),
    };
    company.phone = body.phone;

    let entry = AuditEntry::new(AuditAction::Create, ctx.actor_meta(), now)
        .entity(EntityRef::new("companies", company.id))
        .snapshots(None, Some(company.snapshot()))
        .description(format!("registered company '{}'", company.name));

    match services.directory.create_company(company, entry).await {
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
) -> axum::response::Response {
    let now = Utc::now();
    let Some(principal) = ctx.principal.clone() else {
        return json_error(StatusCode::UNAUTHORIZED, "unauthorized", "missing session");
    };
    if let Err(err) = services
        .pipeline
        .authorize(&ctx, &principal, "company", "list", None, now)
        .await
    {
        return security_error_to_response(err);
    }

    match services.directory.list_companies().await {
        Ok(companies) => {
            // Company-scoped principals only see their own tenant.
            let all = principal.is_system_admin
                || principal.role() == Some(verihire_auth::RoleName::PlatformAdmin);
            let visible: Vec<_> = companies
                .iter()
                .filter(|c| all || principal.company() == Some(c.id))
                .map(dto::company_to_json)
                .collect();
            (StatusCode::OK, Json(json!({ "companies": visible }))).into_response()
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
    let Some(principal) = ctx.principal.clone() else {
        return json_error(StatusCode::UNAUTHORIZED, "unauthorized", "missing session");
    };
    let id = match parse_company_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let company = match services.directory.get_company(id).await {
        Ok(company) => company,
        Err(err) => return directory_error_to_response(err),
    };
    if let Err(err) = services
        .pipeline
        .authorize(&ctx, &principal, "company", "retrieve", Some(&company), now)
        .await
    {
        return security_error_to_response(err);
    }

    let entry = AuditEntry::new(AuditAction::View, ctx.actor_meta(), now)
        .entity(EntityRef::new("companies", company.id));
    services.pipeline.log(entry).await;

    (StatusCode::OK, Json(dto::company_to_json(&company))).into_response()
}

async fn update(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::CompanyRequest>,
) -> axum::response::Response {
    let now = Utc::now();
    let Some(principal) = ctx.principal.clone() else {
        return json_error(StatusCode::UNAUTHORIZED, "unauthorized", "missing session");
    };
    let id = match parse_company_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let mut company = match services.directory.get_company(id).await {
        Ok(company) => company,
        Err(err) => return directory_error_to_response(err),
    };
    if let Err(err) = services
        .pipeline
        .authorize(&ctx, &principal, "company", "update", Some(&company), now)
        .await
    {
        return security_error_to_response(err);
    }

    if body.name.trim().is_empty() {
        return json_error(StatusCode::BAD_REQUEST, "validation_error", "company name cannot be empty");
    }
    if !body.email.contains('@') {
        return json_error(StatusCode::BAD_REQUEST, "validation_error", "invalid contact email");
    }

    let old = company.snapshot();
    company.name = body.name;
    company.registration_number = body.registration_number;
    company.registration_date = body.registration_date;
    company.address = body.address;
    company.contact_person = body.contact_person;
    company.email = body.email;
    company.phone = body.phone;
    company.updated_at = now;
    let new = company.snapshot();

    if changed_fields(&old, &new).is_empty() {
        return (StatusCode::OK, Json(dto::company_to_json(&company))).into_response();
    }

    let entry = AuditEntry::new(AuditAction::Update, ctx.actor_meta(), now)
        .entity(EntityRef::new("companies", company.id))
        .snapshots(Some(old), Some(new));

    match services.directory.update_company(company.clone(), entry).await {
        Ok(()) => (StatusCode::OK, Json(dto::company_to_json(&company))).into_response(),
        Err(err) => directory_error_to_response(err),
    }
}

async fn create_department(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::DepartmentRequest>,
) -> axum::response::Response {
    let now = Utc::now();
    let Some(principal) = ctx.principal.clone() else {
        return json_error(StatusCode::UNAUTHORIZED, "unauthorized", "missing session");
    };
    let id = match parse_company_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let company = match services.directory.get_company(id).await {
        Ok(company) => company,
        Err(err) => return directory_error_to_response(err),
    };
    // Departments are company sub-resources; creating one requires the
    // company update grant.
    if let Err(err) = services
        .pipeline
        .authorize(&ctx, &principal, "company", "update", Some(&company), now)
        .await
    {
        return security_error_to_response(err);
    }

    let department = match Department::new(company.id, body.name, now) {
        Ok(department) => department,
        Err(err) => return domain_error_to_response(err),
    };

    let entry = AuditEntry::new(AuditAction::Create, ctx.actor_meta(), now)
        .entity(EntityRef::new("departments", department.id))
        .description(format!(
            "created department '{}' in '{}'",
            department.name, company.name
        ));

    match services
        .directory
        .create_department(department.clone(), entry)
        .await
    {
        Ok(()) => (
            StatusCode::CREATED,
            Json(dto::department_to_json(&department)),
        )
            .into_response(),
        Err(err) => directory_error_to_response(err),
    }
}

async fn list_departments(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let now = Utc::now();
    let Some(principal) = ctx.principal.clone() else {
        return json_error(StatusCode::UNAUTHORIZED, "unauthorized", "missing session");
    };
    let id = match parse_company_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let company = match services.directory.get_company(id).await {
        Ok(company) => company,
        Err(err) => return directory_error_to_response(err),
    };
    if let Err(err) = services
        .pipeline
        .authorize(&ctx, &principal, "company", "retrieve", Some(&company), now)
        .await
    {
        return security_error_to_response(err);
    }

    match services.directory.list_departments(id).await {
        Ok(departments) => {
            let rows: Vec<_> = departments.iter().map(dto::department_to_json).collect();
            (StatusCode::OK, Json(json!({ "departments": rows }))).into_response()
        }
        Err(err) => directory_error_to_response(err),
    }
}
