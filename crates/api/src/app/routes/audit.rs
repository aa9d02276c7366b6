//! Read-side audit and security-event endpoints.
//!
//! These are admin-only. A non-admin caller reaching them is itself a
//! security signal and is recorded as a High `PrivilegeEscalation` event
//! before the 403 goes out.

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

use verihire_audit::{
    AuditAction, AuditLogFilter, AuditStoreError, SecurityEvent, SecurityEventFilter,
    SecurityEventKind, Severity,
};
use verihire_auth::{Principal, RoleName};
use verihire_core::{SecurityEventId, UserId};
use verihire_security::RequestContext;

use crate::app::dto;
use crate::app::errors::json_error;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/logs", get(list_logs))
        .route("/events", get(list_events))
        .route("/events/:id/resolve", post(resolve_event))
}

fn is_admin(principal: &Principal) -> bool {
    principal.is_system_admin
        || principal.is_company_admin
        || matches!(
            principal.role(),
            Some(RoleName::PlatformAdmin) | Some(RoleName::CompanyAdmin)
        )
}

/// Gate shared by every handler here. Returns the principal for admins,
/// records the attempt and produces the 403 for everyone else.
async fn require_admin(
    services: &AppServices,
    ctx: &RequestContext,
) -> Result<Principal, axum::response::Response> {
    let Some(principal) = ctx.principal.clone() else {
        return Err(json_error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing session",
        ));
    };
    if is_admin(&principal) {
        return Ok(principal);
    }

    let event = SecurityEvent::new(
        SecurityEventKind::PrivilegeEscalation,
        Severity::High,
        format!(
            "'{}' attempted to read the audit trail without an admin role",
            principal.username
        ),
        Utc::now(),
    )
    .user(principal.user_id)
    .ip(ctx.ip.clone());
    services.pipeline.log_event(event).await;

    Err(json_error(
        StatusCode::FORBIDDEN,
        "permission_denied",
        "admin role required",
    ))
}

fn parse_action(raw: &str) -> Option<AuditAction> {
    match raw {
        "CREATE" => Some(AuditAction::Create),
        "UPDATE" => Some(AuditAction::Update),
        "DELETE" => Some(AuditAction::Delete),
        "VIEW" => Some(AuditAction::View),
        "EXPORT" => Some(AuditAction::Export),
        "LOGIN" => Some(AuditAction::Login),
        "LOGOUT" => Some(AuditAction::Logout),
        "BULK_IMPORT" => Some(AuditAction::BulkImport),
        _ => None,
    }
}

fn parse_kind(raw: &str) -> Option<SecurityEventKind> {
    match raw {
        "failed_login" => Some(SecurityEventKind::FailedLogin),
        "account_locked" => Some(SecurityEventKind::AccountLocked),
        "suspicious_activity" => Some(SecurityEventKind::SuspiciousActivity),
        "unauthorized_access" => Some(SecurityEventKind::UnauthorizedAccess),
        "privilege_escalation" => Some(SecurityEventKind::PrivilegeEscalation),
        "admin_action" => Some(SecurityEventKind::AdminAction),
        _ => None,
    }
}

fn parse_severity(raw: &str) -> Option<Severity> {
    match raw {
        "low" => Some(Severity::Low),
        "medium" => Some(Severity::Medium),
        "high" => Some(Severity::High),
        "critical" => Some(Severity::Critical),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    #[serde(default)]
    actor: Option<String>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
}

async fn list_logs(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<LogsQuery>,
) -> axum::response::Response {
    let _principal = match require_admin(&services, &ctx).await {
        Ok(principal) => principal,
        Err(resp) => return resp,
    };

    let mut filter = AuditLogFilter::default();
    if let Some(raw) = &query.actor {
        match raw.parse::<UserId>() {
            Ok(actor) => filter.actor = Some(actor),
            Err(_) => return json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid actor id"),
        }
    }
    if let Some(raw) = &query.action {
        match parse_action(raw) {
            Some(action) => filter.action = Some(action),
            None => {
                return json_error(
                    StatusCode::BAD_REQUEST,
                    "validation_error",
                    format!("unknown audit action '{raw}'"),
                )
            }
        }
    }
    filter.limit = query.limit;

    match services.audit.list(filter).await {
        Ok(entries) => (StatusCode::OK, Json(json!({ "logs": entries }))).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "audit log listing failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "storage failure")
        }
    }
}

#[derive(Debug, Deserialize)]
struct EventsQuery {
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    min_severity: Option<String>,
    #[serde(default)]
    resolved: Option<bool>,
    #[serde(default)]
    limit: Option<usize>,
}

async fn list_events(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<EventsQuery>,
) -> axum::response::Response {
    let _principal = match require_admin(&services, &ctx).await {
        Ok(principal) => principal,
        Err(resp) => return resp,
    };

    let mut filter = SecurityEventFilter::default();
    if let Some(raw) = &query.kind {
        match parse_kind(raw) {
            Some(kind) => filter.kind = Some(kind),
            None => {
                return json_error(
                    StatusCode::BAD_REQUEST,
                    "validation_error",
                    format!("unknown event kind '{raw}'"),
                )
            }
        }
    }
    if let Some(raw) = &query.min_severity {
        match parse_severity(raw) {
            Some(severity) => filter.min_severity = Some(severity),
            None => {
                return json_error(
                    StatusCode::BAD_REQUEST,
                    "validation_error",
                    format!("unknown severity '{raw}'"),
                )
            }
        }
    }
    filter.resolved = query.resolved;
    filter.limit = query.limit;

    match services.events.list(filter).await {
        Ok(events) => (StatusCode::OK, Json(json!({ "events": events }))).into_response(),
        Err(err) => {
            tracing::error!(error = %err, "security event listing failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "storage failure")
        }
    }
}

async fn resolve_event(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::ResolveRequest>,
) -> axum::response::Response {
    let now = Utc::now();
    let principal = match require_admin(&services, &ctx).await {
        Ok(principal) => principal,
        Err(resp) => return resp,
    };
    let Ok(id) = id.parse::<SecurityEventId>() else {
        return json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid event id");
    };

    match services
        .events
        .resolve(id, principal.user_id, body.notes.clone(), now)
        .await
    {
        Ok(()) => {
            let event = SecurityEvent::new(
                SecurityEventKind::AdminAction,
                Severity::Low,
                format!("'{}' resolved security event {id}", principal.username),
                now,
            )
            .user(principal.user_id)
            .ip(ctx.ip.clone());
            services.pipeline.log_event(event).await;

            (StatusCode::OK, Json(json!({ "status": "resolved" }))).into_response()
        }
        Err(AuditStoreError::NotFound) => {
            json_error(StatusCode::NOT_FOUND, "not_found", "event not found")
        }
        Err(AuditStoreError::AlreadyResolved) => {
            json_error(StatusCode::CONFLICT, "conflict", "event is already resolved")
        }
        Err(err) => {
            tracing::error!(error = %err, "event resolution failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "storage failure")
        }
    }
}
