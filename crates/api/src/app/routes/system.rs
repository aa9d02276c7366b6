use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use verihire_auth::Principal;

pub async fn health() -> axum::response::Response {
    (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
}

pub async fn whoami(Extension(principal): Extension<Principal>) -> axum::response::Response {
    let role = principal.role().map(|r| r.as_str());
    let company = principal.company().map(|c| c.to_string());
    (
        StatusCode::OK,
        Json(json!({
            "user_id": principal.user_id.to_string(),
            "username": principal.username,
            "is_system_admin": principal.is_system_admin,
            "role": role,
            "company_id": company,
        })),
    )
        .into_response()
}
