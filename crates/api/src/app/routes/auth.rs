use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

use verihire_security::RequestContext;

use crate::app::errors::{json_error, login_error_to_response};
use crate::app::services::AppServices;
use crate::app::dto;
use crate::middleware::extract_bearer;

pub fn router() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    match services
        .verifier
        .login(&ctx, &body.username, &body.password, Utc::now())
        .await
    {
        Ok(outcome) => {
            let role = outcome.principal.role().map(|r| r.as_str());
            let company = outcome.principal.company().map(|c| c.to_string());
            (
                StatusCode::OK,
                Json(json!({
                    "token": outcome.token,
                    "user_id": outcome.principal.user_id.to_string(),
                    "username": outcome.principal.username,
                    "role": role,
                    "company_id": company,
                })),
            )
                .into_response()
        }
        Err(err) => login_error_to_response(err),
    }
}

pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    headers: HeaderMap,
) -> axum::response::Response {
    let Ok(token) = extract_bearer(&headers) else {
        return json_error(StatusCode::UNAUTHORIZED, "unauthorized", "missing bearer token");
    };
    match services.verifier.logout(&ctx, token, Utc::now()).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "logged_out" }))).into_response(),
        Err(err) => login_error_to_response(err),
    }
}
