use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Extension},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use verihire_security::RequestContext;

use crate::app::errors::{json_error, security_error_to_response};
use crate::app::services::AppServices;

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Capture the per-request context before anything else runs.
pub async fn context_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<std::net::SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());
    let headers = req.headers();
    // Only a token prefix goes into the context; audit rows must never hold
    // a usable session token.
    let session = extract_bearer(headers)
        .ok()
        .map(|t| t.get(..8).unwrap_or(t));
    let ctx = RequestContext::capture(
        peer.as_deref(),
        header(headers, "x-forwarded-for"),
        header(headers, "user-agent"),
        session,
        Utc::now(),
    );
    req.extensions_mut().insert(ctx);
    next.run(req).await
}

/// Per-IP throttle; runs on every route under a limited prefix.
pub async fn rate_limit_middleware(
    Extension(services): Extension<Arc<AppServices>>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(ctx) = req.extensions().get::<RequestContext>().cloned() else {
        return json_error(StatusCode::INTERNAL_SERVER_ERROR, "no_context", "request context missing");
    };
    let path = req.uri().path().to_string();
    if let Err(err) = services
        .pipeline
        .check_rate_limit(&ctx, &path, Utc::now())
        .await
    {
        return security_error_to_response(err);
    }
    next.run(req).await
}

/// Bearer-session authentication for the protected `/api/` surface.
///
/// On success the request context is re-inserted carrying the principal, so
/// audit rows written downstream name the actor.
pub async fn auth_middleware(
    Extension(services): Extension<Arc<AppServices>>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = match extract_bearer(req.headers()) {
        Ok(token) => token.to_string(),
        Err(status) => return json_error(status, "unauthorized", "missing bearer token"),
    };

    let principal = match services.sessions.validate(&token).await {
        Ok(Some(principal)) => principal,
        Ok(None) => return json_error(StatusCode::UNAUTHORIZED, "unauthorized", "invalid or expired session"),
        Err(err) => {
            tracing::error!(error = %err, "session validation failed");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "session_store", "session store unavailable");
        }
    };

    if !principal.is_active {
        return json_error(StatusCode::FORBIDDEN, "account_deactivated", "account deactivated");
    }

    let ctx = req
        .extensions()
        .get::<RequestContext>()
        .cloned()
        .map(|c| c.with_principal(principal.clone()));
    if let Some(ctx) = ctx {
        req.extensions_mut().insert(ctx);
    }
    req.extensions_mut().insert(principal);

    next.run(req).await
}

pub(crate) fn extract_bearer(headers: &HeaderMap) -> Result<&str, StatusCode> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?
        .trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(token)
}
