//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store wiring (in-memory by default, Postgres when a
//!   `DATABASE_URL` is configured) plus the security pipeline
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};

use verihire_pii::FieldCipher;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Runtime configuration resolved from the environment by `main.rs`.
pub struct AppConfig {
    pub cipher: FieldCipher,
    pub database_url: Option<String>,
    pub admin_password: Option<String>,
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(config: AppConfig) -> anyhow::Result<Router> {
    let services = Arc::new(services::build_services(config).await?);
    Ok(router_with(services))
}

/// Assemble the router around an existing service graph.
pub fn router_with(services: Arc<services::AppServices>) -> Router {
    // Session-protected tenant surface.
    let protected = routes::router().layer(axum::middleware::from_fn(middleware::auth_middleware));

    Router::new()
        .nest("/auth", routes::auth::router())
        .nest("/api", protected)
        .layer(axum::middleware::from_fn(middleware::rate_limit_middleware))
        .layer(Extension(services))
        .layer(axum::middleware::from_fn(middleware::context_middleware))
        .route("/health", get(routes::system::health))
}
