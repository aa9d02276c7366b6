use axum::{routing::get, Router};

pub mod audit;
pub mod auth;
pub mod companies;
pub mod employees;
pub mod system;

/// Router for all authenticated (session-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/companies", companies::router())
        .nest("/employees", employees::router())
        .nest("/audit", audit::router())
}
