//! HTTP API: server, routing, and request/response mapping.
//!
//! Every request flows context capture → rate limit → (for `/api/`)
//! session authentication → handler; handlers run the permission and tenant
//! checks through the security pipeline before touching stores.

pub mod app;
pub mod middleware;
