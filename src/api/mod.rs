//! HTTP API
//!
//! REST surface over the lifecycle service. Handlers never hold tenant
//! locks themselves; a concurrent mutation on the same tenant answers
//! 409 with the service's busy error.

mod response;
mod routes;
mod server;

pub use response::{ApiError, ErrorResponse};
pub use routes::router;
pub use server::{build_app, serve, ServerError};
