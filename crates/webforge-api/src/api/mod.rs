// API routes
//
// Each module owns its state type and a `routes(state)` constructor.

pub mod builds;
pub mod chat;
pub mod common;
pub mod health;
pub mod models;
pub mod projects;
pub mod stream;

pub use common::{ApiError, ApiResult, ErrorResponse, ListResponse};
