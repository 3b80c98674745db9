//! HTTP API: session endpoints and the authenticated profile surface

pub mod auth_handlers;
pub mod handlers;
pub mod routes;
pub mod user_handlers;

pub use handlers::{AppError, AppState, ServerState};
pub use routes::create_router;
