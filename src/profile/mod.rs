//! User profile operations behind the authentication boundary

pub mod service;

pub use service::{ProfileService, UpdateUserRequest, UpdateUserResponse};
