//! User and refresh token persistence

pub mod memory;
pub mod models;
pub mod retention;
pub mod traits;

pub use memory::InMemoryStore;
pub use models::*;
pub use traits::{TokenStore, UserStore};

#[cfg(test)]
pub(crate) mod mock;
