//! Authentication module — Google sign-in + rotating refresh tokens
//!
//! Provides:
//! - Google ID token verification (`verifier` contract, `google` implementation)
//! - Access token / refresh envelope encoding (`jwt` submodule)
//! - Refresh token hashing for storage (`refresh` submodule)
//! - The session orchestrator (`service` submodule)
//! - Axum middleware and extractor for protected routes

pub mod error;
pub mod extractor;
pub mod google;
pub mod jwt;
pub mod middleware;
pub mod refresh;
pub mod service;
pub mod verifier;

pub use error::{AuthError, ErrorKind};
pub use service::{AuthResponse, AuthService, SignOutResult, UserResponse};
pub use verifier::{GoogleClaims, IdentityVerifier, VerifyError};
