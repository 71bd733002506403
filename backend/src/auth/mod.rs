//! Authentication module
//!
//! Verifies the HS256 access tokens issued by the external auth service and
//! exposes the caller's user id as an extractor.

mod jwt;
mod middleware;

pub use jwt::{Claims, JwtService, AUTHENTICATED_ROLE};
pub use middleware::AuthUser;
