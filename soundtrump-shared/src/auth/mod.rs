/// Authentication utilities
///
/// Session management is delegated to the external auth provider; this module
/// only validates the access tokens it issues and turns them into an
/// `AuthContext` for request handlers.

pub mod jwt;
pub mod middleware;

pub use middleware::AuthContext;
