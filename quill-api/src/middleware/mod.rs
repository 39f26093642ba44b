/// Middleware modules for the API server
///
/// - `security`: Security response headers
/// - `token_auth`: Bearer token authentication for write routes

pub mod security;
pub mod token_auth;
