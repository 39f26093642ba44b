/// API route handlers, by resource
///
/// - `root`: API index
/// - `health`: Health check
/// - `auth`: Register, login, logout, change password
/// - `articles`: Article CRUD
/// - `comments`: Comment CRUD
/// - `categories`: Category listing and creation

pub mod articles;
pub mod auth;
pub mod categories;
pub mod comments;
pub mod health;
pub mod root;
