//! # Quill Shared Library
//!
//! Persistence, authentication and helper logic shared by the Quill API server.
//!
//! ## Module Organization
//!
//! - `db`: Connection pool and bundled migrations
//! - `models`: Database models (users, tokens, categories, articles, comments, admin sessions)
//! - `auth`: Password hashing, bearer token lifecycle, token extraction, ownership checks
//! - `slug`: URL slug generation with collision suffixes
//! - `audit`: Structured audit events for logins and content changes

pub mod audit;
pub mod auth;
pub mod db;
pub mod models;
pub mod slug;
