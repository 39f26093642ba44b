//! # Quill API Server Library
//!
//! This library provides the core functionality for the Quill blog API
//! server.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Validated JSON and client IP extractors
//! - `middleware`: Token authentication and security headers
//! - `routes`: API route handlers
//! - `admin`: Staff admin UI
//! - `sweeper`: Background cleanup of expired tokens and sessions

pub mod admin;
pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod sweeper;
