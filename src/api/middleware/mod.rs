//! API Middleware Module
//!
//! Shared API key authentication for the shipping API.

pub mod auth;
pub mod service;

pub use auth::{extract_api_key, key_matches, API_KEY_HEADER};
pub use service::ApiMiddleware;
