//! API Key Authentication
//!
//! Reads the key from the X-API-Key header or an Authorization: Bearer token.

use actix_web::{dev::ServiceRequest, http::header::AUTHORIZATION};

/// Header name for API key
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Extract API key from request headers
pub fn extract_api_key(req: &ServiceRequest) -> Option<String> {
    // First try X-API-Key header
    if let Some(key) = req.headers().get(API_KEY_HEADER) {
        if let Ok(key_str) = key.to_str() {
            return Some(key_str.trim().to_string());
        }
    }

    // Then try Authorization: Bearer <key>
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|auth| auth.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(|key| key.trim().to_string())
}

/// Compare keys without stopping at the first differing byte
pub fn key_matches(expected: &str, provided: &str) -> bool {
    let (expected, provided) = (expected.as_bytes(), provided.as_bytes());
    expected.len() == provided.len()
        && expected
            .iter()
            .zip(provided)
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
}
