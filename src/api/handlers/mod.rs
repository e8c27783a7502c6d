//! HTTP request handlers
//!
//! Handlers translate query strings and bodies into commands and run them
//! through the same dispatcher as the `rpc` subcommand.

pub mod addresses;
pub mod health;
pub mod orders;
pub mod shipments;

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::commands::Response;

/// `?q=` search term
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Search term, matched case-insensitively
    #[serde(default)]
    pub q: String,
}

/// HTTP status for a command error type
pub fn status_for(error_type: Option<&str>) -> StatusCode {
    match error_type {
        Some("NotFound") => StatusCode::NOT_FOUND,
        Some("InvalidInput" | "InvalidCommand" | "MissingField" | "ValidationError") => StatusCode::BAD_REQUEST,
        Some("AlreadyShipped" | "OrderCancelled") => StatusCode::CONFLICT,
        Some("CarrierRejected") => StatusCode::UNPROCESSABLE_ENTITY,
        Some("CarrierError") => StatusCode::BAD_GATEWAY,
        Some("NotConfigured") => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Command response as JSON with a matching status code
pub fn respond(response: Response) -> HttpResponse {
    if response.is_success() {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::build(status_for(response.error_type.as_deref())).json(response)
    }
}
