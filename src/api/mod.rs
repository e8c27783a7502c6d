//! API module - HTTP routes and handlers

pub mod handlers;
pub mod middleware;
pub mod openapi;

use actix_web::web;

/// Configure all API routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/shipping")
            .service(
                web::scope("/customers")
                    .route("/search", web::get().to(handlers::addresses::search_customers))
                    .route("/{id}/locations", web::get().to(handlers::addresses::customer_locations))
            )
            .route("/locations/search", web::get().to(handlers::addresses::search_locations))
            .route("/address", web::get().to(handlers::addresses::shipping_address))
            .route("/lookup", web::get().to(handlers::addresses::quick_lookup))
            .service(
                web::scope("/orders")
                    // More specific routes first
                    .route("/pending", web::get().to(handlers::orders::pending_orders))
                    .route("", web::post().to(handlers::orders::create_order))
                    .route("/{order_id}", web::get().to(handlers::orders::order_details))
            )
            .service(
                web::scope("/shipments")
                    .route("/create", web::post().to(handlers::shipments::create_shipment))
                    .route("/batch", web::post().to(handlers::shipments::batch_shipments))
            )
    )
    .route("/health", web::get().to(handlers::health::health_check))
    .route("/api-docs/openapi.json", web::get().to(openapi::openapi_json));
}
