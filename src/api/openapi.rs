//! OpenAPI 3.0 specification definition

use actix_web::HttpResponse;
use utoipa::OpenApi;

use crate::address_book::{QuickLookup, ShippingAddress};
use crate::api::handlers::{
    health::HealthResponse,
    orders::CreateOrderRequest,
    shipments::{BatchShipmentRequest, BatchShipmentResponse, CreateShipmentRequest, CreateShipmentResponse},
};
use crate::commands::{Response, ResponseStatus};
use crate::db::models::{Customer, LocationListing, OrderDetails, OrderStatus, SalesOrder, ShippingLocation};
use crate::domain::{PackageDetails, ResultStatus, ShipmentRecord, ShipmentResult};
use crate::shipping::OrderShipmentResult;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "rf-ship API",
        version = "1.0.0",
        description = "Customer address book and Purolator shipment creation for warehouse staff"
    ),
    servers(
        (url = "/", description = "Current server")
    ),
    tags(
        (name = "system", description = "System health and status endpoints"),
        (name = "addresses", description = "Customer and location lookup"),
        (name = "orders", description = "Sales orders awaiting shipment"),
        (name = "shipments", description = "Shipment creation")
    ),
    paths(
        crate::api::handlers::health::health_check,
        crate::api::handlers::addresses::search_customers,
        crate::api::handlers::addresses::search_locations,
        crate::api::handlers::addresses::customer_locations,
        crate::api::handlers::addresses::shipping_address,
        crate::api::handlers::addresses::quick_lookup,
        crate::api::handlers::orders::pending_orders,
        crate::api::handlers::orders::order_details,
        crate::api::handlers::orders::create_order,
        crate::api::handlers::shipments::create_shipment,
        crate::api::handlers::shipments::batch_shipments,
    ),
    components(
        schemas(
            HealthResponse,
            Response,
            ResponseStatus,
            // Address book
            Customer,
            ShippingLocation,
            LocationListing,
            QuickLookup,
            ShippingAddress,
            // Orders
            SalesOrder,
            OrderStatus,
            OrderDetails,
            CreateOrderRequest,
            // Shipments
            ShipmentRecord,
            PackageDetails,
            ShipmentResult,
            ResultStatus,
            OrderShipmentResult,
            CreateShipmentRequest,
            CreateShipmentResponse,
            BatchShipmentRequest,
            BatchShipmentResponse,
        )
    )
)]
pub struct ApiDoc;

/// GET /api-docs/openapi.json
pub async fn openapi_json() -> HttpResponse {
    HttpResponse::Ok().json(ApiDoc::openapi())
}
