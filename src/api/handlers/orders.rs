//! Sales order endpoints

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

use super::respond;
use crate::commands::{dispatch, Command, Response};
use crate::AppState;

/// Request body for creating a sales order
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub order_id: Option<String>,
    pub customer_id: Option<i64>,
    pub location_id: Option<i64>,
    /// Package weight in kg
    pub weight: Option<f64>,
    pub service_id: Option<String>,
    pub reference: Option<String>,
}

/// GET /api/shipping/orders/pending - Orders waiting to ship
#[utoipa::path(
    get,
    path = "/api/shipping/orders/pending",
    tag = "orders",
    responses(
        (status = 200, description = "Pending orders with customer and address", body = Response)
    )
)]
pub async fn pending_orders(state: web::Data<AppState>) -> HttpResponse {
    respond(dispatch(&state.book, Command::GetPendingOrders).await)
}

/// GET /api/shipping/orders/{orderId} - One order with customer and address
#[utoipa::path(
    get,
    path = "/api/shipping/orders/{orderId}",
    tag = "orders",
    params(
        ("orderId" = String, Path, description = "Sales order id")
    ),
    responses(
        (status = 200, description = "Order details", body = Response),
        (status = 404, description = "Order not found", body = Response)
    )
)]
pub async fn order_details(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let command = Command::GetOrderWithDetails {
        order_id: Some(path.into_inner()),
    };
    respond(dispatch(&state.book, command).await)
}

/// POST /api/shipping/orders - Create a sales order for a customer location
#[utoipa::path(
    post,
    path = "/api/shipping/orders",
    tag = "orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order created", body = Response),
        (status = 400, description = "Missing field", body = Response),
        (status = 404, description = "Customer location not found", body = Response)
    )
)]
pub async fn create_order(state: web::Data<AppState>, body: web::Json<CreateOrderRequest>) -> HttpResponse {
    let body = body.into_inner();
    info!(order_id = ?body.order_id, "Creating order");

    let command = Command::CreateOrder {
        order_id: body.order_id,
        customer_id: body.customer_id,
        location_id: body.location_id,
        weight: body.weight,
        service_id: body.service_id,
        reference: body.reference,
    };
    respond(dispatch(&state.book, command).await)
}
