//! Shipment creation endpoints

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

use super::status_for;
use crate::address_book::QuickLookup;
use crate::commands::{dispatch, Command, Response};
use crate::domain::{PackageDetails, ShipmentRecord, ShipmentResult};
use crate::shipping::OrderShipmentResult;
use crate::AppState;

/// Request body for creating one shipment.
///
/// The destination is taken from the first field present, in this order:
/// `shipmentData`, `locationId`, `customerId`, `customerName`, `orderId`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateShipmentRequest {
    /// Complete shipment, sent as is
    pub shipment_data: Option<ShipmentRecord>,
    pub location_id: Option<i64>,
    /// Ships to the customer's default location
    pub customer_id: Option<i64>,
    /// Looked up by name, then shipped to the default location
    pub customer_name: Option<String>,
    pub order_id: Option<String>,
    pub package_details: Option<PackageDetails>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateShipmentResponse {
    pub success: bool,
    pub shipment_pin: Option<String>,
    pub message: String,
    pub result: Option<ShipmentResult>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchShipmentRequest {
    pub order_ids: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchShipmentResponse {
    pub success: bool,
    pub results: Vec<OrderShipmentResult>,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn shipment_reply(response: Response) -> HttpResponse {
    let result: Option<ShipmentResult> = response
        .data
        .clone()
        .and_then(|data| serde_json::from_value(data).ok());
    let status = if response.is_success() {
        StatusCode::OK
    } else {
        status_for(response.error_type.as_deref())
    };
    let message = response
        .message
        .clone()
        .or_else(|| result.as_ref().map(|r| r.message.clone()))
        .unwrap_or_default();

    HttpResponse::build(status).json(CreateShipmentResponse {
        success: response.is_success(),
        shipment_pin: result.as_ref().and_then(|r| r.shipment_pin.clone()),
        message,
        result,
    })
}

fn error_reply(status: StatusCode, message: String) -> HttpResponse {
    HttpResponse::build(status).json(CreateShipmentResponse {
        success: false,
        shipment_pin: None,
        message,
        result: None,
    })
}

/// Pick the command for a create request, looking up customers by name
async fn resolve_command(state: &AppState, body: CreateShipmentRequest) -> Result<Command, HttpResponse> {
    let package_data = body.package_details;

    if let Some(record) = body.shipment_data {
        return Ok(Command::CreateShipmentDirect {
            shipment_data: Some(record),
        });
    }
    if let Some(location_id) = body.location_id {
        return Ok(Command::ShipToLocation {
            location_id: Some(location_id),
            package_data,
        });
    }
    if let Some(customer_id) = body.customer_id {
        return Ok(Command::ShipToCustomer {
            customer_id: Some(customer_id),
            location_id: None,
            package_data,
        });
    }
    if let Some(name) = body.customer_name.filter(|n| !n.trim().is_empty()) {
        let response = dispatch(
            &state.book,
            Command::QuickLookup {
                search_term: name.clone(),
            },
        )
        .await;
        if !response.is_success() {
            return Err(shipment_reply(response));
        }

        let lookup: Option<QuickLookup> = response.data.and_then(|data| serde_json::from_value(data).ok());
        let location = lookup.and_then(|l| l.default_location.or_else(|| l.locations.into_iter().next()));
        return match location {
            Some(location) => Ok(Command::ShipToLocation {
                location_id: Some(location.location_id),
                package_data,
            }),
            None => Err(error_reply(
                StatusCode::NOT_FOUND,
                format!("No location found for customer {}", name),
            )),
        };
    }
    if let Some(order_id) = body.order_id {
        return Ok(Command::ShipOrder {
            order_id: Some(order_id),
            package_data,
        });
    }

    Err(error_reply(
        StatusCode::BAD_REQUEST,
        "shipmentData, locationId, customerId, customerName or orderId required".to_string(),
    ))
}

/// POST /api/shipping/shipments/create - Create one shipment
#[utoipa::path(
    post,
    path = "/api/shipping/shipments/create",
    tag = "shipments",
    request_body = CreateShipmentRequest,
    responses(
        (status = 200, description = "Shipment created", body = CreateShipmentResponse),
        (status = 400, description = "No destination or invalid shipment", body = CreateShipmentResponse),
        (status = 404, description = "Destination not found", body = CreateShipmentResponse),
        (status = 409, description = "Order already shipped or cancelled", body = CreateShipmentResponse),
        (status = 422, description = "Rejected by the carrier", body = CreateShipmentResponse),
        (status = 503, description = "Carrier not configured", body = CreateShipmentResponse)
    )
)]
pub async fn create_shipment(state: web::Data<AppState>, body: web::Json<CreateShipmentRequest>) -> HttpResponse {
    let command = match resolve_command(&state, body.into_inner()).await {
        Ok(command) => command,
        Err(reply) => return reply,
    };
    info!(action = command.action(), "Creating shipment");

    let response = dispatch(&state.book, command).await;
    if !response.is_success() {
        warn!(message = ?response.message, "Shipment not created");
    }
    shipment_reply(response)
}

/// POST /api/shipping/shipments/batch - Ship several orders
#[utoipa::path(
    post,
    path = "/api/shipping/shipments/batch",
    tag = "shipments",
    request_body = BatchShipmentRequest,
    responses(
        (status = 200, description = "Per-order results", body = BatchShipmentResponse),
        (status = 400, description = "No order ids", body = BatchShipmentResponse)
    )
)]
pub async fn batch_shipments(state: web::Data<AppState>, body: web::Json<BatchShipmentRequest>) -> HttpResponse {
    let command = Command::BatchShipOrders {
        order_ids: body.into_inner().order_ids,
    };
    let response = dispatch(&state.book, command).await;

    if !response.is_success() {
        return HttpResponse::build(status_for(response.error_type.as_deref())).json(BatchShipmentResponse {
            success: false,
            results: Vec::new(),
            total: 0,
            successful: 0,
            failed: 0,
            message: response.message,
        });
    }

    let results: Vec<OrderShipmentResult> = response
        .data
        .and_then(|data| serde_json::from_value(data).ok())
        .unwrap_or_default();
    let successful = results.iter().filter(|r| r.result.is_success()).count();
    info!(total = results.len(), successful, "Batch shipment finished");

    HttpResponse::Ok().json(BatchShipmentResponse {
        success: true,
        total: results.len(),
        successful,
        failed: results.len() - successful,
        results,
        message: None,
    })
}

#[cfg(test)]
mod tests {
    use actix_web::{test, App};
    use serde_json::{json, Value};

    use crate::api::configure_routes;
    use crate::api::tests::test_state;
    use crate::db::models::NewOrder;
    use crate::db::AddressStore;

    #[actix_web::test]
    async fn test_create_by_location_and_customer_name() {
        let (state, store, carrier) = test_state().await;
        let acme = store.search_customers("acme").await.unwrap()[0].customer_id;
        let warehouse = store.customer_locations(acme).await.unwrap()[1].location_id;
        let app = test::init_service(App::new().app_data(state).configure(configure_routes)).await;

        let req = test::TestRequest::post()
            .uri("/api/shipping/shipments/create")
            .set_json(json!({ "locationId": warehouse, "packageDetails": { "weight": 4 } }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["shipmentPin"], "PIN0001");
        assert_eq!(body["message"], "Shipment created successfully");

        let req = test::TestRequest::post()
            .uri("/api/shipping/shipments/create")
            .set_json(json!({ "customerName": "acme" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["shipmentPin"], "PIN0002");

        let shipped = carrier.shipped.lock().unwrap();
        assert_eq!(shipped[0].receiver_city, "Laval");
        assert_eq!(shipped[0].weight, "4");
        assert_eq!(shipped[1].receiver_city, "Montreal");
    }

    #[actix_web::test]
    async fn test_create_reports_rejection_and_missing_destination() {
        let (state, store, carrier) = test_state().await;
        let acme = store.search_customers("acme").await.unwrap()[0].customer_id;
        let app = test::init_service(App::new().app_data(state).configure(configure_routes)).await;

        carrier.reject_next("Invalid postal code");
        let req = test::TestRequest::post()
            .uri("/api/shipping/shipments/create")
            .set_json(json!({ "customerId": acme }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 422);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Invalid postal code");
        assert_eq!(body["result"]["status"], "Error");

        let req = test::TestRequest::post()
            .uri("/api/shipping/shipments/create")
            .set_json(json!({}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn test_batch_counts_results() {
        let (state, store, _) = test_state().await;
        let acme = store.search_customers("acme").await.unwrap()[0].customer_id;
        let location = store.default_location(acme).await.unwrap().unwrap().location_id;
        store
            .add_order(&NewOrder {
                order_id: "SO-1".to_string(),
                customer_id: acme,
                location_id: location,
                weight: Some(2.0),
                service_id: None,
                reference: None,
            })
            .await
            .unwrap();
        let app = test::init_service(App::new().app_data(state).configure(configure_routes)).await;

        let req = test::TestRequest::post()
            .uri("/api/shipping/shipments/batch")
            .set_json(json!({ "orderIds": ["SO-1", "SO-404"] }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["total"], 2);
        assert_eq!(body["successful"], 1);
        assert_eq!(body["failed"], 1);
        assert_eq!(body["results"][0]["order_id"], "SO-1");
        assert_eq!(body["results"][1]["status"], "Error");

        let req = test::TestRequest::post()
            .uri("/api/shipping/shipments/batch")
            .set_json(json!({ "orderIds": [] }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }
}
