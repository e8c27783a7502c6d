//! Customer and location lookup endpoints

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use utoipa::IntoParams;

use super::{respond, SearchQuery};
use crate::commands::{dispatch, Command, Response};
use crate::AppState;

/// Address resolution by customer and/or location
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct AddressQuery {
    pub customer_id: Option<i64>,
    pub location_id: Option<i64>,
}

/// GET /api/shipping/customers/search - Search customers by name
#[utoipa::path(
    get,
    path = "/api/shipping/customers/search",
    tag = "addresses",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching customers", body = Response)
    )
)]
pub async fn search_customers(state: web::Data<AppState>, query: web::Query<SearchQuery>) -> HttpResponse {
    let command = Command::SearchCustomers {
        search_term: query.into_inner().q,
    };
    respond(dispatch(&state.book, command).await)
}

/// GET /api/shipping/locations/search - Search locations by name, city or postal code
#[utoipa::path(
    get,
    path = "/api/shipping/locations/search",
    tag = "addresses",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching locations with their customer", body = Response)
    )
)]
pub async fn search_locations(state: web::Data<AppState>, query: web::Query<SearchQuery>) -> HttpResponse {
    let command = Command::SearchLocations {
        search_term: query.into_inner().q,
    };
    respond(dispatch(&state.book, command).await)
}

/// GET /api/shipping/customers/{id}/locations - Locations for one customer
#[utoipa::path(
    get,
    path = "/api/shipping/customers/{id}/locations",
    tag = "addresses",
    params(
        ("id" = i64, Path, description = "Customer id")
    ),
    responses(
        (status = 200, description = "Customer locations, default first", body = Response)
    )
)]
pub async fn customer_locations(state: web::Data<AppState>, path: web::Path<i64>) -> HttpResponse {
    let command = Command::GetCustomerLocations {
        customer_id: Some(path.into_inner()),
    };
    respond(dispatch(&state.book, command).await)
}

/// GET /api/shipping/address - Receiver address for a customer or location
#[utoipa::path(
    get,
    path = "/api/shipping/address",
    tag = "addresses",
    params(AddressQuery),
    responses(
        (status = 200, description = "Receiver address", body = Response),
        (status = 404, description = "Address not found", body = Response)
    )
)]
pub async fn shipping_address(state: web::Data<AppState>, query: web::Query<AddressQuery>) -> HttpResponse {
    let query = query.into_inner();
    let command = Command::GetShippingAddress {
        customer_id: query.customer_id,
        location_id: query.location_id,
    };
    respond(dispatch(&state.book, command).await)
}

/// GET /api/shipping/lookup - Customer with locations, by customer or location search
#[utoipa::path(
    get,
    path = "/api/shipping/lookup",
    tag = "addresses",
    params(SearchQuery),
    responses(
        (status = 200, description = "Customer, locations and default location", body = Response),
        (status = 404, description = "No results", body = Response)
    )
)]
pub async fn quick_lookup(state: web::Data<AppState>, query: web::Query<SearchQuery>) -> HttpResponse {
    let command = Command::QuickLookup {
        search_term: query.into_inner().q,
    };
    respond(dispatch(&state.book, command).await)
}

#[cfg(test)]
mod tests {
    use actix_web::{test, App};
    use serde_json::Value;

    use crate::api::configure_routes;
    use crate::api::tests::test_state;
    use crate::db::AddressStore;

    #[actix_web::test]
    async fn test_search_and_lookup_routes() {
        let (state, _, _) = test_state().await;
        let app = test::init_service(App::new().app_data(state).configure(configure_routes)).await;

        let req = test::TestRequest::get().uri("/api/shipping/customers/search?q=acme").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"][0]["customer_name"], "Acme Freight");

        let req = test::TestRequest::get().uri("/api/shipping/locations/search?q=laval").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let req = test::TestRequest::get().uri("/api/shipping/lookup?q=nobody").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
    }

    #[actix_web::test]
    async fn test_address_and_locations_routes() {
        let (state, store, _) = test_state().await;
        let acme = store.search_customers("acme").await.unwrap()[0].customer_id;
        let app = test::init_service(App::new().app_data(state).configure(configure_routes)).await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/shipping/customers/{}/locations", acme))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 2);

        let req = test::TestRequest::get()
            .uri(&format!("/api/shipping/address?customerId={}", acme))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["receiver_name"], "Acme Freight");
        assert_eq!(body["data"]["receiver_city"], "Montreal");

        let req = test::TestRequest::get().uri("/api/shipping/address").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
    }
}
