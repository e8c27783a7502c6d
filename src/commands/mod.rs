//! JSON command protocol
//!
//! One JSON object in, one JSON object out. The `rpc` subcommand reads a
//! command from stdin for process-level callers; the HTTP handlers build the
//! same commands and map the responses onto status codes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, instrument};
use utoipa::ToSchema;

use crate::address_book::{AddressBook, AddressBookError};
use crate::carrier::CarrierError;
use crate::db::models::{CustomerUpdate, LocationUpdate, NewLocation, NewOrder, OrderStatus};
use crate::db::DbError;
use crate::domain::{PackageDetails, ShipmentRecord, ShipmentResult};
use crate::shipping::ShippingError;

/// Errors in the envelope of a command, before it reaches the address book
#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("No input provided")]
    NoInput,

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("{0} required")]
    MissingField(&'static str),
}

impl CommandError {
    fn error_type(&self) -> &'static str {
        match self {
            CommandError::NoInput | CommandError::InvalidJson(_) => "InvalidInput",
            CommandError::InvalidCommand(_) => "InvalidCommand",
            CommandError::MissingField(_) => "MissingField",
        }
    }
}

/// A command, selected by its `action` field
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
    SearchCustomers {
        #[serde(default)]
        search_term: String,
    },
    SearchLocations {
        #[serde(default)]
        search_term: String,
    },
    GetCustomerLocations {
        customer_id: Option<i64>,
    },
    GetOrderWithDetails {
        order_id: Option<String>,
    },
    GetPendingOrders,
    CustomerOrders {
        customer_id: Option<i64>,
        status: Option<OrderStatus>,
    },
    AddCustomer {
        customer_name: Option<String>,
        carrier_account: Option<String>,
    },
    UpdateCustomer {
        customer_id: Option<i64>,
        customer_name: Option<String>,
        carrier_account: Option<String>,
    },
    DeleteCustomer {
        customer_id: Option<i64>,
    },
    AddLocation {
        customer_id: Option<i64>,
        location_name: Option<String>,
        address_street: Option<String>,
        address_city: Option<String>,
        address_province: Option<String>,
        address_postal: Option<String>,
        address_country: Option<String>,
        phone_number: Option<String>,
        #[serde(default)]
        is_default: bool,
    },
    UpdateLocation {
        location_id: Option<i64>,
        location_name: Option<String>,
        address_street: Option<String>,
        address_city: Option<String>,
        address_province: Option<String>,
        address_postal: Option<String>,
        address_country: Option<String>,
        phone_number: Option<String>,
        is_default: Option<bool>,
    },
    DeleteLocation {
        location_id: Option<i64>,
    },
    CreateOrder {
        order_id: Option<String>,
        customer_id: Option<i64>,
        location_id: Option<i64>,
        weight: Option<f64>,
        service_id: Option<String>,
        reference: Option<String>,
    },
    ShipOrder {
        order_id: Option<String>,
        package_data: Option<PackageDetails>,
    },
    ShipToLocation {
        location_id: Option<i64>,
        package_data: Option<PackageDetails>,
    },
    ShipToCustomer {
        customer_id: Option<i64>,
        location_id: Option<i64>,
        package_data: Option<PackageDetails>,
    },
    BatchShipOrders {
        #[serde(default)]
        order_ids: Vec<String>,
    },
    GetShippingAddress {
        customer_id: Option<i64>,
        location_id: Option<i64>,
    },
    QuickLookup {
        #[serde(default)]
        search_term: String,
    },
    CreateShipmentDirect {
        shipment_data: Option<ShipmentRecord>,
    },
}

impl Command {
    pub fn action(&self) -> &'static str {
        match self {
            Command::SearchCustomers { .. } => "search_customers",
            Command::SearchLocations { .. } => "search_locations",
            Command::GetCustomerLocations { .. } => "get_customer_locations",
            Command::GetOrderWithDetails { .. } => "get_order_with_details",
            Command::GetPendingOrders => "get_pending_orders",
            Command::CustomerOrders { .. } => "customer_orders",
            Command::AddCustomer { .. } => "add_customer",
            Command::UpdateCustomer { .. } => "update_customer",
            Command::DeleteCustomer { .. } => "delete_customer",
            Command::AddLocation { .. } => "add_location",
            Command::UpdateLocation { .. } => "update_location",
            Command::DeleteLocation { .. } => "delete_location",
            Command::CreateOrder { .. } => "create_order",
            Command::ShipOrder { .. } => "ship_order",
            Command::ShipToLocation { .. } => "ship_to_location",
            Command::ShipToCustomer { .. } => "ship_to_customer",
            Command::BatchShipOrders { .. } => "batch_ship_orders",
            Command::GetShippingAddress { .. } => "get_shipping_address",
            Command::QuickLookup { .. } => "quick_lookup",
            Command::CreateShipmentDirect { .. } => "create_shipment_direct",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Command response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Response {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl Response {
    pub fn success<T: Serialize>(data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Response {
                status: ResponseStatus::Success,
                data: Some(data),
                message: None,
                error_type: None,
            },
            Err(e) => Response::error(format!("Failed to encode response: {}", e), Some("Serialization")),
        }
    }

    pub fn error(message: impl Into<String>, error_type: Option<&str>) -> Self {
        Response {
            status: ResponseStatus::Error,
            data: None,
            message: Some(message.into()),
            error_type: error_type.map(str::to_string),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    /// Carrier rejections are errors that still carry the full result
    fn shipment(result: ShipmentResult) -> Self {
        if result.is_success() {
            return Response::success(&result);
        }
        let mut response = Response::success(&result);
        response.status = ResponseStatus::Error;
        response.message = Some(result.message);
        response.error_type = Some("CarrierRejected".to_string());
        response
    }
}

impl From<CommandError> for Response {
    fn from(e: CommandError) -> Self {
        Response::error(e.to_string(), Some(e.error_type()))
    }
}

impl From<AddressBookError> for Response {
    fn from(e: AddressBookError) -> Self {
        let error_type = match &e {
            AddressBookError::NotFound(_) => "NotFound",
            AddressBookError::Store(DbError::NotFound(_)) => "NotFound",
            AddressBookError::Store(_) => "DatabaseError",
            AddressBookError::Shipping(s) => match s {
                ShippingError::LocationNotFound(_) | ShippingError::OrderNotFound(_) => "NotFound",
                ShippingError::AlreadyShipped { .. } => "AlreadyShipped",
                ShippingError::OrderCancelled(_) => "OrderCancelled",
                ShippingError::Validation(_) => "ValidationError",
                ShippingError::Store(_) => "DatabaseError",
                ShippingError::Carrier(CarrierError::NotConfigured(_)) => "NotConfigured",
                ShippingError::Carrier(_) => "CarrierError",
                ShippingError::Csv(_) | ShippingError::Io(_) => "IoError",
            },
        };
        Response::error(e.to_string(), Some(error_type))
    }
}

/// Parse raw input into a command
pub fn parse_command(input: &str) -> Result<Command, CommandError> {
    if input.trim().is_empty() {
        return Err(CommandError::NoInput);
    }
    let value: Value = serde_json::from_str(input).map_err(|e| CommandError::InvalidJson(e.to_string()))?;
    serde_json::from_value(value).map_err(|e| CommandError::InvalidCommand(e.to_string()))
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, CommandError> {
    value.ok_or(CommandError::MissingField(field))
}

fn non_empty(value: Option<String>, field: &'static str) -> Result<String, CommandError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(CommandError::MissingField(field))
}

/// Run one command against the address book
#[instrument(skip(book, command), fields(action = command.action()))]
pub async fn dispatch(book: &AddressBook, command: Command) -> Response {
    match execute(book, command).await {
        Ok(response) => response,
        Err(DispatchError::Command(e)) => e.into(),
        Err(DispatchError::AddressBook(e)) => e.into(),
    }
}

enum DispatchError {
    Command(CommandError),
    AddressBook(AddressBookError),
}

impl From<CommandError> for DispatchError {
    fn from(e: CommandError) -> Self {
        DispatchError::Command(e)
    }
}

impl From<AddressBookError> for DispatchError {
    fn from(e: AddressBookError) -> Self {
        DispatchError::AddressBook(e)
    }
}

async fn execute(book: &AddressBook, command: Command) -> Result<Response, DispatchError> {
    let response = match command {
        Command::SearchCustomers { search_term } => {
            Response::success(&book.search_customers(&search_term).await?)
        }
        Command::SearchLocations { search_term } => {
            Response::success(&book.search_locations(&search_term).await?)
        }
        Command::GetCustomerLocations { customer_id } => {
            let customer_id = required(customer_id, "customer_id")?;
            Response::success(&book.customer_locations(customer_id).await?)
        }
        Command::GetOrderWithDetails { order_id } => {
            let order_id = non_empty(order_id, "order_id")?;
            match book.get_order_with_details(&order_id).await? {
                Some(details) => Response::success(&details),
                None => Response::error(format!("Order {} not found", order_id), Some("NotFound")),
            }
        }
        Command::GetPendingOrders => Response::success(&book.pending_orders().await?),
        Command::CustomerOrders { customer_id, status } => {
            let customer_id = required(customer_id, "customer_id")?;
            Response::success(&book.customer_orders(customer_id, status).await?)
        }
        Command::AddCustomer {
            customer_name,
            carrier_account,
        } => {
            let name = non_empty(customer_name, "customer_name")?;
            let account = carrier_account.filter(|a| !a.trim().is_empty());
            Response::success(&book.add_customer(name.trim(), account.as_deref()).await?)
        }
        Command::UpdateCustomer {
            customer_id,
            customer_name,
            carrier_account,
        } => {
            let customer_id = required(customer_id, "customer_id")?;
            let update = CustomerUpdate {
                customer_name,
                carrier_account,
            };
            Response::success(&book.update_customer(customer_id, &update).await?)
        }
        Command::DeleteCustomer { customer_id } => {
            let customer_id = required(customer_id, "customer_id")?;
            book.delete_customer(customer_id).await?;
            Response::success(&serde_json::json!({ "customer_id": customer_id, "message": "Customer deleted" }))
        }
        Command::AddLocation {
            customer_id,
            location_name,
            address_street,
            address_city,
            address_province,
            address_postal,
            address_country,
            phone_number,
            is_default,
        } => {
            let location = NewLocation {
                customer_id: required(customer_id, "customer_id")?,
                location_name: non_empty(location_name, "location_name")?,
                address_street: non_empty(address_street, "address_street")?,
                address_city: non_empty(address_city, "address_city")?,
                address_province: non_empty(address_province, "address_province")?,
                address_postal: non_empty(address_postal, "address_postal")?,
                address_country: address_country.unwrap_or_default(),
                phone_number: phone_number.filter(|p| !p.trim().is_empty()),
                is_default,
            };
            Response::success(&book.add_location(&location).await?)
        }
        Command::UpdateLocation {
            location_id,
            location_name,
            address_street,
            address_city,
            address_province,
            address_postal,
            address_country,
            phone_number,
            is_default,
        } => {
            let location_id = required(location_id, "location_id")?;
            let update = LocationUpdate {
                location_name,
                address_street,
                address_city,
                address_province,
                address_postal,
                address_country,
                phone_number,
                is_default,
            };
            Response::success(&book.update_location(location_id, &update).await?)
        }
        Command::DeleteLocation { location_id } => {
            let location_id = required(location_id, "location_id")?;
            book.delete_location(location_id).await?;
            Response::success(&serde_json::json!({ "location_id": location_id, "message": "Location deleted" }))
        }
        Command::CreateOrder {
            order_id,
            customer_id,
            location_id,
            weight,
            service_id,
            reference,
        } => {
            let order = NewOrder {
                order_id: non_empty(order_id, "order_id")?,
                customer_id: required(customer_id, "customer_id")?,
                location_id: required(location_id, "location_id")?,
                weight,
                service_id,
                reference,
            };
            book.create_order(&order).await?;
            Response::success(&serde_json::json!({ "order_id": order.order_id, "message": "Order created" }))
        }
        Command::ShipOrder { order_id, package_data } => {
            let order_id = non_empty(order_id, "order_id")?;
            Response::shipment(book.ship_order(&order_id, package_data.as_ref()).await?)
        }
        Command::ShipToLocation { location_id, package_data } => {
            let location_id = required(location_id, "location_id")?;
            Response::shipment(book.ship_to_location(location_id, package_data.as_ref()).await?)
        }
        Command::ShipToCustomer {
            customer_id,
            location_id,
            package_data,
        } => {
            let customer_id = required(customer_id, "customer_id")?;
            Response::shipment(
                book.ship_to_customer(customer_id, location_id, package_data.as_ref())
                    .await?,
            )
        }
        Command::BatchShipOrders { order_ids } => {
            if order_ids.is_empty() {
                return Err(CommandError::MissingField("order_ids").into());
            }
            Response::success(&book.batch_ship_orders(&order_ids).await)
        }
        Command::GetShippingAddress { customer_id, location_id } => {
            Response::success(&book.get_shipping_address(customer_id, location_id).await?)
        }
        Command::QuickLookup { search_term } => Response::success(&book.quick_lookup(&search_term).await?),
        Command::CreateShipmentDirect { shipment_data } => {
            let record = required(shipment_data, "shipment_data")?;
            Response::shipment(book.create_shipment_direct(record).await?)
        }
    };
    Ok(response)
}

/// Parse and run raw input
pub async fn handle_input(book: &AddressBook, input: &str) -> Response {
    match parse_command(input) {
        Ok(command) => {
            debug!(action = command.action(), "Command received");
            dispatch(book, command).await
        }
        Err(e) => e.into(),
    }
}

/// Read one command from stdin and write the response to stdout
pub async fn run_stdio(book: &AddressBook) -> std::io::Result<()> {
    let mut input = String::new();
    tokio::io::stdin().read_to_string(&mut input).await?;

    let response = handle_input(book, &input).await;
    let encoded = serde_json::to_string(&response).map_err(std::io::Error::other)?;

    let mut stdout = tokio::io::stdout();
    stdout.write_all(encoded.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}
