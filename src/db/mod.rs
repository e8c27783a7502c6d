//! Database module for the customer address book
//!
//! Connection pool management, the `AddressStore` contract with its Postgres
//! implementation, and CSV import/export over any store.

pub mod pool;
pub mod models;
pub mod store;
pub mod repository;
pub mod csv_io;
#[cfg(test)]
pub mod memory;

pub use pool::{DbError, DbPool};
pub use repository::PgAddressStore;
pub use store::AddressStore;
