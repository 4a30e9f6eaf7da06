//! Peer-to-peer tool rental backend.
//!
//! Layout: [`handlers`] decode HTTP requests and call [`services`], which
//! hold the business rules and reach persistence only through the traits in
//! [`store`]. [`db`] provides the PostgreSQL implementation.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod store;
pub mod telemetry;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use error::{ApiResult, Error, ErrorCode};
