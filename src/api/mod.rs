//! API Module
//!
//! HTTP surface of the session cache. Keys are a resource under `/keys`;
//! see [`create_router`] for the endpoint list.

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
