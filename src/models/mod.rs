//! Request and response bodies of the HTTP API

pub mod requests;
pub mod responses;

pub use requests::{validate_key, AppendRequest, PutRequest, MAX_KEY_LENGTH};
pub use responses::{
    ExpiryInfo, ExpiryResponse, HealthResponse, StatsResponse, ValueResponse, WheelInfo,
};
