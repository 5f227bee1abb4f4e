//! Client for the Twitter REST `application/rate_limit_status` endpoint.
//!
//! Requests flow through a shared dispatch queue to a transport worker;
//! replies are decoded into the wire shape and then translated into typed
//! domain values with parsed reset instants.

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod status;

pub use client::ApiClient;
pub use config::Config;
pub use dispatch::{dispatch_queue, DispatchClient, HttpMethod, QueryJob, QueryResponse};
pub use error::ApiError;
pub use status::{
    assemble, to_timestamp, translate, Bundle, EndpointStatus, RateLimitStatus,
    RawEndpointStatus, RawRateLimitStatus, Resources,
};
