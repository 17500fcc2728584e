//! # restbox-core
//!
//! Value types shared by the restbox crates.
//!
//! This crate holds the protocol model that the middleware pipeline in
//! `restbox` operates on, and the single trait integrations implement:
//!
//! - [`RestRequest`] / [`RequestOptions`] - the outgoing side of an exchange
//! - [`RestResponse`] / [`Payload`] - the incoming side
//! - [`RestError`] - every failure surfaced to callers
//! - [`params`] - query string serialization of nested parameters
//! - [`normalize`](normalize::normalize) - structured errors from failing responses
//! - [`Transport`] - the network boundary

pub mod error;
pub mod method;
pub mod normalize;
pub mod params;
pub mod payload;
pub mod request;
pub mod response;
pub mod transport;

pub use error::{FailureDetail, RestError, Result};
pub use method::Method;
pub use params::{ArrayStyle, SerializeOptions};
pub use payload::Payload;
pub use request::{CACHE_BUSTER_PARAM, RequestOptions, RestRequest};
pub use response::RestResponse;
pub use transport::{Transport, TransportResponse};
