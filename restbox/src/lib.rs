//! # restbox
//!
//! Verb-style client for REST backends where cross-cutting behavior is
//! injected as middleware instead of being hard-coded.
//!
//! A [`RestClient`] drives every call through three filter chains (request,
//! response, error) and an optional URL-keyed response cache. Sending bytes
//! over the network is delegated to a [`Transport`]; `restbox-reqwest`
//! provides one built on `reqwest`.
#![cfg_attr(docsrs, feature(doc_cfg))]

/// URL-keyed response cache.
///
/// Provides [`ResponseCache`](cache::ResponseCache), its statistics and the
/// [`Clock`](cache::Clock) it measures entry age with.
pub mod cache;

/// The [`RestClient`] facade and its builder.
pub mod client;

/// Client defaults, see [`ClientConfig`].
pub mod config;

/// Built-in filters: JSON bodies, error normalization, method override.
pub mod filters;

/// Metrics collection.
///
/// When the `metrics` feature is enabled, this module provides counters
/// and histograms for:
/// - cache hits and misses
/// - requests per method and their latency
pub mod metrics;

pub mod pipeline;

pub use cache::{CacheStats, CacheStatus, Clock, ManualClock, ResponseCache, SystemClock};
pub use client::{NotSet, RestClient, RestClientBuilder};
pub use config::ClientConfig;
pub use pipeline::{
    Chain, ErrorFilter, Filter, Pipeline, RequestFilter, ResponseFilter, error_fn, request_fn,
    response_fn,
};

pub use restbox_core::{
    ArrayStyle, FailureDetail, Method, Payload, RequestOptions, RestError, RestRequest,
    RestResponse, SerializeOptions, Transport, TransportResponse,
};

/// The `restbox` prelude.
///
/// ```rust
/// use restbox::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        ErrorFilter, Method, Payload, RequestFilter, RequestOptions, ResponseFilter, RestClient,
        RestError,
    };
}
