//! Boundary to the component that actually performs HTTP calls.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::HeaderMap;

use crate::error::RestError;
use crate::request::RestRequest;

/// Status, headers and body received from the network.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }
}

/// Sends fully prepared requests over the wire.
///
/// The request URL already contains the format suffix and the serialized
/// parameters, and `data` holds the encoded body. Implementations must return
/// failure statuses as `Ok`; `Err` is reserved for exchanges that produced no
/// response at all.
///
/// # Examples
///
/// ```rust,ignore
/// use restbox_core::{RestError, RestRequest, Transport, TransportResponse};
///
/// struct Canned;
///
/// #[async_trait::async_trait]
/// impl Transport for Canned {
///     async fn send(&self, _request: &RestRequest) -> Result<TransportResponse, RestError> {
///         Ok(TransportResponse::new(200, r#"{"ok":true}"#))
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs the exchange.
    async fn send(&self, request: &RestRequest) -> Result<TransportResponse, RestError>;
}

#[async_trait]
impl<T> Transport for Arc<T>
where
    T: Transport + ?Sized,
{
    async fn send(&self, request: &RestRequest) -> Result<TransportResponse, RestError> {
        self.as_ref().send(request).await
    }
}

#[async_trait]
impl<T> Transport for Box<T>
where
    T: Transport + ?Sized,
{
    async fn send(&self, request: &RestRequest) -> Result<TransportResponse, RestError> {
        self.as_ref().send(request).await
    }
}
