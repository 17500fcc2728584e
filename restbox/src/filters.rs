//! Filters shipped with the client.
//!
//! [`RestClient`](crate::RestClient) registers [`JsonRequestBody`],
//! [`JsonResponseBody`] and [`NormalizeErrors`] on construction, and
//! [`MethodOverride`] in front of them when
//! [`ClientConfig::method_override`](crate::ClientConfig::method_override) is
//! enabled.

use async_trait::async_trait;
use http::HeaderValue;
use http::header::HeaderName;
use restbox_core::normalize::normalize;
use restbox_core::{Method, Payload, RestError, RestRequest, RestResponse};
use serde_json::{Map, Value};
use tracing::trace;

use crate::pipeline::{ErrorFilter, RequestFilter, ResponseFilter};

/// Header carrying the original method of an overridden request.
pub const METHOD_OVERRIDE_HEADER: HeaderName = HeaderName::from_static("x-http-method-override");

/// Parameter and body field carrying the original method of an overridden request.
pub const METHOD_OVERRIDE_PARAM: &str = "_method";

/// Encodes structured request bodies as JSON text.
///
/// Applies only when the request expects JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRequestBody;

#[async_trait]
impl RequestFilter for JsonRequestBody {
    async fn on_request(&self, request: &mut RestRequest) -> Result<(), RestError> {
        if !request.expects_json() {
            return Ok(());
        }
        if let Payload::Json(value) = &request.data {
            request.data = Payload::Text(value.to_string());
        }
        Ok(())
    }
}

/// Decodes textual response data as JSON.
///
/// An empty body becomes [`Payload::Empty`]. Text that is not valid JSON is
/// left untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonResponseBody;

#[async_trait]
impl ResponseFilter for JsonResponseBody {
    async fn on_response(
        &self,
        request: &RestRequest,
        response: &mut RestResponse,
    ) -> Result<(), RestError> {
        if !request.expects_json() {
            return Ok(());
        }
        let Payload::Text(text) = &response.data else {
            return Ok(());
        };

        if text.is_empty() {
            response.data = Payload::Empty;
            return Ok(());
        }
        match serde_json::from_str::<Value>(text) {
            Ok(value) => response.data = Payload::Json(value),
            Err(err) => trace!(error = %err, "response body is not JSON, keeping text"),
        }
        Ok(())
    }
}

/// Turns failing responses into [`RestError::Status`].
///
/// See [`normalize`] for the recognised body shapes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeErrors;

#[async_trait]
impl ErrorFilter for NormalizeErrors {
    async fn on_error(
        &self,
        error: Option<RestError>,
        _request: &RestRequest,
        response: &RestResponse,
    ) -> Option<RestError> {
        normalize(error, response)
    }
}

/// Tunnels `PUT` and `DELETE` through `POST` for servers that only accept
/// `GET` and `POST`.
///
/// The original method is sent three ways: as the `_method` parameter, as a
/// `_method` field of an object body (an empty body becomes one), and in the
/// `X-HTTP-METHOD-OVERRIDE` header.
#[derive(Debug, Clone, Copy, Default)]
pub struct MethodOverride;

#[async_trait]
impl RequestFilter for MethodOverride {
    async fn on_request(&self, request: &mut RestRequest) -> Result<(), RestError> {
        let original = request.method;
        if !matches!(original, Method::Put | Method::Delete) {
            return Ok(());
        }

        let name = Value::from(original.as_str());
        request
            .params
            .insert(METHOD_OVERRIDE_PARAM.to_owned(), name.clone());

        match &mut request.data {
            Payload::Empty => {
                let mut body = Map::new();
                body.insert(METHOD_OVERRIDE_PARAM.to_owned(), name);
                request.data = Payload::Json(Value::Object(body));
            }
            Payload::Json(Value::Object(body)) => {
                body.insert(METHOD_OVERRIDE_PARAM.to_owned(), name);
            }
            _ => trace!("request body is not an object, method field not added"),
        }

        request.headers.insert(
            METHOD_OVERRIDE_HEADER,
            HeaderValue::from_static(original.as_str()),
        );
        request.method = Method::Post;
        trace!(original = %original, "method overridden");
        Ok(())
    }
}
