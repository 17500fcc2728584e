//! The response side of an exchange.

use http::HeaderMap;

use crate::error::RestError;
use crate::payload::Payload;
use crate::transport::TransportResponse;

/// Result of one exchange as seen by the response and error filters.
///
/// Only `data` and `error` are expected to change after construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestResponse {
    /// `None` when the transport failed before any status was received.
    pub status_code: Option<u16>,
    pub headers: HeaderMap,
    /// Raw body first, then whatever the response filters decoded.
    pub data: Payload,
    pub error: Option<RestError>,
}

impl RestResponse {
    pub fn new(status_code: u16, headers: HeaderMap, data: impl Into<Payload>) -> Self {
        Self {
            status_code: Some(status_code),
            headers,
            data: data.into(),
            error: None,
        }
    }

    /// A response standing for a failed transport call.
    pub fn from_error(error: RestError) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }

    /// Returns `true` for a status of 400 or above.
    pub fn is_failure(&self) -> bool {
        self.status_code.is_some_and(|status| status >= 400)
    }

    /// Splits the outcome into the decoded data or the final error.
    pub fn into_result(self) -> Result<Payload, RestError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.data),
        }
    }
}

impl From<TransportResponse> for RestResponse {
    fn from(response: TransportResponse) -> Self {
        Self {
            status_code: Some(response.status),
            headers: response.headers,
            data: Payload::from_body(response.body),
            error: None,
        }
    }
}
