//! [`Transport`] over a `reqwest::Client`.

use async_trait::async_trait;
use restbox_core::{RestError, RestRequest, Transport, TransportResponse};
use tracing::trace;

/// Sends restbox requests with `reqwest`.
///
/// Failure statuses are returned as regular responses so the error chain can
/// normalize them; only errors raised by `reqwest` itself (connection,
/// redirect loops, body read...) become [`RestError::Transport`].
///
/// # Examples
///
/// ```rust,ignore
/// use restbox::RestClient;
/// use restbox_reqwest::ReqwestTransport;
///
/// let http = reqwest::Client::builder().build()?;
/// let client = RestClient::builder("http://localhost:3000")
///     .transport(ReqwestTransport::new(http))
///     .build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Wraps an existing client, keeping its pool and settings.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// The wrapped client.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

impl From<reqwest::Client> for ReqwestTransport {
    fn from(client: reqwest::Client) -> Self {
        Self::new(client)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &RestRequest) -> Result<TransportResponse, RestError> {
        let mut builder = self
            .client
            .request(request.method.as_http(), request.url.as_str())
            .headers(request.headers.clone());
        if let Some(body) = request.data.to_bytes() {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(transport_error)?;
        trace!(status, bytes = body.len(), url = %request.url, "response received");

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

fn transport_error(err: reqwest::Error) -> RestError {
    RestError::transport(err.to_string())
}
