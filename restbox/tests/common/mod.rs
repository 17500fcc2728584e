//! In-memory transport for client tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use restbox::{RestError, RestRequest, Transport, TransportResponse};

/// Transport that records every request and answers from a script.
///
/// When the script is exhausted the default response is returned. Clones
/// share the script and the recorded requests.
#[derive(Clone)]
pub struct MockTransport {
    script: Arc<Mutex<VecDeque<Result<TransportResponse, RestError>>>>,
    fallback: Arc<Mutex<Result<TransportResponse, RestError>>>,
    requests: Arc<Mutex<Vec<RestRequest>>>,
    delay: Option<Duration>,
}

impl MockTransport {
    /// Answers `200 []` until told otherwise.
    pub fn new() -> Self {
        Self::always(TransportResponse::new(200, "[]"))
    }

    /// Answers `response` to every request.
    pub fn always(response: TransportResponse) -> Self {
        Self {
            script: Arc::default(),
            fallback: Arc::new(Mutex::new(Ok(response))),
            requests: Arc::default(),
            delay: None,
        }
    }

    /// Fails every request with a transport error.
    pub fn failing(message: &str) -> Self {
        let transport = Self::new();
        *transport.fallback.lock().unwrap() = Err(RestError::transport(message));
        transport
    }

    /// Sleeps before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queues a one-off answer.
    pub fn push(&self, response: Result<TransportResponse, RestError>) -> &Self {
        self.script.lock().unwrap().push_back(response);
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<RestRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last(&self) -> RestRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request was sent")
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &RestRequest) -> Result<TransportResponse, RestError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.script.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| self.fallback.lock().unwrap().clone())
    }
}

/// JSON response with the given status.
pub fn json(status: u16, body: serde_json::Value) -> TransportResponse {
    TransportResponse::new(status, body.to_string())
}
