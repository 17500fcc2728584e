//! Middleware chains driving one exchange.
//!
//! A [`Pipeline`] holds three independent chains:
//!
//! - **request** filters ([`RequestFilter`]) may rewrite the outgoing request;
//! - **response** filters ([`ResponseFilter`]) may decode or rewrite the
//!   response data;
//! - **error** filters ([`ErrorFilter`]) decide the final error of the
//!   exchange.
//!
//! ## Execution
//!
//! Every run works on a snapshot of the chain taken when the run starts, so
//! filters registered or removed meanwhile only affect later runs. Stages run
//! in registration order and each one is awaited before the next starts; a
//! stage may suspend on its own asynchronous work.
//!
//! The run carries an accumulated error alongside the stages. A request or
//! response stage returning `Err(e)` replaces the accumulated error, but the
//! remaining stages **still run**, which lets logging and cleanup filters see
//! every exchange. Error stages receive the accumulated error and return the
//! one to carry on, so they can keep, replace, or clear it. The accumulated
//! error at the end of the chain is the result of the run.
//!
//! ```
//! use std::sync::Arc;
//! use restbox::pipeline::{Pipeline, request_fn};
//! use restbox_core::{Method, RestRequest};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let pipeline = Pipeline::new();
//! pipeline.on_request(Arc::new(request_fn(|request: &mut RestRequest| {
//!     request.params.insert("api_key".into(), "secret".into());
//!     Ok(())
//! })));
//!
//! let mut request = RestRequest::new(Method::Get, "http://localhost/todos");
//! assert!(pipeline.run_request(&mut request).await.is_none());
//! assert_eq!(request.params["api_key"], "secret");
//! # }
//! ```

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use restbox_core::{RestError, RestRequest, RestResponse};
use tracing::{debug, trace};

/// Stage of the request chain.
#[async_trait]
pub trait RequestFilter: Send + Sync {
    /// Inspects or rewrites the outgoing request.
    ///
    /// `Err` replaces the accumulated error of the run; later stages still run.
    async fn on_request(&self, request: &mut RestRequest) -> Result<(), RestError>;
}

/// Stage of the response chain.
#[async_trait]
pub trait ResponseFilter: Send + Sync {
    /// Inspects or rewrites the response of `request`.
    ///
    /// `Err` replaces the accumulated error of the run; later stages still run.
    async fn on_response(
        &self,
        request: &RestRequest,
        response: &mut RestResponse,
    ) -> Result<(), RestError>;
}

/// Stage of the error chain.
#[async_trait]
pub trait ErrorFilter: Send + Sync {
    /// Returns the error to carry on, given the accumulated one.
    async fn on_error(
        &self,
        error: Option<RestError>,
        request: &RestRequest,
        response: &RestResponse,
    ) -> Option<RestError>;
}

/// Identifies one of the three chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chain {
    Request,
    Response,
    Error,
}

impl Chain {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Chain::Request => "request",
            Chain::Response => "response",
            Chain::Error => "error",
        }
    }
}

/// A filter tagged with the chain it belongs to.
#[derive(Clone)]
pub enum Filter {
    Request(Arc<dyn RequestFilter>),
    Response(Arc<dyn ResponseFilter>),
    Error(Arc<dyn ErrorFilter>),
}

impl Filter {
    /// Chain this filter is registered into.
    pub fn chain(&self) -> Chain {
        match self {
            Filter::Request(_) => Chain::Request,
            Filter::Response(_) => Chain::Response,
            Filter::Error(_) => Chain::Error,
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Filter").field(&self.chain()).finish()
    }
}

type Stages<F: ?Sized> = RwLock<Vec<Arc<F>>>;

/// The three filter chains of a client.
#[derive(Default)]
pub struct Pipeline {
    request: Stages<dyn RequestFilter>,
    response: Stages<dyn ResponseFilter>,
    error: Stages<dyn ErrorFilter>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("request", &self.len(Chain::Request))
            .field("response", &self.len(Chain::Response))
            .field("error", &self.len(Chain::Error))
            .finish()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage to the request chain.
    pub fn on_request(&self, filter: Arc<dyn RequestFilter>) {
        write(&self.request).push(filter);
    }

    /// Appends a stage to the response chain.
    pub fn on_response(&self, filter: Arc<dyn ResponseFilter>) {
        write(&self.response).push(filter);
    }

    /// Appends a stage to the error chain.
    pub fn on_error(&self, filter: Arc<dyn ErrorFilter>) {
        write(&self.error).push(filter);
    }

    /// Appends a tagged filter to its chain.
    pub fn use_filter(&self, filter: Filter) {
        match filter {
            Filter::Request(filter) => self.on_request(filter),
            Filter::Response(filter) => self.on_response(filter),
            Filter::Error(filter) => self.on_error(filter),
        }
    }

    /// Removes one registration of `filter`.
    ///
    /// Chains are scanned in request, response, error order and the first
    /// stage sharing `filter`'s allocation is removed. Returns whether a
    /// stage was removed.
    pub fn unuse<T: ?Sized>(&self, filter: &Arc<T>) -> bool {
        let target = Arc::as_ptr(filter) as *const ();
        remove_first(&self.request, target)
            || remove_first(&self.response, target)
            || remove_first(&self.error, target)
    }

    /// Number of stages registered in `chain`.
    pub fn len(&self, chain: Chain) -> usize {
        match chain {
            Chain::Request => read(&self.request).len(),
            Chain::Response => read(&self.response).len(),
            Chain::Error => read(&self.error).len(),
        }
    }

    /// Returns `true` when no stage is registered in any chain.
    pub fn is_empty(&self) -> bool {
        [Chain::Request, Chain::Response, Chain::Error]
            .into_iter()
            .all(|chain| self.len(chain) == 0)
    }

    /// Runs the request chain and returns the accumulated error.
    pub async fn run_request(&self, request: &mut RestRequest) -> Option<RestError> {
        let stages = snapshot(&self.request);
        debug!(chain = Chain::Request.as_str(), stages = stages.len(), "running filters");

        let mut error = None;
        for stage in stages {
            if let Err(err) = stage.on_request(request).await {
                trace!(chain = Chain::Request.as_str(), error = %err, "filter reported an error");
                error = Some(err);
            }
        }
        error
    }

    /// Runs the response chain starting from `error`.
    pub async fn run_response(
        &self,
        mut error: Option<RestError>,
        request: &RestRequest,
        response: &mut RestResponse,
    ) -> Option<RestError> {
        let stages = snapshot(&self.response);
        debug!(chain = Chain::Response.as_str(), stages = stages.len(), "running filters");

        for stage in stages {
            if let Err(err) = stage.on_response(request, response).await {
                trace!(chain = Chain::Response.as_str(), error = %err, "filter reported an error");
                error = Some(err);
            }
        }
        error
    }

    /// Runs the error chain starting from `error`.
    pub async fn run_error(
        &self,
        mut error: Option<RestError>,
        request: &RestRequest,
        response: &RestResponse,
    ) -> Option<RestError> {
        let stages = snapshot(&self.error);
        debug!(chain = Chain::Error.as_str(), stages = stages.len(), "running filters");

        for stage in stages {
            error = stage.on_error(error, request, response).await;
        }
        error
    }
}

fn read<F: ?Sized>(stages: &Stages<F>) -> RwLockReadGuard<'_, Vec<Arc<F>>> {
    stages.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<F: ?Sized>(stages: &Stages<F>) -> RwLockWriteGuard<'_, Vec<Arc<F>>> {
    stages.write().unwrap_or_else(PoisonError::into_inner)
}

fn snapshot<F: ?Sized>(stages: &Stages<F>) -> Vec<Arc<F>> {
    read(stages).clone()
}

fn remove_first<F: ?Sized>(stages: &Stages<F>, target: *const ()) -> bool {
    let mut stages = write(stages);
    match stages
        .iter()
        .position(|stage| Arc::as_ptr(stage) as *const () == target)
    {
        Some(index) => {
            stages.remove(index);
            true
        }
        None => false,
    }
}

/// Request stage backed by a synchronous closure. See [`request_fn`].
#[derive(Clone, Copy)]
pub struct RequestFn<F>(F);

/// Wraps `f` into a [`RequestFilter`].
pub fn request_fn<F>(f: F) -> RequestFn<F>
where
    F: Fn(&mut RestRequest) -> Result<(), RestError> + Send + Sync,
{
    RequestFn(f)
}

#[async_trait]
impl<F> RequestFilter for RequestFn<F>
where
    F: Fn(&mut RestRequest) -> Result<(), RestError> + Send + Sync,
{
    async fn on_request(&self, request: &mut RestRequest) -> Result<(), RestError> {
        (self.0)(request)
    }
}

/// Response stage backed by a synchronous closure. See [`response_fn`].
#[derive(Clone, Copy)]
pub struct ResponseFn<F>(F);

/// Wraps `f` into a [`ResponseFilter`].
pub fn response_fn<F>(f: F) -> ResponseFn<F>
where
    F: Fn(&RestRequest, &mut RestResponse) -> Result<(), RestError> + Send + Sync,
{
    ResponseFn(f)
}

#[async_trait]
impl<F> ResponseFilter for ResponseFn<F>
where
    F: Fn(&RestRequest, &mut RestResponse) -> Result<(), RestError> + Send + Sync,
{
    async fn on_response(
        &self,
        request: &RestRequest,
        response: &mut RestResponse,
    ) -> Result<(), RestError> {
        (self.0)(request, response)
    }
}

/// Error stage backed by a synchronous closure. See [`error_fn`].
#[derive(Clone, Copy)]
pub struct ErrorFn<F>(F);

/// Wraps `f` into an [`ErrorFilter`].
pub fn error_fn<F>(f: F) -> ErrorFn<F>
where
    F: Fn(Option<RestError>, &RestRequest, &RestResponse) -> Option<RestError> + Send + Sync,
{
    ErrorFn(f)
}

#[async_trait]
impl<F> ErrorFilter for ErrorFn<F>
where
    F: Fn(Option<RestError>, &RestRequest, &RestResponse) -> Option<RestError> + Send + Sync,
{
    async fn on_error(
        &self,
        error: Option<RestError>,
        request: &RestRequest,
        response: &RestResponse,
    ) -> Option<RestError> {
        (self.0)(error, request, response)
    }
}
