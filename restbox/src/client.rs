//! The client facade.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use restbox_core::{
    ArrayStyle, Method, Payload, RequestOptions, RestError, RestRequest, RestResponse,
    SerializeOptions, Transport,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{CacheStats, CacheStatus, Clock, ResponseCache, SystemClock};
use crate::config::ClientConfig;
use crate::filters::{JsonRequestBody, JsonResponseBody, MethodOverride, NormalizeErrors};
use crate::metrics;
use crate::pipeline::{ErrorFilter, Filter, Pipeline, RequestFilter, ResponseFilter};

/// Base URL used when the client is created with an empty one.
pub const DEFAULT_BASE_URL: &str = "http://localhost";

/// Client for one REST backend.
///
/// Every call goes through the same sequence:
///
/// 1. per-call options are merged onto the client defaults and the request is
///    prepared (timestamp, query helpers, JSON headers, format suffix);
/// 2. the request chain runs, then the parameters are appended to the URL;
/// 3. cacheable `GET`s are answered from the [`ResponseCache`] when possible,
///    otherwise the [`Transport`] sends the request;
/// 4. the response chain runs, then the error chain decides the final error;
/// 5. fresh cacheable responses are stored.
///
/// Cloning is cheap; clones share filters, cache and transport.
///
/// # Examples
///
/// ```rust,ignore
/// use std::time::Duration;
/// use restbox::{RequestOptions, RestClient};
/// use restbox_reqwest::ReqwestTransport;
///
/// let client = RestClient::builder("https://api.example.com")
///     .transport(ReqwestTransport::default())
///     .default_param("api_key", "secret")
///     .cache_lifetime(Duration::from_secs(30))
///     .build();
///
/// let todos = client.get("/todos", RequestOptions::new().limit(10)).await?;
/// ```
#[derive(Clone)]
pub struct RestClient {
    inner: Arc<Inner>,
}

struct Inner {
    base_url: String,
    config: ClientConfig,
    defaults: RequestOptions,
    serialize: SerializeOptions,
    transport: Arc<dyn Transport>,
    pipeline: Pipeline,
    cache: ResponseCache,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.inner.base_url)
            .field("config", &self.inner.config)
            .field("pipeline", &self.inner.pipeline)
            .field("cache", &self.inner.cache)
            .finish_non_exhaustive()
    }
}

impl RestClient {
    /// Creates a [`RestClientBuilder`] for `base_url`.
    pub fn builder(base_url: impl Into<String>) -> RestClientBuilder<NotSet> {
        RestClientBuilder::new(base_url)
    }

    /// Creates a client from a configuration, with the built-in filters.
    pub fn from_config<T>(base_url: impl Into<String>, config: ClientConfig, transport: T) -> Self
    where
        T: Transport + 'static,
    {
        Self::builder(base_url)
            .config(config)
            .transport(transport)
            .build()
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The filter chains of this client.
    pub fn pipeline(&self) -> &Pipeline {
        &self.inner.pipeline
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.inner.cache
    }

    /// Hit counters of the response cache.
    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    /// Appends a stage to the request chain.
    pub fn on_request(&self, filter: Arc<dyn RequestFilter>) -> &Self {
        self.inner.pipeline.on_request(filter);
        self
    }

    /// Appends a stage to the response chain.
    pub fn on_response(&self, filter: Arc<dyn ResponseFilter>) -> &Self {
        self.inner.pipeline.on_response(filter);
        self
    }

    /// Appends a stage to the error chain.
    pub fn on_error(&self, filter: Arc<dyn ErrorFilter>) -> &Self {
        self.inner.pipeline.on_error(filter);
        self
    }

    /// Appends a tagged filter to its chain.
    pub fn use_filter(&self, filter: Filter) -> &Self {
        self.inner.pipeline.use_filter(filter);
        self
    }

    /// Removes one registration of `filter`. See [`Pipeline::unuse`].
    pub fn unuse<T: ?Sized>(&self, filter: &Arc<T>) -> bool {
        self.inner.pipeline.unuse(filter)
    }

    /// Performs one exchange and returns the final response.
    ///
    /// The final error, if any, is in [`RestResponse::error`].
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> (RestResponse, CacheStatus) {
        let started = Instant::now();
        let inner = &*self.inner;

        let options = inner.defaults.clone().merge(options);
        let no_cache = options.no_cache.unwrap_or(false);

        let mut request = RestRequest::from_options(method, inner.base_url.as_str(), path, options);
        request.prepare(inner.clock.now());

        let request_error = inner.pipeline.run_request(&mut request).await;
        request.attach_params(&inner.serialize);

        let cacheable = request.method == Method::Get && inner.cache.is_enabled() && !no_cache;
        let cached = if cacheable {
            inner.cache.get(&request.url)
        } else {
            None
        };

        let (mut response, status) = match cached {
            Some(mut response) => {
                debug!(method = %request.method, url = %request.url, "replaying cached response");
                response.error = None;
                (response, CacheStatus::Hit)
            }
            None => {
                let response = self.send(&request).await;
                let status = if cacheable {
                    CacheStatus::Miss
                } else {
                    CacheStatus::Bypass
                };
                (response, status)
            }
        };

        let seed = request_error.or_else(|| response.error.take());
        let error = inner
            .pipeline
            .run_response(seed, &request, &mut response)
            .await;
        response.error = inner.pipeline.run_error(error, &request, &response).await;

        if status == CacheStatus::Miss && response.status_code.is_some() {
            inner.cache.set(&request.url, &response);
        }

        metrics::record_request(request.method, status, started.elapsed());
        (response, status)
    }

    async fn send(&self, request: &RestRequest) -> RestResponse {
        debug!(method = %request.method, url = %request.url, "sending request");
        match self.inner.transport.send(request).await {
            Ok(response) => RestResponse::from(response),
            Err(err) => {
                warn!(method = %request.method, url = %request.url, error = %err, "transport failed");
                RestResponse::from_error(err)
            }
        }
    }

    /// Performs one exchange and returns the decoded data or the final error.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<Payload, RestError> {
        let (response, _) = self.execute(method, path, options).await;
        response.into_result()
    }

    /// Like [`request`](Self::request), also handing `(error, data)` to
    /// `callback` before returning.
    pub async fn request_with_callback<F>(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
        callback: F,
    ) -> Result<Payload, RestError>
    where
        F: FnOnce(Option<&RestError>, &Payload),
    {
        let (response, _) = self.execute(method, path, options).await;
        callback(response.error.as_ref(), &response.data);
        response.into_result()
    }

    pub async fn get(&self, path: &str, options: RequestOptions) -> Result<Payload, RestError> {
        self.request(Method::Get, path, options).await
    }

    /// Alias of [`get`](Self::get).
    pub async fn read(&self, path: &str, options: RequestOptions) -> Result<Payload, RestError> {
        self.get(path, options).await
    }

    pub async fn post(&self, path: &str, options: RequestOptions) -> Result<Payload, RestError> {
        self.request(Method::Post, path, options).await
    }

    /// Alias of [`post`](Self::post).
    pub async fn create(&self, path: &str, options: RequestOptions) -> Result<Payload, RestError> {
        self.post(path, options).await
    }

    pub async fn put(&self, path: &str, options: RequestOptions) -> Result<Payload, RestError> {
        self.request(Method::Put, path, options).await
    }

    /// Alias of [`put`](Self::put).
    pub async fn update(&self, path: &str, options: RequestOptions) -> Result<Payload, RestError> {
        self.put(path, options).await
    }

    pub async fn patch(&self, path: &str, options: RequestOptions) -> Result<Payload, RestError> {
        self.request(Method::Patch, path, options).await
    }

    pub async fn del(&self, path: &str, options: RequestOptions) -> Result<Payload, RestError> {
        self.request(Method::Delete, path, options).await
    }

    /// Alias of [`del`](Self::del).
    pub async fn remove(&self, path: &str, options: RequestOptions) -> Result<Payload, RestError> {
        self.del(path, options).await
    }
}

/// Marker type for unset builder fields.
///
/// When you see `NotSet` in a compiler error, it means you haven't called
/// [`RestClientBuilder::transport`] yet.
pub struct NotSet;

/// Builder for [`RestClient`].
///
/// Use [`RestClient::builder()`] to create a new builder.
pub struct RestClientBuilder<T = NotSet> {
    base_url: String,
    transport: T,
    config: ClientConfig,
    clock: Arc<dyn Clock>,
    filters: Vec<Filter>,
}

impl RestClientBuilder<NotSet> {
    /// Creates a builder with the default configuration and no transport.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            transport: NotSet,
            config: ClientConfig::default(),
            clock: Arc::new(SystemClock),
            filters: Vec::new(),
        }
    }
}

impl<T> RestClientBuilder<T> {
    /// Sets the transport requests are sent with.
    pub fn transport<U>(self, transport: U) -> RestClientBuilder<U>
    where
        U: Transport + 'static,
    {
        RestClientBuilder {
            base_url: self.base_url,
            transport,
            config: self.config,
            clock: self.clock,
            filters: self.filters,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(self, config: ClientConfig) -> Self {
        Self { config, ..self }
    }

    /// Adds a parameter sent with every request.
    pub fn default_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.default_params.insert(name.into(), value.into());
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.config.default_format = format.into();
        self
    }

    pub fn data_type(mut self, data_type: impl Into<String>) -> Self {
        self.config.default_data_type = data_type.into();
        self
    }

    pub fn cross_domain(mut self, cross_domain: bool) -> Self {
        self.config.cross_domain = cross_domain;
        self
    }

    pub fn force_uncached(mut self, force_uncached: bool) -> Self {
        self.config.force_uncached = force_uncached;
        self
    }

    /// Enables the response cache. Zero disables it.
    pub fn cache_lifetime(mut self, lifetime: Duration) -> Self {
        self.config.cache_lifetime = lifetime;
        self
    }

    pub fn param_style(mut self, style: ArrayStyle) -> Self {
        self.config.param_style = style;
        self
    }

    pub fn method_override(mut self, enabled: bool) -> Self {
        self.config.method_override = enabled;
        self
    }

    /// Sets the time source of the cache and the cache-busting timestamp.
    pub fn clock(self, clock: impl Clock + 'static) -> Self {
        Self {
            clock: Arc::new(clock),
            ..self
        }
    }

    /// Registers a filter after the built-in ones.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }
}

impl<T> RestClientBuilder<T>
where
    T: Transport + 'static,
{
    /// Builds the [`RestClient`].
    pub fn build(self) -> RestClient {
        let base_url = if self.base_url.is_empty() {
            DEFAULT_BASE_URL.to_owned()
        } else {
            self.base_url
        };

        let pipeline = Pipeline::new();
        if self.config.method_override {
            pipeline.on_request(Arc::new(MethodOverride));
        }
        pipeline.on_request(Arc::new(JsonRequestBody));
        pipeline.on_response(Arc::new(JsonResponseBody));
        pipeline.on_error(Arc::new(NormalizeErrors));
        for filter in self.filters {
            pipeline.use_filter(filter);
        }

        let cache = ResponseCache::new(self.config.cache_lifetime, self.clock.clone());
        debug!(base_url = %base_url, cache_lifetime = ?self.config.cache_lifetime, "client created");

        RestClient {
            inner: Arc::new(Inner {
                base_url,
                defaults: self.config.default_options(),
                serialize: self.config.serialize_options(),
                config: self.config,
                transport: Arc::new(self.transport),
                pipeline,
                cache,
                clock: self.clock,
            }),
        }
    }
}
