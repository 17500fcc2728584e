//! The request side of an exchange.

use chrono::{DateTime, Utc};
use http::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};
use tracing::trace;

use crate::method::Method;
use crate::params::{self, SerializeOptions};
use crate::payload::Payload;

/// Name of the cache-busting timestamp parameter.
pub const CACHE_BUSTER_PARAM: &str = "t";

const JSON_MIME: &str = "application/json";

/// Per-call options of a request.
///
/// Every field is optional; unset fields fall back to the client defaults
/// (see [`RequestOptions::merge`]).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOptions {
    /// URL parameters, merged key by key onto the default parameters.
    pub params: Option<Map<String, Value>>,
    /// Request body.
    pub data: Option<Payload>,
    /// Additional headers.
    pub headers: Option<HeaderMap>,
    /// Query object, sent as the `query` parameter.
    pub query: Option<Value>,
    /// Sort object (`{"field": "asc" | "desc"}`), sent as the `sort` parameter.
    pub sort: Option<Value>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub skip: Option<u64>,
    pub page: Option<u64>,
    /// Sent as the `perPage` parameter.
    pub per_page: Option<u64>,
    /// Case insensitive queries.
    pub nocase: Option<bool>,
    /// File extension attached to the path. An empty string disables it.
    pub format: Option<String>,
    /// Expected response format, e.g. `"json"`.
    pub data_type: Option<String>,
    pub cross_domain: Option<bool>,
    /// Attach a `t=<epoch ms>` parameter to defeat intermediate caches.
    pub force_uncached: Option<bool>,
    /// Bypass the client response cache for this call.
    pub no_cache: Option<bool>,
}

impl RequestOptions {
    /// Empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a single URL parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params
            .get_or_insert_with(Map::new)
            .insert(name.into(), value.into());
        self
    }

    /// Sets the request body.
    pub fn data(mut self, data: impl Into<Payload>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Adds a header.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers
            .get_or_insert_with(HeaderMap::new)
            .insert(name, value);
        self
    }

    pub fn query(mut self, query: impl Into<Value>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn sort(mut self, sort: impl Into<Value>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn page(mut self, page: u64) -> Self {
        self.page = Some(page);
        self
    }

    pub fn per_page(mut self, per_page: u64) -> Self {
        self.per_page = Some(per_page);
        self
    }

    pub fn nocase(mut self, nocase: bool) -> Self {
        self.nocase = Some(nocase);
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = Some(data_type.into());
        self
    }

    pub fn cross_domain(mut self, cross_domain: bool) -> Self {
        self.cross_domain = Some(cross_domain);
        self
    }

    pub fn force_uncached(mut self, force_uncached: bool) -> Self {
        self.force_uncached = Some(force_uncached);
        self
    }

    pub fn no_cache(mut self, no_cache: bool) -> Self {
        self.no_cache = Some(no_cache);
        self
    }

    /// Layers `overrides` on top of `self`.
    ///
    /// `params` are merged per key, with `overrides` winning. Every other
    /// field set in `overrides` replaces the value in `self` wholesale.
    pub fn merge(self, overrides: RequestOptions) -> RequestOptions {
        let params = match (self.params, overrides.params) {
            (Some(mut base), Some(extra)) => {
                for (name, value) in extra {
                    base.insert(name, value);
                }
                Some(base)
            }
            (base, extra) => extra.or(base),
        };

        RequestOptions {
            params,
            data: overrides.data.or(self.data),
            headers: overrides.headers.or(self.headers),
            query: overrides.query.or(self.query),
            sort: overrides.sort.or(self.sort),
            limit: overrides.limit.or(self.limit),
            offset: overrides.offset.or(self.offset),
            skip: overrides.skip.or(self.skip),
            page: overrides.page.or(self.page),
            per_page: overrides.per_page.or(self.per_page),
            nocase: overrides.nocase.or(self.nocase),
            format: overrides.format.or(self.format),
            data_type: overrides.data_type.or(self.data_type),
            cross_domain: overrides.cross_domain.or(self.cross_domain),
            force_uncached: overrides.force_uncached.or(self.force_uncached),
            no_cache: overrides.no_cache.or(self.no_cache),
        }
    }
}

/// State of one outgoing request while it travels through the pipeline.
///
/// `url` starts as `base_url + path` and is extended in place: the format
/// suffix is attached by [`prepare`](Self::prepare) and the serialized
/// parameters by [`attach_params`](Self::attach_params).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestRequest {
    pub method: Method,
    pub url: String,
    pub base_url: String,
    pub path: String,
    pub format: Option<String>,
    pub data_type: Option<String>,
    pub params: Map<String, Value>,
    pub headers: HeaderMap,
    pub data: Payload,
    pub cross_domain: bool,
    pub force_uncached: bool,
    pub query: Option<Value>,
    pub sort: Option<Value>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub skip: Option<u64>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub nocase: Option<bool>,
}

impl RestRequest {
    /// A bare request for `url` with no options.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            ..Default::default()
        }
    }

    /// Builds the request for `base_url + path` from resolved options.
    pub fn from_options(
        method: Method,
        base_url: impl Into<String>,
        path: impl Into<String>,
        options: RequestOptions,
    ) -> Self {
        let base_url = base_url.into();
        let path = path.into();
        Self {
            method,
            url: format!("{base_url}{path}"),
            base_url,
            path,
            format: options.format.filter(|format| !format.is_empty()),
            data_type: options.data_type,
            params: options.params.unwrap_or_default(),
            headers: options.headers.unwrap_or_default(),
            data: options.data.unwrap_or_default(),
            cross_domain: options.cross_domain.unwrap_or(false),
            force_uncached: options.force_uncached.unwrap_or(false),
            query: options.query,
            sort: options.sort,
            limit: options.limit,
            offset: options.offset,
            skip: options.skip,
            page: options.page,
            per_page: options.per_page,
            nocase: options.nocase,
        }
    }

    /// Returns `true` when the expected response format is JSON.
    pub fn expects_json(&self) -> bool {
        self.data_type.as_deref() == Some("json")
    }

    /// Prepares the request before the request filters run.
    ///
    /// Injects the cache-busting timestamp, copies the query helper options
    /// into `params`, sets JSON headers for the `json` data type and attaches
    /// the format suffix to the URL path.
    pub fn prepare(&mut self, now: DateTime<Utc>) {
        if self.force_uncached {
            self.params.insert(
                CACHE_BUSTER_PARAM.to_owned(),
                Value::from(now.timestamp_millis()),
            );
        }

        let helpers = [
            ("query", self.query.clone()),
            ("sort", self.sort.clone()),
            ("limit", self.limit.map(Value::from)),
            ("offset", self.offset.map(Value::from)),
            ("skip", self.skip.map(Value::from)),
            ("page", self.page.map(Value::from)),
            ("perPage", self.per_page.map(Value::from)),
            ("nocase", self.nocase.map(Value::from)),
        ];
        for (name, value) in helpers {
            if let Some(value) = value {
                self.params.insert(name.to_owned(), value);
            }
        }

        if self.expects_json() {
            let json = HeaderValue::from_static(JSON_MIME);
            if !self.headers.contains_key(ACCEPT) {
                self.headers.insert(ACCEPT, json.clone());
            }
            if !self.headers.contains_key(CONTENT_TYPE) {
                self.headers.insert(CONTENT_TYPE, json);
            }
        }

        if let Some(format) = &self.format {
            self.url = match self.url.split_once('?') {
                Some((path, query)) => format!("{path}.{format}?{query}"),
                None => format!("{}.{format}", self.url),
            };
        }
        trace!(method = %self.method, url = %self.url, "request prepared");
    }

    /// Serializes `params` and appends them to the URL.
    pub fn attach_params(&mut self, options: &SerializeOptions) {
        let query = params::serialize(&self.params, options);
        if query.is_empty() {
            return;
        }
        let separator = if self.url.contains('?') { '&' } else { '?' };
        self.url.push(separator);
        self.url.push_str(&query);
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    #[test]
    fn merge_combines_params_and_replaces_other_fields() {
        let defaults = RequestOptions::new()
            .param("api_key", "secret")
            .param("lang", "en")
            .format("json");
        let call = RequestOptions::new().param("lang", "de").format("xml");

        let merged = defaults.merge(call);

        assert_eq!(
            Value::Object(merged.params.unwrap()),
            json!({"api_key": "secret", "lang": "de"})
        );
        assert_eq!(merged.format.as_deref(), Some("xml"));
    }

    #[test]
    fn prepare_builds_url_shape() {
        let options = RequestOptions::new()
            .format("json")
            .data_type("json")
            .force_uncached(true)
            .limit(10);
        let mut request = RestRequest::from_options(Method::Get, "http://api", "/todos", options);

        request.prepare(at(1_700_000_000_000));
        request.attach_params(&SerializeOptions::default());

        assert_eq!(request.url, "http://api/todos.json?t=1700000000000&limit=10");
        assert_eq!(request.headers[ACCEPT], JSON_MIME);
        assert_eq!(request.headers[CONTENT_TYPE], JSON_MIME);
    }

    #[test]
    fn format_goes_before_existing_query() {
        let options = RequestOptions::new().format("xml").param("b", 2);
        let mut request =
            RestRequest::from_options(Method::Get, "http://api", "/items?a=1", options);

        request.prepare(at(0));
        request.attach_params(&SerializeOptions::default());

        assert_eq!(request.url, "http://api/items.xml?a=1&b=2");
    }

    #[test]
    fn empty_format_is_ignored() {
        let options = RequestOptions::new().format("");
        let mut request = RestRequest::from_options(Method::Get, "http://api", "/todos", options);
        request.prepare(at(0));
        assert_eq!(request.url, "http://api/todos");
    }

    #[test]
    fn query_helpers_become_params() {
        let options = RequestOptions::new()
            .query(json!({"done": false}))
            .sort(json!({"created": "desc"}))
            .per_page(20)
            .nocase(true);
        let mut request = RestRequest::from_options(Method::Get, "", "/todos", options);

        request.prepare(at(0));

        assert_eq!(
            Value::Object(request.params.clone()),
            json!({
                "query": {"done": false},
                "sort": {"created": "desc"},
                "perPage": 20,
                "nocase": true
            })
        );
    }

    #[test]
    fn explicit_headers_survive_prepare() {
        let options = RequestOptions::new()
            .data_type("json")
            .header(ACCEPT, HeaderValue::from_static("application/hal+json"));
        let mut request = RestRequest::from_options(Method::Get, "", "/", options);

        request.prepare(at(0));

        assert_eq!(request.headers[ACCEPT], "application/hal+json");
        assert_eq!(request.headers[CONTENT_TYPE], JSON_MIME);
    }
}
