//! Metrics declaration and recording.

use std::time::Duration;

use restbox_core::Method;

use crate::cache::CacheStatus;

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    // Cache status metrics

    /// Track number of cache hit events.
    pub static ref CACHE_HIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "restbox_cache_hit_total",
            "Total number of responses served from the response cache."
        );
        "restbox_cache_hit_total"
    };
    /// Track number of cache miss events.
    pub static ref CACHE_MISS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "restbox_cache_miss_total",
            "Total number of cacheable requests not found in the response cache."
        );
        "restbox_cache_miss_total"
    };

    // Request metrics

    /// Track number of exchanges per method.
    pub static ref REQUESTS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "restbox_requests_total",
            "Total number of requests issued through the client."
        );
        "restbox_requests_total"
    };
    /// Histogram of exchange duration, pipeline included.
    pub static ref REQUEST_DURATION: &'static str = {
        metrics::describe_histogram!(
            "restbox_request_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of requests in seconds, filters included."
        );
        "restbox_request_duration_seconds"
    };
}

/// Records one finished exchange.
///
/// When the `metrics` feature is disabled, this function is a no-op.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_request(method: Method, status: CacheStatus, duration: Duration) {
    let method = method.as_str();

    metrics::counter!(*REQUESTS_COUNTER, "method" => method).increment(1);
    metrics::histogram!(
        *REQUEST_DURATION,
        "method" => method,
        "cache" => status.as_str()
    )
    .record(duration.as_secs_f64());

    match status {
        CacheStatus::Hit => metrics::counter!(*CACHE_HIT_COUNTER).increment(1),
        CacheStatus::Miss => metrics::counter!(*CACHE_MISS_COUNTER).increment(1),
        CacheStatus::Bypass => {}
    }
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_request(_method: Method, _status: CacheStatus, _duration: Duration) {}
