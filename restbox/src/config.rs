//! Client configuration.
//!
//! [`ClientConfig`] holds the defaults applied to every request of a
//! [`RestClient`](crate::RestClient). It can be built in code or deserialized:
//!
//! ```
//! use std::time::Duration;
//! use restbox::ClientConfig;
//!
//! let config: ClientConfig = serde_json::from_str(r#"{
//!     "default_params": {"api_key": "secret"},
//!     "cache_lifetime": "5m",
//!     "method_override": true
//! }"#).unwrap();
//!
//! assert_eq!(config.cache_lifetime, Duration::from_secs(300));
//! assert_eq!(config.default_format, "json");
//! ```

use std::time::Duration;

use restbox_core::{ArrayStyle, RequestOptions, SerializeOptions};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Defaults of a [`RestClient`](crate::RestClient).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Parameters sent with every request. Per-call parameters win per key.
    pub default_params: Map<String, Value>,
    /// Extension attached to every path (`"json"` gives `/todos.json`).
    /// Empty disables the suffix.
    pub default_format: String,
    /// Expected response format. `"json"` enables the JSON headers and the
    /// JSON body filters.
    pub default_data_type: String,
    pub cross_domain: bool,
    /// Attach a `t=<epoch ms>` parameter to every request.
    pub force_uncached: bool,
    /// Time to live of cached `GET` responses (e.g. `"30s"`, `"5m"`).
    /// Zero disables the response cache.
    #[serde(with = "humantime_serde")]
    pub cache_lifetime: Duration,
    /// How sequences are written in the query string.
    pub param_style: ArrayStyle,
    /// Serialize `null` parameters as `key=` instead of dropping them.
    pub include_empty_params: bool,
    /// Tunnel `PUT` and `DELETE` through `POST`.
    pub method_override: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_params: Map::new(),
            default_format: "json".to_owned(),
            default_data_type: "json".to_owned(),
            cross_domain: false,
            force_uncached: true,
            cache_lifetime: Duration::ZERO,
            param_style: ArrayStyle::default(),
            include_empty_params: false,
            method_override: false,
        }
    }
}

impl ClientConfig {
    /// Options every call is merged onto.
    pub fn default_options(&self) -> RequestOptions {
        let mut options = RequestOptions::new()
            .format(self.default_format.clone())
            .data_type(self.default_data_type.clone())
            .cross_domain(self.cross_domain)
            .force_uncached(self.force_uncached);
        if !self.default_params.is_empty() {
            options.params = Some(self.default_params.clone());
        }
        options
    }

    /// Query string settings derived from this configuration.
    pub fn serialize_options(&self) -> SerializeOptions {
        SerializeOptions {
            style: self.param_style,
            include_empty: self.include_empty_params,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.default_format, "json");
        assert_eq!(config.default_data_type, "json");
        assert!(config.force_uncached);
        assert!(config.cache_lifetime.is_zero());
        assert_eq!(config.param_style, ArrayStyle::Index);
    }

    #[test]
    fn deserializes_partial_documents() {
        let config: ClientConfig = serde_json::from_value(json!({
            "default_format": "",
            "cache_lifetime": "1m 30s",
            "param_style": "consolidate",
            "force_uncached": false
        }))
        .unwrap();

        assert_eq!(config.default_format, "");
        assert_eq!(config.cache_lifetime, Duration::from_secs(90));
        assert_eq!(config.param_style, ArrayStyle::Consolidate);
        assert!(!config.force_uncached);
        assert_eq!(config.default_data_type, "json");
    }

    #[test]
    fn default_options_carry_params_and_format() {
        let config = ClientConfig {
            default_params: Map::from_iter([("api_key".to_owned(), json!("secret"))]),
            ..ClientConfig::default()
        };

        let options = config.default_options();

        assert_eq!(
            options.params.map(Value::Object),
            Some(json!({"api_key": "secret"}))
        );
        assert_eq!(options.format.as_deref(), Some("json"));
        assert_eq!(options.force_uncached, Some(true));
        assert_eq!(options.no_cache, None);
    }
}
