//! Query string serialization of nested request parameters.
//!
//! Parameters are a JSON object; nested arrays and objects are flattened into
//! bracketed keys:
//!
//! ```
//! use restbox_core::params::{serialize, ArrayStyle, SerializeOptions};
//! use serde_json::json;
//!
//! let params = json!({"foo": [1, 2, 3], "page": {"size": 10}});
//! let query = serialize(params.as_object().unwrap(), &SerializeOptions::default());
//! assert_eq!(query, "foo[0]=1&foo[1]=2&foo[2]=3&page[size]=10");
//!
//! let repeat = SerializeOptions { style: ArrayStyle::Repeat, ..Default::default() };
//! let query = serialize(json!({"foo": [1, 2]}).as_object().unwrap(), &repeat);
//! assert_eq!(query, "foo=1&foo=2");
//! ```

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// Same set as ECMAScript's encodeURIComponent.
const COMPONENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// How sequences of values are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ArrayStyle {
    /// `key=v1&key=v2`
    Repeat,
    /// `key[0]=v1&key[1]=v2`
    #[default]
    Index,
    /// `key=v1,v2`
    Consolidate,
}

/// Options of [`serialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SerializeOptions {
    /// Layout of sequence values.
    pub style: ArrayStyle,
    /// Emit `key=` for `null` values instead of skipping them.
    pub include_empty: bool,
}

impl SerializeOptions {
    /// Options with the given array style.
    pub fn with_style(style: ArrayStyle) -> Self {
        Self {
            style,
            ..Default::default()
        }
    }
}

/// Serializes `params` into a query string without the leading `?`.
///
/// Keys are visited in map order. Key text and values are percent-encoded,
/// brackets are written literally.
pub fn serialize(params: &Map<String, Value>, options: &SerializeOptions) -> String {
    let mut pairs = Vec::new();
    for (key, value) in params {
        push_value(&mut pairs, encode(key), value, options);
    }
    pairs.join("&")
}

fn push_value(pairs: &mut Vec<String>, prefix: String, value: &Value, options: &SerializeOptions) {
    match value {
        Value::Null => {
            if options.include_empty {
                pairs.push(format!("{prefix}="));
            }
        }
        Value::Array(items) => push_sequence(pairs, prefix, items, options),
        Value::Object(map) => {
            for (key, value) in map {
                push_value(pairs, format!("{prefix}[{}]", encode(key)), value, options);
            }
        }
        scalar => {
            if let Some(text) = scalar_text(scalar) {
                pairs.push(format!("{prefix}={}", encode(&text)));
            }
        }
    }
}

fn push_sequence(
    pairs: &mut Vec<String>,
    prefix: String,
    items: &[Value],
    options: &SerializeOptions,
) {
    match options.style {
        ArrayStyle::Index => {
            for (index, item) in items.iter().enumerate() {
                push_value(pairs, format!("{prefix}[{index}]"), item, options);
            }
        }
        ArrayStyle::Repeat => {
            for (index, item) in items.iter().enumerate() {
                if is_container(item) {
                    push_value(pairs, format!("{prefix}[{index}]"), item, options);
                } else {
                    push_value(pairs, prefix.clone(), item, options);
                }
            }
        }
        ArrayStyle::Consolidate => {
            let mut joined = Vec::new();
            let mut nested = Vec::new();
            for (index, item) in items.iter().enumerate() {
                match item {
                    Value::Null if options.include_empty => joined.push(String::new()),
                    Value::Null => {}
                    item if is_container(item) => nested.push((index, item)),
                    scalar => joined.extend(scalar_text(scalar).map(|text| encode(&text))),
                }
            }
            if !joined.is_empty() {
                pairs.push(format!("{prefix}={}", joined.join(",")));
            }
            for (index, item) in nested {
                push_value(pairs, format!("{prefix}[{index}]"), item, options);
            }
        }
    }
}

fn is_container(value: &Value) -> bool {
    matches!(value, Value::Array(_) | Value::Object(_))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn encode(text: &str) -> String {
    utf8_percent_encode(text, COMPONENT_ENCODE_SET).to_string()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn run(params: Value, options: SerializeOptions) -> String {
        serialize(params.as_object().unwrap(), &options)
    }

    #[test]
    fn index_style_numbers_sequence_items() {
        assert_eq!(
            run(json!({"foo": [1, 2, 3]}), SerializeOptions::default()),
            "foo[0]=1&foo[1]=2&foo[2]=3"
        );
    }

    #[test]
    fn index_style_recurses_into_nested_containers() {
        let params = json!({
            "name": {"foo": "bar", "list": [2, 3, 4], "obj": {"a": 2, "b": {"c": 2}}}
        });
        assert_eq!(
            run(params, SerializeOptions::default()),
            "name[foo]=bar&name[list][0]=2&name[list][1]=3&name[list][2]=4&name[obj][a]=2&name[obj][b][c]=2"
        );
    }

    #[test]
    fn repeat_style_repeats_the_key() {
        let options = SerializeOptions::with_style(ArrayStyle::Repeat);
        assert_eq!(run(json!({"id": [7, 8]}), options), "id=7&id=8");
        assert_eq!(
            run(json!({"f": [1, {"a": true}]}), options),
            "f=1&f[1][a]=true"
        );
    }

    #[test]
    fn consolidate_style_joins_with_commas() {
        let options = SerializeOptions::with_style(ArrayStyle::Consolidate);
        assert_eq!(
            run(json!({"fields": ["id", "title", "due date"]}), options),
            "fields=id,title,due%20date"
        );
    }

    #[test]
    fn null_values_are_skipped_unless_requested() {
        let params = json!({"a": null, "b": 1});
        assert_eq!(run(params.clone(), SerializeOptions::default()), "b=1");

        let options = SerializeOptions {
            include_empty: true,
            ..Default::default()
        };
        assert_eq!(run(params, options), "a=&b=1");
    }

    #[test]
    fn empty_containers_contribute_nothing() {
        assert_eq!(
            run(json!({"a": [], "b": {}, "c": "x"}), SerializeOptions::default()),
            "c=x"
        );
    }

    #[test]
    fn values_are_percent_encoded() {
        assert_eq!(
            run(json!({"q": "a b&c=d", "ok": "(it's)"}), SerializeOptions::default()),
            "q=a%20b%26c%3Dd&ok=(it's)"
        );
    }

    #[test]
    fn input_is_left_untouched() {
        let params = json!({"foo": [1, {"bar": null}]});
        let before = params.clone();
        let _ = run(params.clone(), SerializeOptions::default());
        assert_eq!(params, before);
    }
}
