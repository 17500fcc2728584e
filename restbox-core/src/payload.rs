//! Body of a request and data of a response.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A request body or response data value at some stage of the pipeline.
///
/// Request bodies usually start as [`Payload::Json`] and are encoded to
/// [`Payload::Text`] by a request filter. Response data starts as
/// [`Payload::Text`] (or [`Payload::Binary`] for non UTF-8 bodies) and is
/// decoded by response filters.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    /// No body at all.
    #[default]
    Empty,
    /// Textual body, raw or already encoded.
    Text(String),
    /// Structured value.
    Json(Value),
    /// Body that is not valid UTF-8.
    Binary(Bytes),
}

impl Payload {
    /// Returns `true` for [`Payload::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }

    /// Returns the string form of a textual payload or a JSON string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            Payload::Json(Value::String(text)) => Some(text),
            _ => None,
        }
    }

    /// Returns the structured value, if the payload has been decoded.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Payload::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Deserializes a decoded payload into `T`.
    ///
    /// Text payloads are parsed first, so this also works when no JSON
    /// response filter is registered.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        match self {
            Payload::Json(value) => T::deserialize(value),
            Payload::Text(text) => serde_json::from_str(text),
            Payload::Binary(bytes) => serde_json::from_slice(bytes),
            Payload::Empty => T::deserialize(Value::Null),
        }
    }

    /// Raw bytes to put on the wire, `None` for an empty body.
    ///
    /// Structured values are serialized as compact JSON.
    pub fn to_bytes(&self) -> Option<Bytes> {
        match self {
            Payload::Empty => None,
            Payload::Text(text) => Some(Bytes::copy_from_slice(text.as_bytes())),
            Payload::Json(value) => Some(Bytes::from(value.to_string())),
            Payload::Binary(bytes) => Some(bytes.clone()),
        }
    }

    /// Builds a payload from a received body.
    pub fn from_body(body: Bytes) -> Self {
        match String::from_utf8(body.to_vec()) {
            Ok(text) => Payload::Text(text),
            Err(_) => Payload::Binary(body),
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::Text(value)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Payload::Text(value.to_owned())
    }
}

impl From<Bytes> for Payload {
    fn from(value: Bytes) -> Self {
        Payload::Binary(value)
    }
}
