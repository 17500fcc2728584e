//! Turns failing responses into structured errors.
//!
//! Servers report failures in a handful of common body shapes. [`normalize`]
//! recognises them in this order:
//!
//! 1. `{"error": "message"}`
//! 2. `{"error": {"message": "...", "stack": "..."}}`
//! 3. `{"errors": ["first", "second"]}`, joined with newlines
//! 4. `{"errors": {"field": "problem"}}`, as `field: problem` lines
//! 5. a plain string body
//! 6. any other object, using `message` (or `Unknown Error`), `stack`, and
//!    `code` or `name`

use serde_json::{Map, Value};

use crate::error::{FailureDetail, RestError};
use crate::payload::Payload;
use crate::response::RestResponse;

/// Message used when the body carries no usable description.
pub const UNKNOWN_ERROR: &str = "Unknown Error";

/// Synthesizes an error for a failing response.
///
/// An existing `error` is returned unchanged, as is the absence of one when
/// the status is below 400 or missing. Otherwise the result is a
/// [`RestError::Status`] whose detail carries the response status code.
pub fn normalize(error: Option<RestError>, response: &RestResponse) -> Option<RestError> {
    if error.is_some() {
        return error;
    }
    let status = response.status_code.filter(|status| *status >= 400)?;

    let mut detail = detail_from_data(&response.data);
    detail.status_code = Some(status);
    Some(RestError::Status(detail))
}

fn detail_from_data(data: &Payload) -> FailureDetail {
    match data {
        Payload::Json(Value::Object(body)) => detail_from_object(body),
        Payload::Json(Value::String(message)) | Payload::Text(message) => {
            FailureDetail::new(message.clone())
        }
        _ => FailureDetail::new(UNKNOWN_ERROR),
    }
}

fn detail_from_object(body: &Map<String, Value>) -> FailureDetail {
    match body.get("error") {
        Some(Value::String(message)) => return FailureDetail::new(message.clone()),
        Some(Value::Object(error)) => {
            if let Some(message) = error.get("message") {
                let mut detail = FailureDetail::new(text(message));
                detail.stack = error.get("stack").map(text);
                return detail;
            }
        }
        _ => {}
    }

    match body.get("errors") {
        Some(Value::Array(messages)) => {
            let lines: Vec<String> = messages.iter().map(text).collect();
            return FailureDetail::new(lines.join("\n"));
        }
        Some(Value::Object(fields)) => {
            let lines: Vec<String> = fields
                .iter()
                .map(|(field, problem)| format!("{field}: {}", text(problem)))
                .collect();
            return FailureDetail::new(lines.join("\n"));
        }
        _ => {}
    }

    let mut detail = FailureDetail::new(
        body.get("message")
            .map(text)
            .unwrap_or_else(|| UNKNOWN_ERROR.to_owned()),
    );
    detail.stack = body.get("stack").map(text);
    detail.name = [body.get("code"), body.get("name")]
        .into_iter()
        .flatten()
        .find(|value| !value.is_null())
        .map(text);
    detail
}

fn text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
