use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Errors that abort a bulk run before any item is processed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BulkError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
}

/// Rejection of a single item's action. Recorded on the item's outcome and
/// never propagated out of the run.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ActionError {
    #[error("request failed with status {status}")]
    Http { status: u16, body: Option<Value> },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request aborted")]
    Aborted,
    #[error("{0}")]
    Message(String),
}

impl ActionError {
    pub fn message(msg: impl Into<String>) -> Self {
        ActionError::Message(msg.into())
    }

    pub fn detail(&self) -> ErrorDetail {
        match self {
            ActionError::Http { status, body } => ErrorDetail::from_body(Some(*status), body.as_ref()),
            ActionError::Transport(msg) => ErrorDetail::new(msg.clone()),
            ActionError::Aborted => ErrorDetail::new("Request aborted"),
            ActionError::Message(msg) if msg.trim().is_empty() => ErrorDetail::new(UNKNOWN_ERROR),
            ActionError::Message(msg) => ErrorDetail::new(msg.clone()),
        }
    }
}

const UNKNOWN_ERROR: &str = "Unknown error";

// Keys that carry a generic message rather than a field error.
const MESSAGE_KEYS: &[&str] = &["detail", "message"];
const GENERIC_KEYS: &[&str] = &["non_field_errors", "__all__"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub name: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field_errors: Vec<FieldError>,
}

impl ErrorDetail {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            field_errors: Vec::new(),
        }
    }

    /// Builds a detail from an HTTP error response body.
    ///
    /// The message is taken from `detail`, then `message`, then the first
    /// generic entry of a hub-style `errors` array, then `non_field_errors` /
    /// `__all__`. Any other key holding text becomes a field error. When no
    /// message is found the first field error is used, and failing that a
    /// message derived from the status code.
    pub fn from_body(status: Option<u16>, body: Option<&Value>) -> Self {
        let mut message = None;
        let mut field_errors = Vec::new();

        match body {
            Some(Value::String(s)) => message = non_empty(s),
            Some(Value::Object(map)) => {
                message = MESSAGE_KEYS.iter().find_map(|k| map.get(*k).and_then(first_text));
                collect_hub_errors(map, &mut message, &mut field_errors);
                if message.is_none() {
                    message = GENERIC_KEYS.iter().find_map(|k| map.get(*k).and_then(first_text));
                }
                for (name, value) in map {
                    if name == "errors"
                        || MESSAGE_KEYS.contains(&name.as_str())
                        || GENERIC_KEYS.contains(&name.as_str())
                    {
                        continue;
                    }
                    if let Some(text) = first_text(value) {
                        field_errors.push(FieldError {
                            name: name.clone(),
                            message: text,
                        });
                    }
                }
            }
            _ => {}
        }

        let message = message
            .or_else(|| {
                field_errors
                    .first()
                    .map(|f| format!("{}: {}", f.name, f.message))
            })
            .unwrap_or_else(|| match status {
                Some(code) => format!("Request failed with status {code}"),
                None => UNKNOWN_ERROR.to_string(),
            });

        Self {
            message,
            status,
            field_errors,
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<&ActionError> for ErrorDetail {
    fn from(value: &ActionError) -> Self {
        value.detail()
    }
}

// Hub APIs answer with `{"errors": [{"detail": ..., "source": {"parameter": ...}}]}`.
fn collect_hub_errors(
    map: &Map<String, Value>,
    message: &mut Option<String>,
    field_errors: &mut Vec<FieldError>,
) {
    let Some(Value::Array(errors)) = map.get("errors") else {
        return;
    };
    for entry in errors {
        let Some(text) = entry
            .get("detail")
            .or_else(|| entry.get("title"))
            .and_then(first_text)
        else {
            continue;
        };
        match entry
            .get("source")
            .and_then(|s| s.get("parameter"))
            .and_then(Value::as_str)
        {
            Some(param) => field_errors.push(FieldError {
                name: param.to_string(),
                message: text,
            }),
            None if message.is_none() => *message = Some(text),
            None => {}
        }
    }
}

fn first_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s),
        Value::Array(values) => values.iter().find_map(first_text),
        _ => None,
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
