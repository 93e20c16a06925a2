use crate::validation::FieldErrors;
use reqwest::StatusCode;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Could not reach the directory service")]
    Network {
        #[from]
        source: reqwest::Error,
    },
    #[error("Request rejected with status {status}: {message}")]
    Validation {
        status: StatusCode,
        message: String,
        fields: FieldErrors,
    },
    #[error("Server failed with status {status}: {message}")]
    Server { status: StatusCode, message: String },
    #[error("Not found")]
    NotFound,
    #[error("A profile already exists for this user")]
    Conflict,
    #[error("Malformed response body => {0}")]
    Decode(String),
}

impl ApiError {
    /// Classifies a non-success response by status and body.
    pub(crate) fn from_response(status: StatusCode, body: &str) -> Self {
        match status {
            StatusCode::NOT_FOUND => ApiError::NotFound,
            StatusCode::CONFLICT => ApiError::Conflict,
            s if s.is_client_error() => {
                let (message, fields) = parse_error_body(body);
                ApiError::Validation {
                    status: s,
                    message,
                    fields,
                }
            }
            s => ApiError::Server {
                status: s,
                message: parse_error_body(body).0,
            },
        }
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            ApiError::Validation { fields, .. } if !fields.is_empty() => Some(fields),
            _ => None,
        }
    }

    /// Whether repeating the same request might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Network { .. } | ApiError::Server { .. })
    }
}

/// Accepts `{"errors": {field: msg | [msg, ..]}}` and `{"message": msg}`,
/// falling back to the raw body text.
fn parse_error_body(body: &str) -> (String, FieldErrors) {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return (body.trim().to_string(), FieldErrors::new());
    };

    let fields: FieldErrors = json
        .get("errors")
        .and_then(Value::as_object)
        .map(|errors| {
            errors
                .iter()
                .filter_map(|(field, v)| {
                    let message = match v {
                        Value::String(s) => Some(s.clone()),
                        Value::Array(items) => items.iter().find_map(Value::as_str).map(String::from),
                        _ => None,
                    }?;
                    Some((field.clone(), message))
                })
                .collect()
        })
        .unwrap_or_default();

    let message = json
        .get("message")
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| {
            if fields.is_empty() {
                body.trim().to_string()
            } else {
                fields.to_string()
            }
        });

    (message, fields)
}
