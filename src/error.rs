//! Error types for cloud access and overlay synchronization.
//!
//! All fallible operations in this crate return [`Result<T>`], an alias over
//! [`CloudError`].
//!
//! # Error Kinds
//!
//! | Variant | Raised by | Recovery |
//! |---------|-----------|----------|
//! | [`CloudError::DataConflict`] | `patch_for_device` / `patch_for_stream` | Re-fetch, discard the delta, or ask the user |
//! | [`CloudError::InvalidArgument`] | Delta constructors and factories | Programmer error |
//! | [`CloudError::UnknownSlugType`] | `patch_model` | Programmer error |
//! | [`CloudError::Http`] | Transport failures | Caller may retry |
//! | [`CloudError::Api`] | Non-2xx responses from the cloud | Inspect [`HttpError`] |
//!
//! Applying and pruning an overlay never fail: conflicts only surface on the
//! path that is about to push data to the cloud.

use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, CloudError>;

/// User-facing text attached to every data conflict.
pub const CONFLICT_USER_MESSAGE: &str =
    "The same setting has also been modified in the cloud, please resync before trying to update.";

/// Errors produced by the SDK.
#[derive(Debug, thiserror::Error)]
pub enum CloudError {
    /// A pending delta no longer matches the server state.
    #[error("{user_message} ({technical_message})")]
    DataConflict {
        /// Message suitable for display to an end user
        user_message: String,
        /// Names the offending delta's classname, slug and id
        technical_message: String,
    },

    /// A constructor or factory received arguments it cannot work with.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A slug that is neither a device (`d--`) nor a stream (`s--`) slug.
    #[error("Unknown slug type: {0}")]
    UnknownSlugType(String),

    /// Transport level failure (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The cloud answered with a non-success status.
    #[error("{0}")]
    Api(HttpError),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server URL could not be parsed or joined.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// No server was configured or marked as default.
    #[error("No server has been set")]
    NoServer,
}

impl CloudError {
    /// Build a conflict error for the delta identified by the arguments.
    pub fn conflict(classname: &str, slug: &str, id: &str) -> Self {
        CloudError::DataConflict {
            user_message: CONFLICT_USER_MESSAGE.to_string(),
            technical_message: format!(
                "Conflict in {} for slug: {} guid: {}",
                classname, slug, id
            ),
        }
    }

    /// Whether a caller could reasonably retry the failed request.
    pub fn is_retryable(&self) -> bool {
        match self {
            CloudError::Http(_) => true,
            CloudError::Api(err) => crate::client::is_retryable_status(err.status),
            _ => false,
        }
    }

    /// Whether this is a data conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, CloudError::DataConflict { .. })
    }
}

impl From<reqwest::Error> for CloudError {
    fn from(err: reqwest::Error) -> Self {
        CloudError::Http(err.to_string())
    }
}

/// A structured error response from the cloud.
///
/// The cloud reports validation problems either as per-field messages
/// (`{"data_label": ["Ensure this field..."]}`) or as general messages under
/// `detail`, `message` or `non_field_errors`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpError {
    /// HTTP status code
    pub status: u16,
    /// Canonical reason phrase
    pub status_text: String,
    /// Request method, upper case
    pub method: Option<String>,
    /// Request URL
    pub url: Option<String>,
    /// Messages attached to specific fields
    pub field_errors: IndexMap<String, String>,
    /// Messages not attached to a field
    pub non_field_errors: Vec<String>,
}

impl HttpError {
    /// Parse an error body returned with `status`.
    pub fn from_response(status: u16, status_text: &str, body: &str) -> Self {
        let mut err = HttpError {
            status,
            status_text: if status_text.is_empty() {
                "Unknown Issue".to_string()
            } else {
                status_text.to_string()
            },
            ..Default::default()
        };

        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(fields)) => {
                for (name, value) in fields {
                    match name.as_str() {
                        "status" => {}
                        "message" | "detail" => err.non_field_errors.push(value_text(&value)),
                        "non_field_errors" => match value {
                            Value::Array(items) => {
                                err.non_field_errors.extend(items.iter().map(value_text))
                            }
                            other => err.non_field_errors.push(value_text(&other)),
                        },
                        _ => {
                            let msg = match &value {
                                Value::Array(items) => {
                                    items.iter().map(value_text).collect::<String>()
                                }
                                other => value_text(other),
                            };
                            err.field_errors.insert(name, msg);
                        }
                    }
                }
            }
            _ if !body.trim().is_empty() => err.non_field_errors.push(body.trim().to_string()),
            _ => {}
        }

        err
    }

    /// Attach the request that produced this error.
    pub fn with_request(mut self, method: &str, url: &str) -> Self {
        self.method = Some(method.to_uppercase());
        self.url = Some(url.to_string());
        self
    }

    fn format_field_errors(&self) -> String {
        let mut msg = String::new();
        if !self.non_field_errors.is_empty() {
            for err in &self.non_field_errors {
                msg.push(' ');
                msg.push_str(err);
            }
        } else if !self.field_errors.is_empty() {
            msg.push_str(" (");
            for (name, err) in &self.field_errors {
                msg.push_str(&format!(" {}: {}", name, err));
            }
            msg.push_str(" )");
        }
        msg
    }

    /// Short message, e.g. `Error! ( data_label: too long )`.
    pub fn short_user_message(&self) -> String {
        let details = self.format_field_errors();
        if details.is_empty() {
            format!("Error! {}", self.status_text)
        } else {
            format!("Error!{}", details)
        }
    }

    /// Long message including the status, e.g. `Error 400! Bad Request: ( ... )`.
    pub fn long_user_message(&self) -> String {
        let details = self.format_field_errors();
        if details.is_empty() {
            format!("Error {}! {}", self.status, self.status_text)
        } else {
            format!("Error {}! {}:{}", self.status, self.status_text, details)
        }
    }

    /// Long message plus the request that failed, when known.
    pub fn extra_info(&self) -> String {
        match (&self.method, &self.url) {
            (Some(method), Some(url)) => {
                format!("{} -> {}:{}", self.long_user_message(), method, url)
            }
            _ => self.long_user_message(),
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.extra_info())
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
