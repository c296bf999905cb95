//! HTTP response model.

use crate::error::HttpError;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// Decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// No body: 204s, HEAD responses, protocol upgrades.
    None,
    /// A single decoded JSON value, keys already in caller style.
    Json(Value),
    /// One decoded value per line of a streaming JSON body.
    JsonSeq(Vec<Value>),
    /// A `text/plain` body.
    Text(String),
    /// Anything else, verbatim.
    Bytes(Vec<u8>),
}

/// Error shape the daemon uses for failed requests.
#[derive(Debug, Deserialize)]
struct DaemonMessage {
    message: String,
}

/// A fully-read HTTP response.
///
/// Header names are stored lowercased and compared lowercased.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: ResponseBody,
}

impl Response {
    /// Looks up a header by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The body as JSON, if it decoded as a single value.
    #[must_use]
    pub fn json(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Consumes the response into its JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Unsupported`] if the body is not JSON.
    pub fn into_json(self) -> Result<Value, HttpError> {
        match self.body {
            ResponseBody::Json(v) => Ok(v),
            other => Err(HttpError::Unsupported(format!(
                "expected a JSON body, got {}",
                body_kind(&other)
            ))),
        }
    }

    /// Consumes the response into its JSON-sequence body.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Unsupported`] if the body is not a sequence.
    pub fn into_json_seq(self) -> Result<Vec<Value>, HttpError> {
        match self.body {
            ResponseBody::JsonSeq(values) => Ok(values),
            // A single-object stream decodes the same way.
            ResponseBody::Json(v) => Ok(vec![v]),
            other => Err(HttpError::Unsupported(format!(
                "expected a JSON sequence body, got {}",
                body_kind(&other)
            ))),
        }
    }

    /// Consumes the response into its text body.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Unsupported`] if the body is not text.
    pub fn into_text(self) -> Result<String, HttpError> {
        match self.body {
            ResponseBody::Text(s) => Ok(s),
            ResponseBody::None => Ok(String::new()),
            other => Err(HttpError::Unsupported(format!(
                "expected a text body, got {}",
                body_kind(&other)
            ))),
        }
    }

    /// Consumes the response into raw body bytes.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Unsupported`] if the body was decoded as
    /// something other than bytes or text.
    pub fn into_bytes(self) -> Result<Vec<u8>, HttpError> {
        match self.body {
            ResponseBody::Bytes(b) => Ok(b),
            ResponseBody::Text(s) => Ok(s.into_bytes()),
            ResponseBody::None => Ok(Vec::new()),
            other => Err(HttpError::Unsupported(format!(
                "expected a byte body, got {}",
                body_kind(&other)
            ))),
        }
    }

    /// The daemon's error message, when the body is JSON carrying one.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        let value = self.json()?;
        serde_json::from_value::<DaemonMessage>(value.clone())
            .ok()
            .map(|m| m.message)
    }

    /// Asserts the status is one of `accepted`, passing the response
    /// through on success.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::UnexpectedStatus`] carrying the full
    /// response and the daemon's `message` field when present.
    pub fn assert_status(self, accepted: &[u16]) -> Result<Self, HttpError> {
        if accepted.contains(&self.status) {
            return Ok(self);
        }
        let message = self
            .error_message()
            .unwrap_or_else(|| "request failed".to_string());
        Err(HttpError::UnexpectedStatus {
            status: self.status,
            message,
            response: Box::new(self),
        })
    }
}

const fn body_kind(body: &ResponseBody) -> &'static str {
    match body {
        ResponseBody::None => "no body",
        ResponseBody::Json(_) => "JSON",
        ResponseBody::JsonSeq(_) => "a JSON sequence",
        ResponseBody::Text(_) => "text",
        ResponseBody::Bytes(_) => "bytes",
    }
}
