use std::collections::BTreeMap;
use thiserror::Error;

/// Errors returned by [`ApiClient`](super::ApiClient) calls.
///
/// The feed core only distinguishes "the request failed" from "the server
/// rejected the input": every variant except [`ApiError::Validation`] is a
/// transport-level failure as far as callers are concerned.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Non-2xx response without field-level validation details
    #[error("HTTP error: status {status}{}", parenthesized(.message))]
    HttpStatus { status: u16, message: Option<String> },
    /// 400 response carrying a `validationErrors` map
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        errors: BTreeMap<String, String>,
    },
    /// Response body was not the JSON shape we expected
    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    /// Response body exceeded the size limit
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    /// Server URL could not be parsed or cannot carry a path
    #[error("Invalid server URL: {0}")]
    InvalidBaseUrl(String),
    /// Credentials would be sent in the clear to a remote host
    #[error("Insecure server URL: HTTPS required to send credentials (except localhost)")]
    InsecureBaseUrl,
    /// Local file could not be read for upload
    #[error("Failed to read upload: {0}")]
    Io(#[from] std::io::Error),
}

fn parenthesized(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(" ({m})"))
        .unwrap_or_default()
}

impl ApiError {
    /// Validation message for a single request field, if the server reported one.
    pub fn field_error(&self, field: &str) -> Option<&str> {
        match self {
            ApiError::Validation { errors, .. } => errors.get(field).map(String::as_str),
            _ => None,
        }
    }

    /// All field-level validation messages (empty for non-validation errors).
    pub fn field_errors(&self) -> BTreeMap<String, String> {
        match self {
            ApiError::Validation { errors, .. } => errors.clone(),
            _ => BTreeMap::new(),
        }
    }

    /// HTTP status code when the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::HttpStatus { status, .. } => Some(*status),
            ApiError::Validation { .. } => Some(400),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}
