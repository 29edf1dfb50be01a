//! Request transport for the catalog services.
//!
//! Every catalog operation goes through [`CatalogTransport`]. Two
//! implementations ship with the crate:
//! - [`HttpTransport`]: authenticated HTTPS via reqwest, with a connection
//!   cap and a pluggable [`RetryPolicy`]
//! - [`MemoryTransport`]: an in-process responder used by tests and offline
//!   tooling
//!
//! # Error signalling
//! Any non-2xx status is fatal and surfaces as [`ProfilerError::Status`].
//! Implementations never hand a non-2xx [`CatalogResponse`] to callers.
//!
//! [`ProfilerError::Status`]: crate::error::ProfilerError::Status

use crate::{Result, error::ProfilerError};
use async_trait::async_trait;

mod http;
mod memory;
mod retry;

pub use http::HttpTransport;
pub use memory::{MemoryTransport, RecordedRequest};
pub use retry::{ExponentialBackoff, NoRetry, RequestFailure, RetryPolicy};

/// HTTP methods used by the catalog API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Upper-case method name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized with serde_json and sent as `application/json`
    Json(serde_json::Value),
    /// Sent verbatim as `text/xml`
    Xml(String),
}

impl RequestBody {
    /// Content type header value for this body.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json(_) => "application/json",
            Self::Xml(_) => "text/xml",
        }
    }

    /// Encodes the body into the bytes put on the wire.
    ///
    /// # Errors
    /// Returns a serialization error if the JSON value cannot be encoded.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Self::Json(value) => serde_json::to_vec(value)
                .map_err(|e| ProfilerError::serialization("Failed to encode JSON body", e)),
            Self::Xml(xml) => Ok(xml.as_bytes().to_vec()),
        }
    }

    /// The JSON value, if this is a JSON body.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Xml(_) => None,
        }
    }

    /// The XML text, if this is an XML body.
    pub fn as_xml(&self) -> Option<&str> {
        match self {
            Self::Json(_) => None,
            Self::Xml(xml) => Some(xml),
        }
    }
}

/// Successful catalog response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogResponse {
    /// HTTP status code (always 2xx)
    pub status: u16,
    /// Raw response text
    pub body: String,
}

impl CatalogResponse {
    /// A `200 OK` response with the given body.
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues requests against the catalog services.
///
/// `path` is absolute from the server root and may carry a query string,
/// e.g. `/ibm/iis/ia/api/project?projectName=Sales`.
///
/// # Object Safety
/// This trait is object-safe; the client holds it as
/// `Arc<dyn CatalogTransport>`.
#[async_trait]
pub trait CatalogTransport: Send + Sync {
    /// Sends one request and returns the raw response text.
    ///
    /// # Errors
    /// Returns a transport error when no response was received and a status
    /// error for any non-2xx response.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
    ) -> Result<CatalogResponse>;
}

/// Appends URL-encoded query parameters to a path.
pub(crate) fn with_query(path: &str, params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return path.to_string();
    }
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    format!("{path}?{query}")
}
