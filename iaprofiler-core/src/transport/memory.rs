//! In-process transport that answers requests from a closure.
//!
//! Used by the test suites in place of a live catalog, and by tooling that
//! replays captured responses.

use super::{CatalogResponse, CatalogTransport, Method, RequestBody};
use crate::{Result, error::ProfilerError};
use async_trait::async_trait;
use std::sync::Mutex;

/// A request seen by a [`MemoryTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    /// Path including any query string
    pub path: String,
    pub body: Option<RequestBody>,
}

impl RecordedRequest {
    /// Path without the query string.
    pub fn route(&self) -> &str {
        self.path.split_once('?').map_or(self.path.as_str(), |(route, _)| route)
    }

    /// Decoded value of a query parameter.
    pub fn query_param(&self, key: &str) -> Option<String> {
        let (_, query) = self.path.split_once('?')?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// The JSON body, if any.
    pub fn json_body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref().and_then(RequestBody::as_json)
    }

    /// The XML body, if any.
    pub fn xml_body(&self) -> Option<&str> {
        self.body.as_ref().and_then(RequestBody::as_xml)
    }
}

type Responder = dyn Fn(&RecordedRequest) -> Result<CatalogResponse> + Send + Sync;

/// Transport that records every request and answers it from a closure.
///
/// Responses with a non-2xx status are turned into
/// [`ProfilerError::Status`], matching [`super::HttpTransport`].
///
/// # Example
/// ```rust
/// use iaprofiler_core::transport::{CatalogResponse, MemoryTransport};
///
/// let transport = MemoryTransport::new(|request| {
///     assert!(request.route().ends_with("/projects"));
///     Ok(CatalogResponse::ok("<Projects/>"))
/// });
/// assert!(transport.requests().is_empty());
/// ```
pub struct MemoryTransport {
    responder: Box<Responder>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("requests", &self.request_count())
            .finish_non_exhaustive()
    }
}

impl MemoryTransport {
    /// Creates a transport answering with `responder`.
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&RecordedRequest) -> Result<CatalogResponse> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// All requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    /// Number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|requests| requests.len()).unwrap_or(0)
    }

    /// Requests whose route (path without query) equals `route`.
    pub fn requests_to(&self, route: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.route() == route)
            .collect()
    }
}

#[async_trait]
impl CatalogTransport for MemoryTransport {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
    ) -> Result<CatalogResponse> {
        let request = RecordedRequest {
            method,
            path: path.to_string(),
            body,
        };
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let response = (self.responder)(&request)?;
        if !response.is_success() {
            return Err(ProfilerError::Status {
                status: response.status,
                method: method.to_string(),
                path: path.to_string(),
                body: response.body,
            });
        }
        Ok(response)
    }
}
