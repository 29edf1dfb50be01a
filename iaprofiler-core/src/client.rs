//! Catalog client shared by every operation in the crate.
//!
//! The operations themselves live next to their data types (`search`,
//! `project`, `ignore`, `discovery`, `tasks`) as further `impl CatalogClient`
//! blocks.

use crate::{
    Result,
    config::ConnectionConfig,
    security::Credentials,
    transport::{CatalogResponse, CatalogTransport, HttpTransport, Method, RequestBody},
};
use std::sync::Arc;

/// Handle to one catalog deployment.
///
/// Cheap to clone; clones share the underlying transport and therefore its
/// connection cap.
#[derive(Clone)]
pub struct CatalogClient {
    transport: Arc<dyn CatalogTransport>,
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient").finish_non_exhaustive()
    }
}

impl CatalogClient {
    /// Wraps an existing transport.
    pub fn new(transport: Arc<dyn CatalogTransport>) -> Self {
        Self { transport }
    }

    /// Connects over HTTPS.
    ///
    /// # Errors
    /// Returns a configuration error if the configuration is invalid or the
    /// credentials are incomplete. No request is issued.
    pub fn connect(config: &ConnectionConfig, credentials: Credentials) -> Result<Self> {
        Ok(Self::new(Arc::new(HttpTransport::new(config, credentials)?)))
    }

    /// The transport requests are sent through.
    pub fn transport(&self) -> &Arc<dyn CatalogTransport> {
        &self.transport
    }

    pub(crate) async fn get(&self, path: &str) -> Result<String> {
        Ok(self.transport.request(Method::Get, path, None).await?.body)
    }

    pub(crate) async fn delete(&self, path: &str) -> Result<CatalogResponse> {
        self.transport.request(Method::Delete, path, None).await
    }

    pub(crate) async fn post_xml(&self, path: &str, xml: String) -> Result<CatalogResponse> {
        self.transport
            .request(Method::Post, path, Some(RequestBody::Xml(xml)))
            .await
    }

    pub(crate) async fn send_json(
        &self,
        method: Method,
        path: &str,
        value: serde_json::Value,
    ) -> Result<String> {
        Ok(self
            .transport
            .request(method, path, Some(RequestBody::Json(value)))
            .await?
            .body)
    }
}
