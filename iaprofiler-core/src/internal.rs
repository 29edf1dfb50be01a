//! Undocumented catalog endpoints.
//!
//! The public project API cannot attach data files the way it attaches
//! tables, so files are registered through the internal data-analysis
//! service after the project exists. These endpoints are unversioned and may
//! change between catalog releases; everything that touches them goes
//! through [`InternalEndpoints`].

use crate::{
    Result,
    client::CatalogClient,
    error::ProfilerError,
    transport::{Method, with_query},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use tracing::{debug, info, warn};

/// Root of the internal data-analysis service.
pub const INTERNAL_API_PATH: &str = "/ibm/iis/dq/da/rest/v1";

fn internal_path(endpoint: &str) -> String {
    format!("{INTERNAL_API_PATH}/{endpoint}")
}

/// A workspace, the internal record behind a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A data file to register with a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRegistration {
    /// Id of the host's local file-system connection
    pub data_connection_id: String,
    /// Full folder path
    pub folder: String,
    pub file: String,
}

/// A data set of a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSet {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
}

/// Parameters of a search-index rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReindexOptions {
    pub batch_size: u32,
    pub solr_batch_size: u32,
    pub upgrade: bool,
    pub force: bool,
}

impl Default for ReindexOptions {
    fn default() -> Self {
        Self {
            batch_size: 25,
            solr_batch_size: 100,
            upgrade: false,
            force: true,
        }
    }
}

/// Listings come back either bare or wrapped in an object.
#[derive(Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Bare(Vec<T>),
    Wrapped {
        #[serde(alias = "workspaces", alias = "dataSets", alias = "rows")]
        items: Vec<T>,
    },
}

fn decode_listing<T: DeserializeOwned>(body: &str, context: &str) -> Result<Vec<T>> {
    let listing: Listing<T> = serde_json::from_str(body).map_err(|e| {
        ProfilerError::serialization(format!("Failed to decode {context} listing"), e)
    })?;
    Ok(match listing {
        Listing::Bare(items) | Listing::Wrapped { items } => items,
    })
}

/// The internal endpoints used by discovery, analysis and the CLI.
#[async_trait]
pub trait InternalEndpoints: Send + Sync {
    /// Every workspace visible to the user.
    async fn list_workspaces(&self) -> Result<Vec<Workspace>>;

    /// Registers data files and adds them to a workspace.
    async fn register_files(&self, workspace_id: &str, files: &[FileRegistration]) -> Result<()>;

    /// Data sets of a workspace whose name contains `name_filter`.
    async fn filter_data_sets(&self, workspace_id: &str, name_filter: &str) -> Result<Vec<DataSet>>;

    /// Starts column analysis of data sets.
    async fn run_column_analysis(&self, workspace_id: &str, data_set_ids: &[String]) -> Result<()>;

    /// Publishes analysis results of data sets.
    async fn publish_data_sets(&self, workspace_id: &str, data_set_ids: &[String]) -> Result<()>;

    /// Rebuilds the catalog search index and returns the service's answer.
    async fn reindex(&self, options: ReindexOptions) -> Result<String>;

    /// The single workspace whose description matches exactly.
    ///
    /// # Errors
    /// Returns `NotFound` if none matches and `Ambiguous` if several do.
    async fn find_workspace_by_description(&self, description: &str) -> Result<Workspace> {
        let mut matches: Vec<Workspace> = self
            .list_workspaces()
            .await?
            .into_iter()
            .filter(|workspace| workspace.description.as_deref() == Some(description))
            .collect();
        match matches.len() {
            1 => matches
                .pop()
                .ok_or_else(|| ProfilerError::not_found("workspace", description)),
            0 => Err(ProfilerError::not_found("workspace", description)),
            count => Err(ProfilerError::ambiguous("workspace", description, count)),
        }
    }
}

#[async_trait]
impl InternalEndpoints for CatalogClient {
    async fn list_workspaces(&self) -> Result<Vec<Workspace>> {
        let body = self.get(&internal_path("workspaces")).await?;
        decode_listing(&body, "workspace")
    }

    async fn register_files(&self, workspace_id: &str, files: &[FileRegistration]) -> Result<()> {
        if files.is_empty() {
            debug!("No files to register with workspace {}", workspace_id);
            return Ok(());
        }
        let body = json!({
            "workspaceIds": [workspace_id],
            "dataSets": files,
        });
        self.send_json(
            Method::Post,
            &internal_path("dataSets/doRegisterAndAddToWorkspaces"),
            body,
        )
        .await?;
        info!("Registered {} files with workspace {}", files.len(), workspace_id);
        Ok(())
    }

    async fn filter_data_sets(&self, workspace_id: &str, name_filter: &str) -> Result<Vec<DataSet>> {
        let body = json!({
            "workspaceId": workspace_id,
            "filter": {"name": name_filter},
        });
        let text = self
            .send_json(Method::Post, &internal_path("dataSets/doFilter"), body)
            .await?;
        decode_listing(&text, "data set")
    }

    async fn run_column_analysis(&self, workspace_id: &str, data_set_ids: &[String]) -> Result<()> {
        if data_set_ids.is_empty() {
            warn!("No data sets to analyze in workspace {}", workspace_id);
            return Ok(());
        }
        let body = json!({
            "workspaceId": workspace_id,
            "dataSetIds": data_set_ids,
            "analysisType": "columnAnalysis",
        });
        self.send_json(Method::Post, &internal_path("dataSets/doRun"), body)
            .await?;
        info!(
            "Column analysis started for {} data sets in workspace {}",
            data_set_ids.len(),
            workspace_id
        );
        Ok(())
    }

    async fn publish_data_sets(&self, workspace_id: &str, data_set_ids: &[String]) -> Result<()> {
        if data_set_ids.is_empty() {
            warn!("No data sets to publish in workspace {}", workspace_id);
            return Ok(());
        }
        let body = json!({
            "workspaceId": workspace_id,
            "dataSetIds": data_set_ids,
        });
        self.send_json(Method::Post, &internal_path("dataSets/doPublish"), body)
            .await?;
        info!(
            "Published {} data sets in workspace {}",
            data_set_ids.len(),
            workspace_id
        );
        Ok(())
    }

    async fn reindex(&self, options: ReindexOptions) -> Result<String> {
        let batch_size = options.batch_size.to_string();
        let solr_batch_size = options.solr_batch_size.to_string();
        let upgrade = options.upgrade.to_string();
        let force = options.force.to_string();
        let path = with_query(
            &internal_path("reindex"),
            &[
                ("batchSize", batch_size.as_str()),
                ("solrBatchSize", solr_batch_size.as_str()),
                ("upgrade", upgrade.as_str()),
                ("force", force.as_str()),
            ],
        );
        info!("Rebuilding the catalog search index");
        self.get(&path).await
    }
}
