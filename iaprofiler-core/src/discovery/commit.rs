//! Commit step: write the project, then register discovered files.

use super::DiscoveredAssets;
use crate::{
    Result,
    client::CatalogClient,
    error::ProfilerError,
    internal::{FileRegistration, InternalEndpoints},
    project::ProjectWrite,
    search::{Condition, SearchQuery},
};
use serde::Serialize;
use tracing::{info, warn};

/// Connector name of a host's local file system.
pub const LOCAL_FILE_CONNECTOR: &str = "LocalFileConnector";

/// What a commit did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitReport {
    /// Whether the project was created or updated
    pub write: ProjectWrite,
    /// Hosts whose files were registered, in order
    pub hosts: Vec<String>,
    pub registered_files: usize,
}

impl CatalogClient {
    /// Writes the discovered assets to the project, then registers the
    /// discovered files host by host.
    ///
    /// Create versus update is decided once, before anything is written.
    ///
    /// # Errors
    /// Returns transport or status errors; `NotFound`/`Ambiguous` if the
    /// project's workspace cannot be resolved by description or a host has
    /// no local file-system connection.
    pub async fn commit_project(
        &self,
        project: &str,
        description: &str,
        assets: &DiscoveredAssets,
    ) -> Result<CommitReport> {
        let write = ProjectWrite::for_existing(self.project_exists(project).await?);
        let document = assets.to_project(project, description);
        self.write_project(&document, write).await?;

        let mut report = CommitReport {
            write,
            hosts: Vec::new(),
            registered_files: 0,
        };
        if assets.files.is_empty() {
            return Ok(report);
        }

        let workspace = self.find_workspace_by_description(description).await?;
        for host in assets.file_hosts() {
            let connection_id = self.local_file_connection(host).await?;
            let files: Vec<FileRegistration> = assets
                .files_on(host)
                .map(|entry| FileRegistration {
                    data_connection_id: connection_id.clone(),
                    folder: entry.folder.clone(),
                    file: entry.file.clone(),
                })
                .collect();
            self.register_files(&workspace.id, &files).await?;
            report.registered_files = report.registered_files.saturating_add(files.len());
            report.hosts.push(host.to_string());
        }

        info!(
            "Registered {} files from {} hosts with '{}'",
            report.registered_files,
            report.hosts.len(),
            project
        );
        Ok(report)
    }

    /// Id of the host's local file-system data connection.
    ///
    /// # Errors
    /// Returns `NotFound` if the host has none, otherwise transport or
    /// status errors.
    pub async fn local_file_connection(&self, host: &str) -> Result<String> {
        let query = SearchQuery::for_type_names(&["data_connection"])
            .with_properties(&["name", "data_connectors.host.name", "data_connectors.name"])
            .with_condition(Condition::equals("data_connectors.host.name", host))
            .with_condition(Condition::equals("data_connectors.name", LOCAL_FILE_CONNECTOR));
        let connections = self.search(&query).await?;
        if connections.len() > 1 {
            warn!(
                "{} local file connections on {}, using the first",
                connections.len(),
                host
            );
        }
        connections
            .into_iter()
            .next()
            .map(|connection| connection.id)
            .ok_or_else(|| ProfilerError::not_found("local file connection", host))
    }
}
