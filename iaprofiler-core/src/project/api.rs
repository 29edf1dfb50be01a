//! Project lifecycle endpoints.

use super::document::ProjectDocument;
use super::responses::parse_project_names;
use crate::{Result, client::CatalogClient, transport::with_query};
use serde::Serialize;
use tracing::info;

/// Root of the public analysis API.
pub const IA_API_PATH: &str = "/ibm/iis/ia/api";

pub(crate) fn ia_path(endpoint: &str) -> String {
    format!("{IA_API_PATH}/{endpoint}")
}

/// Whether a document was posted to `create` or to `update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectWrite {
    Created,
    Updated,
}

impl ProjectWrite {
    /// `update` for a project that already exists, `create` otherwise.
    pub fn for_existing(exists: bool) -> Self {
        if exists { Self::Updated } else { Self::Created }
    }

    /// Endpoint under [`IA_API_PATH`].
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Created => "create",
            Self::Updated => "update",
        }
    }
}

impl std::fmt::Display for ProjectWrite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => f.write_str("created"),
            Self::Updated => f.write_str("updated"),
        }
    }
}

impl CatalogClient {
    /// Names of every project.
    ///
    /// # Errors
    /// Returns transport, status or XML errors.
    pub async fn list_projects(&self) -> Result<Vec<String>> {
        let body = self.get(&ia_path("projects")).await?;
        parse_project_names(&body)
    }

    /// Returns true if a project with exactly this name exists.
    ///
    /// # Errors
    /// Returns transport, status or XML errors.
    pub async fn project_exists(&self, name: &str) -> Result<bool> {
        Ok(self.list_projects().await?.iter().any(|project| project == name))
    }

    /// Posts a document to the given lifecycle endpoint.
    ///
    /// # Errors
    /// Returns XML, transport or status errors.
    pub async fn write_project(&self, document: &ProjectDocument, write: ProjectWrite) -> Result<()> {
        let xml = document.to_xml()?;
        self.post_xml(&ia_path(write.endpoint()), xml).await?;
        info!("Project '{}' {}", document.name(), write);
        Ok(())
    }

    /// Creates a project.
    ///
    /// # Errors
    /// Returns XML, transport or status errors.
    pub async fn create_project(&self, document: &ProjectDocument) -> Result<()> {
        self.write_project(document, ProjectWrite::Created).await
    }

    /// Adds the document's data sources and tasks to an existing project.
    ///
    /// # Errors
    /// Returns XML, transport or status errors.
    pub async fn update_project(&self, document: &ProjectDocument) -> Result<()> {
        self.write_project(document, ProjectWrite::Updated).await
    }

    /// Creates the project, or updates it if the name is already taken.
    ///
    /// # Errors
    /// Returns XML, transport or status errors.
    pub async fn create_or_update_project(&self, document: &ProjectDocument) -> Result<ProjectWrite> {
        let write = ProjectWrite::for_existing(self.project_exists(document.name()).await?);
        self.write_project(document, write).await?;
        Ok(write)
    }

    /// Fetches a project's definition.
    ///
    /// # Errors
    /// Returns transport, status or XML errors.
    pub async fn get_project(&self, name: &str) -> Result<ProjectDocument> {
        let path = with_query(&ia_path("project"), &[("projectName", name)]);
        let body = self.get(&path).await?;
        ProjectDocument::from_xml(&body)
    }

    /// Deletes a project.
    ///
    /// # Errors
    /// Returns transport or status errors.
    pub async fn delete_project(&self, name: &str) -> Result<()> {
        let path = with_query(&ia_path("project"), &[("projectName", name)]);
        self.delete(&path).await?;
        info!("Project '{}' deleted", name);
        Ok(())
    }
}
