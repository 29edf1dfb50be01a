//! Output of command results.
//!
//! Results go to stdout as pretty JSON; logs go to stderr.

use anyhow::Context;
use iaprofiler_core::{
    CommitReport, DiscoveredAssets, ProjectDocument, TreeStats, discovery::SkippedAsset,
};
use serde::Serialize;
use std::path::Path;

/// Summary printed after `discover`.
#[derive(Debug, Serialize)]
pub struct DiscoverySummary<'a> {
    pub project: &'a str,
    pub tables: usize,
    pub files: usize,
    pub database_tree: TreeStats,
    pub file_tree: TreeStats,
    pub skipped: &'a [SkippedAsset],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<&'a CommitReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<&'a Path>,
}

impl<'a> DiscoverySummary<'a> {
    pub fn new(project: &'a str, assets: &'a DiscoveredAssets) -> Self {
        Self {
            project,
            tables: assets.tables.len(),
            files: assets.files.len(),
            database_tree: assets.database_tree,
            file_tree: assets.file_tree,
            skipped: &assets.skipped,
            commit: None,
            output: None,
        }
    }
}

/// Renders a value as pretty JSON.
///
/// # Errors
/// Returns an error if the value cannot be serialized.
pub fn render_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize output")
}

/// Prints a value as pretty JSON on stdout.
///
/// # Errors
/// Returns an error if the value cannot be serialized.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", render_json(value)?);
    Ok(())
}

/// Writes a project document's XML to `path`.
///
/// # Errors
/// Returns an error if serialization or the write fails.
pub async fn write_project_xml(document: &ProjectDocument, path: &Path) -> anyhow::Result<()> {
    let xml = document.to_xml()?;
    tokio::fs::write(path, xml)
        .await
        .with_context(|| format!("Failed to write to {}", path.display()))?;
    tracing::info!("Project XML written to {}", path.display());
    Ok(())
}
