//! Asset discovery traversal.
//!
//! Two trees are walked concurrently:
//! - database tree: hosts with databases → schemas → tables with columns
//! - file tree: hosts with file folders → files → fields
//!
//! The ignore set is consulted at every level before descending. Branch
//! requests of one level run through a bounded, order-preserving stream. Each
//! tree keeps its own [`BranchLedger`], and [`discover_assets`] returns only
//! once both ledgers are complete. Nothing is written to the catalog until
//! [`CatalogClient::commit_project`] builds the document in a single pass.
//!
//! [`discover_assets`]: CatalogClient::discover_assets

mod commit;
mod databases;
mod files;
mod ledger;

pub use commit::{CommitReport, LOCAL_FILE_CONNECTOR};
pub use ledger::{BranchLedger, TreeStats};

use crate::{
    Result,
    client::CatalogClient,
    config::DiscoveryConfig,
    identity::{AssetType, FileIdentity, TableIdentity},
    ignore::IgnoreSet,
    project::{ProjectDocument, TableNode},
};
use serde::Serialize;
use tracing::{info, warn};

/// A discovered table with its surviving columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableEntry {
    pub host: String,
    pub database: String,
    pub schema: String,
    pub table: String,
    pub columns: Vec<String>,
}

impl TableEntry {
    /// Parsing the displayed identity only recovers these fields when none
    /// of them contains `::`.
    pub fn identity(&self) -> TableIdentity {
        TableIdentity::new(&self.host, &self.database, &self.schema, &self.table)
    }
}

/// A discovered data file with its surviving fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub host: String,
    /// Full folder path
    pub folder: String,
    pub file: String,
    pub fields: Vec<String>,
}

impl FileEntry {
    pub fn identity(&self) -> FileIdentity {
        FileIdentity::new(&self.host, &self.folder, &self.file)
    }
}

/// An object left out because it is on the ignore list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedAsset {
    pub asset_type: AssetType,
    pub identity: String,
}

/// Result of a discovery run, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveredAssets {
    pub tables: Vec<TableEntry>,
    pub files: Vec<FileEntry>,
    pub database_tree: TreeStats,
    pub file_tree: TreeStats,
    pub skipped: Vec<SkippedAsset>,
}

impl DiscoveredAssets {
    /// Returns true if neither tree found anything.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.files.is_empty()
    }

    /// Builds the project document: one `DataSource` per schema branch
    /// (named after its database) followed by one per file (named after its
    /// host).
    pub fn to_project(&self, name: &str, description: &str) -> ProjectDocument {
        let mut document = ProjectDocument::new(name);
        document.set_description(description);
        for branch in self.tables.chunk_by(|a, b| {
            (&a.host, &a.database, &a.schema) == (&b.host, &b.database, &b.schema)
        }) {
            let Some(first) = branch.first() else {
                continue;
            };
            document.add_schema_tables(
                &first.database,
                &first.schema,
                branch.iter().map(|entry| TableNode {
                    name: entry.table.clone(),
                    columns: entry.columns.clone(),
                }),
            );
        }
        for entry in &self.files {
            document.add_file(&entry.host, &entry.folder, &entry.file, &entry.fields);
        }
        document
    }

    /// Hosts that have discovered files, in order of first appearance.
    pub fn file_hosts(&self) -> Vec<&str> {
        let mut hosts: Vec<&str> = Vec::new();
        for entry in &self.files {
            if !hosts.contains(&entry.host.as_str()) {
                hosts.push(&entry.host);
            }
        }
        hosts
    }

    /// Discovered files on one host.
    pub fn files_on<'a>(&'a self, host: &'a str) -> impl Iterator<Item = &'a FileEntry> + 'a {
        self.files.iter().filter(move |entry| entry.host == host)
    }
}

/// What one tree produced.
struct TreeOutcome<E> {
    entries: Vec<E>,
    stats: TreeStats,
    skipped: Vec<SkippedAsset>,
}

impl<E> TreeOutcome<E> {
    fn disabled() -> Self {
        Self {
            entries: Vec::new(),
            stats: TreeStats::default(),
            skipped: Vec::new(),
        }
    }
}

/// Ignore filtering and accounting state of one tree walk.
struct TreeWalk<'a> {
    ignore: &'a IgnoreSet,
    ledger: BranchLedger,
    skipped: Vec<SkippedAsset>,
}

impl<'a> TreeWalk<'a> {
    fn new(tree: &'static str, ignore: &'a IgnoreSet) -> Self {
        Self {
            ignore,
            ledger: BranchLedger::new(tree),
            skipped: Vec::new(),
        }
    }

    /// Returns false, and records the skip, if the object is ignored.
    fn admits(&mut self, asset_type: AssetType, identity: String) -> bool {
        if !self.ignore.contains(asset_type, &identity) {
            return true;
        }
        warn!("Skipping ignored {} {}", asset_type, identity);
        self.ledger.skip();
        self.skipped.push(SkippedAsset {
            asset_type,
            identity,
        });
        false
    }

    fn finish<E>(self, entries: Vec<E>) -> Result<TreeOutcome<E>> {
        let stats = self.ledger.finish()?;
        Ok(TreeOutcome {
            entries,
            stats,
            skipped: self.skipped,
        })
    }
}

impl CatalogClient {
    /// Walks both trees and returns everything not on the ignore list.
    ///
    /// # Errors
    /// Returns a configuration error for an invalid config. Any transport or
    /// status error in either tree aborts the whole run.
    pub async fn discover_assets(
        &self,
        config: &DiscoveryConfig,
        ignore: &IgnoreSet,
    ) -> Result<DiscoveredAssets> {
        config.validate()?;

        let database_tree = async {
            if config.include_databases {
                databases::walk(self, config, ignore).await
            } else {
                Ok(TreeOutcome::disabled())
            }
        };
        let file_tree = async {
            if config.include_files {
                files::walk(self, config, ignore).await
            } else {
                Ok(TreeOutcome::disabled())
            }
        };
        let (tables, files) = tokio::try_join!(database_tree, file_tree)?;

        let mut skipped = tables.skipped;
        skipped.extend(files.skipped);
        let assets = DiscoveredAssets {
            tables: tables.entries,
            files: files.entries,
            database_tree: tables.stats,
            file_tree: files.stats,
            skipped,
        };
        info!(
            "Discovered {} tables and {} files ({} ignored objects skipped)",
            assets.tables.len(),
            assets.files.len(),
            assets.skipped.len()
        );
        Ok(assets)
    }

    /// Resolves the ignore list, discovers assets and commits them to the
    /// project.
    ///
    /// # Errors
    /// Propagates errors from [`ignored_identities`](Self::ignored_identities),
    /// [`discover_assets`](Self::discover_assets) and
    /// [`commit_project`](Self::commit_project).
    pub async fn discover_and_commit(
        &self,
        project: &str,
        description: &str,
        config: &DiscoveryConfig,
    ) -> Result<(DiscoveredAssets, CommitReport)> {
        config.validate()?;
        let ignore = self.ignored_identities(&config.ignore_label).await?;
        let assets = self.discover_assets(config, &ignore).await?;
        let report = self.commit_project(project, description, &assets).await?;
        Ok((assets, report))
    }
}
