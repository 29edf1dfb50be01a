//! Label-based ignore list.
//!
//! Catalog objects carrying the ignore label are left out of discovery. The
//! label is resolved fresh for every run; nothing is cached between runs.

use crate::{
    Result,
    client::CatalogClient,
    error::ProfilerError,
    identity::{self, AssetType},
    search::{Condition, SearchItem, SearchQuery},
};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Catalog type of labels.
pub const LABEL_TYPE: &str = "label";

/// Identities to exclude, partitioned by asset type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreSet {
    entries: HashMap<AssetType, HashSet<String>>,
}

impl IgnoreSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an identity; returns false if it was already present.
    pub fn insert(&mut self, asset_type: AssetType, identity: impl Into<String>) -> bool {
        self.entries
            .entry(asset_type)
            .or_default()
            .insert(identity.into())
    }

    /// Returns true if the identity is ignored for this type.
    pub fn contains(&self, asset_type: AssetType, identity: &str) -> bool {
        self.entries
            .get(&asset_type)
            .is_some_and(|identities| identities.contains(identity))
    }

    /// Ignored identities of one type, in no particular order.
    pub fn identities(&self, asset_type: AssetType) -> impl Iterator<Item = &str> {
        self.entries
            .get(&asset_type)
            .into_iter()
            .flat_map(|identities| identities.iter().map(String::as_str))
    }

    /// Total number of ignored identities.
    pub fn len(&self) -> usize {
        self.entries.values().map(HashSet::len).sum()
    }

    /// Returns true if nothing is ignored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A label asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRef {
    pub rid: String,
    /// True if this call created the label
    pub created: bool,
}

/// Properties needed to compute the identity of any ignorable type.
const IDENTITY_PROPERTIES: &[&str] = &[
    "name",
    "path",
    "host.name",
    "database.name",
    "database.host.name",
    "database_schema.name",
    "database_schema.database.name",
    "database_schema.database.host.name",
    "database_table.name",
    "database_table.database_schema.name",
    "database_table.database_schema.database.name",
    "database_table.database_schema.database.host.name",
    "data_file.name",
    "data_file.path",
    "data_file.host.name",
];

/// Computes the identity string of a labelled item, or `None` if the item
/// lacks a property its identity needs.
fn identity_of(asset_type: AssetType, item: &SearchItem) -> Option<String> {
    let name = item.name.as_str();
    let text = |property: &str| item.text(property);
    let identity = match asset_type {
        AssetType::Host => identity::host_identity(name),
        AssetType::Database => identity::database_identity(&text("host.name")?, name),
        AssetType::DatabaseSchema => identity::schema_identity(
            &text("database.host.name")?,
            &text("database.name")?,
            name,
        ),
        AssetType::DatabaseTable => identity::join_identity([
            text("database_schema.database.host.name")?,
            text("database_schema.database.name")?,
            text("database_schema.name")?,
            name.to_string(),
        ]),
        AssetType::DatabaseColumn => identity::column_identity(
            &text("database_table.database_schema.database.host.name")?,
            &text("database_table.database_schema.database.name")?,
            &text("database_table.database_schema.name")?,
            &text("database_table.name")?,
            name,
        ),
        AssetType::DataFileFolder => identity::folder_identity(
            &text("host.name")?,
            &text("path").unwrap_or_else(|| name.to_string()),
        ),
        AssetType::DataFile => {
            identity::join_identity([text("host.name")?, text("path")?, name.to_string()])
        }
        AssetType::DataFileField => identity::field_identity(
            &text("data_file.host.name")?,
            &text("data_file.path")?,
            &text("data_file.name")?,
            name,
        ),
    };
    Some(identity)
}

impl CatalogClient {
    /// Resolves every object carrying `label` into an [`IgnoreSet`].
    ///
    /// One search covers all ignorable types. Items whose identity cannot be
    /// computed are logged and left out.
    ///
    /// # Errors
    /// Returns transport, status or serialization errors.
    pub async fn ignored_identities(&self, label: &str) -> Result<IgnoreSet> {
        let query = SearchQuery::new(&AssetType::ALL)
            .with_properties(IDENTITY_PROPERTIES)
            .with_condition(Condition::equals("labels.name", label));

        let mut ignore = IgnoreSet::new();
        for item in self.search(&query).await? {
            let Some(asset_type) = item.known_type() else {
                debug!("Ignoring labelled {} '{}'", item.asset_type, item.name);
                continue;
            };
            match identity_of(asset_type, &item) {
                Some(identity) => {
                    ignore.insert(asset_type, identity);
                }
                None => warn!(
                    "Cannot compute identity of labelled {} '{}' ({})",
                    asset_type, item.name, item.id
                ),
            }
        }

        info!("Ignore list '{}' holds {} objects", label, ignore.len());
        Ok(ignore)
    }

    /// Finds the label by name, creating it only if it does not exist.
    ///
    /// # Errors
    /// Returns transport or status errors, or an unexpected-response error
    /// if the catalog does not return the new label's id.
    pub async fn ensure_label_exists(&self, label: &str) -> Result<LabelRef> {
        let query = SearchQuery::for_type_names(&[LABEL_TYPE])
            .with_properties(&["name"])
            .with_condition(Condition::equals("name", label));

        let matches: Vec<SearchItem> = self
            .search(&query)
            .await?
            .into_iter()
            .filter(|item| item.name == label)
            .collect();
        if matches.len() > 1 {
            warn!("{} labels named '{}', using the first", matches.len(), label);
        }
        if let Some(existing) = matches.into_iter().next() {
            debug!("Label '{}' exists as {}", label, existing.id);
            return Ok(LabelRef {
                rid: existing.id,
                created: false,
            });
        }

        let rid = self
            .create_asset(json!({
                "_type": LABEL_TYPE,
                "name": label,
                "description": "Objects with this label are skipped by automated profiling",
            }))
            .await?;
        info!("Created label '{}' ({})", label, rid);
        Ok(LabelRef { rid, created: true })
    }

    /// Attaches `label` to the catalog's own analysis database so that
    /// discovery never profiles it. Returns how many databases were labelled.
    ///
    /// # Errors
    /// Returns `NotFound` if no database has that name, otherwise transport
    /// or status errors.
    pub async fn ignore_analysis_database(&self, label: &str, database_name: &str) -> Result<usize> {
        let label = self.ensure_label_exists(label).await?;

        let query = SearchQuery::new(&[AssetType::Database])
            .with_properties(&["name", "host.name"])
            .with_condition(Condition::equals("name", database_name));
        let databases = self.search(&query).await?;
        if databases.is_empty() {
            return Err(ProfilerError::not_found("database", database_name));
        }

        for database in &databases {
            self.update_asset(
                &database.id,
                json!({"labels": {"items": [&label.rid], "mode": "append"}}),
            )
            .await?;
            info!(
                "Labelled database {} on {}",
                database.name,
                database.text("host.name").unwrap_or_default()
            );
        }
        Ok(databases.len())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn item(value: serde_json::Value) -> SearchItem {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_ignore_set_partitions_by_type() {
        let mut ignore = IgnoreSet::new();
        assert!(ignore.is_empty());
        assert!(ignore.insert(AssetType::DatabaseSchema, "HOST1::DB1::SCH1"));
        assert!(!ignore.insert(AssetType::DatabaseSchema, "HOST1::DB1::SCH1"));

        assert!(ignore.contains(AssetType::DatabaseSchema, "HOST1::DB1::SCH1"));
        assert!(!ignore.contains(AssetType::Database, "HOST1::DB1::SCH1"));
        assert_eq!(ignore.len(), 1);
        assert_eq!(
            ignore.identities(AssetType::DatabaseSchema).collect::<Vec<_>>(),
            vec!["HOST1::DB1::SCH1"]
        );
    }

    #[test]
    fn test_identity_of_each_type() {
        let schema = item(json!({
            "_id": "1", "_type": "database_schema", "_name": "SCH1",
            "database.name": "DB1", "database.host.name": "HOST1"
        }));
        assert_eq!(
            identity_of(AssetType::DatabaseSchema, &schema).as_deref(),
            Some("HOST1::DB1::SCH1")
        );

        let column = item(json!({
            "_id": "2", "_type": "database_column", "_name": "A",
            "database_table.name": "T1",
            "database_table.database_schema.name": "SCH1",
            "database_table.database_schema.database.name": "DB1",
            "database_table.database_schema.database.host.name": "HOST1"
        }));
        assert_eq!(
            identity_of(AssetType::DatabaseColumn, &column).as_deref(),
            Some("HOST1::DB1::SCH1::T1::A")
        );

        let file = item(json!({
            "_id": "3", "_type": "data_file", "_name": "file1.csv",
            "path": "/data", "host.name": "HOST1"
        }));
        assert_eq!(
            identity_of(AssetType::DataFile, &file).as_deref(),
            Some("HOST1::/data::file1.csv")
        );

        let host = item(json!({"_id": "4", "_type": "host", "_name": "HOST1"}));
        assert_eq!(identity_of(AssetType::Host, &host).as_deref(), Some("HOST1"));
    }

    #[test]
    fn test_identity_of_incomplete_item() {
        let table = item(json!({"_id": "5", "_type": "database_table", "_name": "T1"}));
        assert!(identity_of(AssetType::DatabaseTable, &table).is_none());
    }
}
