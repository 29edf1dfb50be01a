//! Database tree: hosts → schemas → tables with columns.

use super::{TableEntry, TreeOutcome, TreeWalk};
use crate::{
    Result,
    client::CatalogClient,
    config::DiscoveryConfig,
    identity::{self, AssetType, TableIdentity},
    ignore::IgnoreSet,
    search::{Condition, SearchItem, SearchQuery},
};
use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

/// A schema whose tables are fetched as one branch.
struct SchemaBranch {
    host: String,
    database: String,
    schema: String,
}

pub(super) async fn walk(
    client: &CatalogClient,
    config: &DiscoveryConfig,
    ignore: &IgnoreSet,
) -> Result<TreeOutcome<TableEntry>> {
    let mut walk = TreeWalk::new("database", ignore);

    let host_query = SearchQuery::new(&[AssetType::Host])
        .with_properties(&["name"])
        .with_condition(Condition::is_not_null("databases"))
        .with_page_size(config.page_size);
    let mut hosts = Vec::new();
    for host in client.search(&host_query).await? {
        if walk.admits(AssetType::Host, identity::host_identity(&host.name)) {
            hosts.push(host.name);
        }
    }
    debug!("{} hosts with databases", hosts.len());

    // Schemas per host. Every surviving schema becomes a branch.
    let mut branches = Vec::new();
    let mut schema_responses = std::pin::pin!(
        stream::iter(hosts)
            .map(|host| async move {
                let items = client.search(&schemas_of(&host, config.page_size)).await?;
                Ok::<_, crate::ProfilerError>((host, items))
            })
            .buffered(config.max_concurrency)
    );
    while let Some(response) = schema_responses.next().await {
        let (host, schemas) = response?;
        for schema in schemas {
            let Some(database) = schema.text("database.name") else {
                warn!("Schema {} on {} has no database, leaving it out", schema.name, host);
                continue;
            };
            if !walk.admits(
                AssetType::Database,
                identity::database_identity(&host, &database),
            ) || !walk.admits(
                AssetType::DatabaseSchema,
                identity::schema_identity(&host, &database, &schema.name),
            ) {
                continue;
            }
            walk.ledger.discover();
            branches.push(SchemaBranch {
                host: host.clone(),
                database,
                schema: schema.name,
            });
        }
    }
    debug!("{} schema branches scheduled", branches.len());

    // Tables per schema, in schema discovery order.
    let mut entries = Vec::new();
    let mut table_responses = std::pin::pin!(
        stream::iter(branches)
            .map(|branch| async move {
                let items = client.search(&tables_of(&branch, config.page_size)).await?;
                Ok::<_, crate::ProfilerError>((branch, items))
            })
            .buffered(config.max_concurrency)
    );
    while let Some(response) = table_responses.next().await {
        let (branch, tables) = response?;
        for table in tables {
            if let Some(entry) = table_entry(&mut walk, &branch, table) {
                entries.push(entry);
            }
        }
        walk.ledger.add()?;
    }

    walk.finish(entries)
}

fn schemas_of(host: &str, page_size: u32) -> SearchQuery {
    SearchQuery::new(&[AssetType::DatabaseSchema])
        .with_properties(&["name", "database.name", "database.host.name"])
        .with_condition(Condition::equals("database.host.name", host))
        .with_page_size(page_size)
}

fn tables_of(branch: &SchemaBranch, page_size: u32) -> SearchQuery {
    SearchQuery::new(&[AssetType::DatabaseTable])
        .with_properties(&[
            "name",
            "database_columns",
            "database_schema.name",
            "database_schema.database.name",
            "database_schema.database.host.name",
        ])
        .with_condition(Condition::equals("database_schema.name", &branch.schema))
        .with_condition(Condition::equals(
            "database_schema.database.name",
            &branch.database,
        ))
        .with_condition(Condition::equals(
            "database_schema.database.host.name",
            &branch.host,
        ))
        .with_page_size(page_size)
}

fn table_entry(walk: &mut TreeWalk<'_>, branch: &SchemaBranch, table: SearchItem) -> Option<TableEntry> {
    let identity = TableIdentity::new(&branch.host, &branch.database, &branch.schema, &table.name);
    if !walk.admits(AssetType::DatabaseTable, identity.to_string()) {
        return None;
    }
    let columns = table
        .names("database_columns")
        .into_iter()
        .filter(|column| {
            walk.admits(
                AssetType::DatabaseColumn,
                identity::column_identity(
                    &branch.host,
                    &branch.database,
                    &branch.schema,
                    &table.name,
                    column,
                ),
            )
        })
        .collect();
    Some(TableEntry {
        host: identity.host,
        database: identity.database,
        schema: identity.schema,
        table: identity.table,
        columns,
    })
}
