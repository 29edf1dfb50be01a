//! File tree: hosts → files (with folder path) → fields.

use super::{FileEntry, TreeOutcome, TreeWalk};
use crate::{
    Result,
    client::CatalogClient,
    config::DiscoveryConfig,
    identity::{self, AssetType, FileIdentity},
    ignore::IgnoreSet,
    search::{Condition, SearchQuery},
};
use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

pub(super) async fn walk(
    client: &CatalogClient,
    config: &DiscoveryConfig,
    ignore: &IgnoreSet,
) -> Result<TreeOutcome<FileEntry>> {
    let mut walk = TreeWalk::new("file", ignore);

    let host_query = SearchQuery::new(&[AssetType::Host])
        .with_properties(&["name"])
        .with_condition(Condition::is_not_null("data_file_folders"))
        .with_page_size(config.page_size);
    let mut hosts = Vec::new();
    for host in client.search(&host_query).await? {
        if walk.admits(AssetType::Host, identity::host_identity(&host.name)) {
            hosts.push(host.name);
        }
    }
    debug!("{} hosts with file folders", hosts.len());

    // Files per host. Every surviving file becomes a branch.
    let mut branches = Vec::new();
    let mut file_responses = std::pin::pin!(
        stream::iter(hosts)
            .map(|host| async move {
                let items = client.search(&files_of(&host, config.page_size)).await?;
                Ok::<_, crate::ProfilerError>((host, items))
            })
            .buffered(config.max_concurrency)
    );
    while let Some(response) = file_responses.next().await {
        let (host, files) = response?;
        for file in files {
            let Some(folder) = file.text("path") else {
                warn!("File {} on {} has no folder path, leaving it out", file.name, host);
                continue;
            };
            let identity = FileIdentity::new(host.as_str(), folder, file.name);
            if !walk.admits(AssetType::DataFileFolder, identity.folder_identity())
                || !walk.admits(AssetType::DataFile, identity.to_string())
            {
                continue;
            }
            walk.ledger.discover();
            branches.push(identity);
        }
    }
    debug!("{} file branches scheduled", branches.len());

    // Fields per file, in file discovery order.
    let mut entries = Vec::new();
    let mut field_responses = std::pin::pin!(
        stream::iter(branches)
            .map(|file| async move {
                let items = client.search(&fields_of(&file, config.page_size)).await?;
                Ok::<_, crate::ProfilerError>((file, items))
            })
            .buffered(config.max_concurrency)
    );
    while let Some(response) = field_responses.next().await {
        let (file, fields) = response?;
        let fields = fields
            .into_iter()
            .map(|field| field.name)
            .filter(|field| {
                walk.admits(
                    AssetType::DataFileField,
                    identity::field_identity(&file.host, &file.folder, &file.file, field),
                )
            })
            .collect();
        entries.push(FileEntry {
            host: file.host,
            folder: file.folder,
            file: file.file,
            fields,
        });
        walk.ledger.add()?;
    }

    walk.finish(entries)
}

fn files_of(host: &str, page_size: u32) -> SearchQuery {
    SearchQuery::new(&[AssetType::DataFile])
        .with_properties(&["name", "path", "host.name"])
        .with_condition(Condition::equals("host.name", host))
        .with_page_size(page_size)
}

fn fields_of(file: &FileIdentity, page_size: u32) -> SearchQuery {
    SearchQuery::new(&[AssetType::DataFileField])
        .with_properties(&["name"])
        .with_condition(Condition::equals("data_file.name", &file.file))
        .with_condition(Condition::equals("data_file.path", &file.folder))
        .with_condition(Condition::equals("data_file.host.name", &file.host))
        .with_page_size(page_size)
}
