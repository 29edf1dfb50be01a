//! Subcommand implementations.
//!
//! Every command takes an already connected [`CatalogClient`] so the same
//! code runs against a live catalog or an in-memory transport.

use crate::{
    AnalyzeArgs, Command, DiscoverArgs, IgnoreLabelArgs, PublishArgs, ReindexArgs, RulesArgs,
    StatusArgs,
    output::{DiscoverySummary, print_json, write_project_xml},
};
use anyhow::{Context, bail};
use chrono::{TimeDelta, Utc};
use iaprofiler_core::{
    AnalysisTarget, CatalogClient, ColumnAnalysisOptions, DiscoveryConfig, ExecutionRecord,
    InternalEndpoints, ReindexOptions,
};
use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{info, warn};

/// Runs one subcommand.
///
/// # Errors
/// Returns any error raised by the command.
pub async fn execute(client: &CatalogClient, command: &Command) -> anyhow::Result<()> {
    match command {
        Command::Discover(args) => discover(client, args).await,
        Command::Analyze(args) => analyze(client, args).await,
        Command::Publish(args) => publish(client, args).await,
        Command::Status(args) => status(client, args).await,
        Command::Rules(args) => rules(client, args).await,
        Command::IgnoreLabel(args) => ignore_label(client, args).await,
        Command::Reindex(args) => reindex(client, args).await,
    }
}

/// Parses target strings given on the command line.
///
/// # Errors
/// Returns the first target that cannot be parsed.
pub fn parse_targets(targets: &[String]) -> anyhow::Result<Vec<AnalysisTarget>> {
    targets
        .iter()
        .map(|target| target.parse::<AnalysisTarget>().map_err(anyhow::Error::from))
        .collect()
}

/// Keeps the requested targets whose table or file is stale.
///
/// Stale targets cover whole tables, so requested column targets are matched
/// on their table. With nothing requested every stale target is kept.
fn restrict_to_stale(
    stale: Vec<AnalysisTarget>,
    requested: Vec<AnalysisTarget>,
) -> Vec<AnalysisTarget> {
    if requested.is_empty() {
        return stale;
    }
    let stale_tables: HashSet<String> = stale.iter().map(AnalysisTarget::table_reference).collect();
    requested
        .into_iter()
        .filter(|target| stale_tables.contains(&target.table_reference()))
        .collect()
}

fn discovery_config(args: &DiscoverArgs) -> DiscoveryConfig {
    DiscoveryConfig::new()
        .with_max_concurrency(args.max_concurrency)
        .with_ignore_label(args.ignore_label.clone())
        .with_databases(!args.no_databases)
        .with_files(!args.no_files)
}

async fn discover(client: &CatalogClient, args: &DiscoverArgs) -> anyhow::Result<()> {
    let config = discovery_config(args);

    if args.dry_run {
        config.validate()?;
        let ignore = client.ignored_identities(&config.ignore_label).await?;
        let assets = client.discover_assets(&config, &ignore).await?;
        let document = assets.to_project(&args.project, &args.description);
        write_project_xml(&document, &args.output).await?;

        let mut summary = DiscoverySummary::new(&args.project, &assets);
        summary.output = Some(&args.output);
        return print_json(&summary);
    }

    let (assets, report) = client
        .discover_and_commit(&args.project, &args.description, &config)
        .await?;
    if assets.is_empty() {
        warn!("Discovery found nothing to profile");
    }
    let mut summary = DiscoverySummary::new(&args.project, &assets);
    summary.commit = Some(&report);
    print_json(&summary)
}

async fn analyze(client: &CatalogClient, args: &AnalyzeArgs) -> anyhow::Result<()> {
    let targets = if let Some(minutes) = args.stale_after_minutes {
        let cutoff = TimeDelta::try_minutes(i64::from(minutes))
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .context("--stale-after-minutes is out of range")?;
        let stale = client.stale_targets(&args.project, cutoff).await?;
        if args.all {
            stale
        } else {
            restrict_to_stale(stale, parse_targets(&args.targets)?)
        }
    } else if args.all {
        client.project_targets(&args.project).await?
    } else {
        parse_targets(&args.targets)?
    };

    if targets.is_empty() {
        if args.stale_after_minutes.is_some() {
            info!("Nothing is stale in '{}'", args.project);
            return print_json(&json!({"project": args.project, "schedule_ids": []}));
        }
        bail!("no targets given: pass TARGET arguments or --all");
    }

    let options = ColumnAnalysisOptions::new(args.analyze_data_classes);
    let schedule_ids = client
        .submit_column_analysis(&args.project, &targets, options)
        .await?;

    if args.wait {
        let records = wait_for(client, &schedule_ids, args.poll_interval).await?;
        return print_json(&records);
    }
    let targets: Vec<String> = targets.iter().map(ToString::to_string).collect();
    print_json(&json!({
        "project": args.project,
        "targets": targets,
        "schedule_ids": schedule_ids,
    }))
}

async fn publish(client: &CatalogClient, args: &PublishArgs) -> anyhow::Result<()> {
    let targets = parse_targets(&args.targets)?;
    let status = client.publish_results(&args.project, &targets).await?;
    print_json(&json!({"project": args.project, "status": status}))
}

async fn status(client: &CatalogClient, args: &StatusArgs) -> anyhow::Result<()> {
    let records = if args.wait {
        wait_for(client, &args.schedule_ids, args.poll_interval).await?
    } else {
        let mut records = Vec::with_capacity(args.schedule_ids.len());
        for schedule_id in &args.schedule_ids {
            records.push(client.get_status(schedule_id).await?);
        }
        records
    };
    print_json(&records)
}

async fn wait_for(
    client: &CatalogClient,
    schedule_ids: &[String],
    poll_interval: u64,
) -> anyhow::Result<Vec<ExecutionRecord>> {
    let interval = Duration::from_secs(poll_interval.max(1));
    let mut records = Vec::with_capacity(schedule_ids.len());
    for schedule_id in schedule_ids {
        records.push(client.poll_until_terminal(schedule_id, interval, None).await?);
    }
    Ok(records)
}

async fn rules(client: &CatalogClient, args: &RulesArgs) -> anyhow::Result<()> {
    if args.list {
        return print_json(&client.executable_rules(&args.project).await?);
    }

    let rules = if args.rules.is_empty() {
        client.executable_rules(&args.project).await?
    } else {
        args.rules.clone()
    };
    if rules.is_empty() {
        bail!("project '{}' has no executable data rules", args.project);
    }
    let schedule_ids = client.run_data_rules(&args.project, &rules).await?;
    print_json(&json!({"project": args.project, "rules": rules, "schedule_ids": schedule_ids}))
}

async fn ignore_label(client: &CatalogClient, args: &IgnoreLabelArgs) -> anyhow::Result<()> {
    let label = client.ensure_label_exists(&args.label).await?;
    let labelled_databases = if args.include_analysis_db {
        client
            .ignore_analysis_database(&args.label, &args.analysis_db)
            .await?
    } else {
        0
    };
    print_json(&json!({
        "label": args.label,
        "rid": label.rid,
        "created": label.created,
        "labelled_databases": labelled_databases,
    }))
}

async fn reindex(client: &CatalogClient, args: &ReindexArgs) -> anyhow::Result<()> {
    let options = ReindexOptions {
        batch_size: args.batch_size,
        solr_batch_size: args.solr_batch_size,
        upgrade: args.upgrade,
        force: args.force,
    };
    let response = client.reindex(options).await?;
    if !response.trim().is_empty() {
        println!("{}", response.trim());
    }
    Ok(())
}
