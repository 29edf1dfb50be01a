//! Argument parsing and command execution against an in-memory catalog.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use clap::Parser;
use iaprofiler::{Cli, Command, commands, connection_config};
use iaprofiler_core::{
    AnalysisTarget, CatalogClient,
    config::DEFAULT_IGNORE_LABEL,
    transport::{CatalogResponse, MemoryTransport, Method, RecordedRequest, RequestFailure},
};
use serde_json::{Value, json};
use std::sync::Arc;

const ENV_VARS: [&str; 2] = ["IA_SERVER", "IA_USER"];

fn parse(args: &[&str]) -> Cli {
    temp_env::with_vars_unset(ENV_VARS, || Cli::try_parse_from(args).unwrap())
}

fn parse_err(args: &[&str]) -> clap::error::ErrorKind {
    temp_env::with_vars_unset(ENV_VARS, || Cli::try_parse_from(args).unwrap_err().kind())
}

fn client_answering<F>(responder: F) -> (CatalogClient, Arc<MemoryTransport>)
where
    F: Fn(&RecordedRequest) -> iaprofiler_core::Result<CatalogResponse> + Send + Sync + 'static,
{
    let transport = Arc::new(MemoryTransport::new(responder));
    (CatalogClient::new(transport.clone()), transport)
}

#[test]
fn test_parse_discover_defaults() {
    let cli = parse(&["iaprofiler", "discover", "--project", "P", "--description", "D"]);

    assert!(cli.global.server.is_none());
    assert!(!cli.global.verify_certs);
    assert_eq!(cli.global.max_connections, 1);
    assert_eq!(cli.global.retries, 0);
    let Command::Discover(args) = cli.command else {
        unreachable!("expected discover");
    };
    assert_eq!(args.project, "P");
    assert_eq!(args.description, "D");
    assert_eq!(args.max_concurrency, 4);
    assert_eq!(args.ignore_label, DEFAULT_IGNORE_LABEL);
    assert!(!args.dry_run);
    assert!(!args.no_files);
    assert!(!args.no_databases);
}

#[test]
fn test_parse_global_flags_after_subcommand() {
    let cli = parse(&[
        "iaprofiler",
        "status",
        "S1",
        "S2",
        "--server",
        "ia.example.com:9445",
        "--user",
        "admin",
        "--verify-certs",
        "--retries",
        "3",
        "-vv",
    ]);

    assert_eq!(cli.global.server.as_deref(), Some("ia.example.com:9445"));
    assert_eq!(cli.global.user.as_deref(), Some("admin"));
    assert!(cli.global.verify_certs);
    assert_eq!(cli.global.retries, 3);
    assert_eq!(cli.global.verbose, 2);
    let Command::Status(args) = cli.command else {
        unreachable!("expected status");
    };
    assert_eq!(args.schedule_ids, ["S1", "S2"]);
    assert!(!args.wait);
    assert_eq!(args.poll_interval, 30);
}

#[test]
fn test_credential_server_and_user_from_environment() {
    let cli = temp_env::with_vars(
        [("IA_SERVER", Some("ia.example.com")), ("IA_USER", Some("isadmin"))],
        || Cli::try_parse_from(["iaprofiler", "reindex"]).unwrap(),
    );
    assert_eq!(cli.global.server.as_deref(), Some("ia.example.com"));
    assert_eq!(cli.global.user.as_deref(), Some("isadmin"));
}

#[test]
fn test_parse_password_is_not_an_argument() {
    assert_eq!(
        parse_err(&["iaprofiler", "--password", "secret", "reindex"]),
        clap::error::ErrorKind::UnknownArgument
    );
}

#[test]
fn test_parse_output_requires_dry_run() {
    assert_eq!(
        parse_err(&[
            "iaprofiler",
            "discover",
            "--project",
            "P",
            "--description",
            "D",
            "--output",
            "out.xml",
        ]),
        clap::error::ErrorKind::MissingRequiredArgument
    );
}

#[test]
fn test_parse_analyze_targets_conflict_with_all() {
    assert_eq!(
        parse_err(&["iaprofiler", "analyze", "--project", "P", "--all", "DB1.SCH1.T1"]),
        clap::error::ErrorKind::ArgumentConflict
    );

    let cli = parse(&[
        "iaprofiler",
        "analyze",
        "--project",
        "P",
        "--all",
        "--stale-after-minutes",
        "1440",
        "--wait",
    ]);
    let Command::Analyze(args) = cli.command else {
        unreachable!("expected analyze");
    };
    assert!(args.all);
    assert!(args.wait);
    assert_eq!(args.stale_after_minutes, Some(1440));
    assert!(args.targets.is_empty());
}

#[test]
fn test_parse_publish_requires_targets() {
    assert_eq!(
        parse_err(&["iaprofiler", "publish", "--project", "P"]),
        clap::error::ErrorKind::MissingRequiredArgument
    );
}

#[test]
fn test_parse_rules_list_conflicts_with_names() {
    assert_eq!(
        parse_err(&["iaprofiler", "rules", "--project", "P", "--list", "RULE_A"]),
        clap::error::ErrorKind::ArgumentConflict
    );
}

#[test]
fn test_parse_ignore_label_analysis_db_requires_flag() {
    assert_eq!(
        parse_err(&["iaprofiler", "ignore-label", "--analysis-db", "XMETA"]),
        clap::error::ErrorKind::MissingRequiredArgument
    );

    let cli = parse(&["iaprofiler", "ignore-label", "--include-analysis-db"]);
    let Command::IgnoreLabel(args) = cli.command else {
        unreachable!("expected ignore-label");
    };
    assert_eq!(args.label, DEFAULT_IGNORE_LABEL);
    assert_eq!(args.analysis_db, "IADB");
}

#[test]
fn test_parse_reindex_force_can_be_turned_off() {
    let Command::Reindex(defaults) = parse(&["iaprofiler", "reindex"]).command else {
        unreachable!("expected reindex");
    };
    assert!(defaults.force);
    assert!(!defaults.upgrade);
    assert_eq!(defaults.batch_size, 25);
    assert_eq!(defaults.solr_batch_size, 100);

    let Command::Reindex(args) = parse(&["iaprofiler", "reindex", "--force", "false"]).command else {
        unreachable!("expected reindex");
    };
    assert!(!args.force);
}

#[test]
fn test_parse_targets_mixes_tables_and_files() {
    let targets = commands::parse_targets(&["DB1.SCH1.T1.*".to_string(), "HOST1:/data:a.csv".to_string()])
        .unwrap();
    assert_eq!(targets.len(), 2);
    assert!(!targets[0].is_file());
    assert!(targets[1].is_file());
    assert_eq!(targets[0].to_string(), "DB1.SCH1.T1.*");

    assert!(commands::parse_targets(&["DB1".to_string()]).is_err());
}

#[test]
fn test_connection_config_requires_server() {
    let cli = parse(&["iaprofiler", "reindex"]);
    let error = connection_config(&cli.global).unwrap_err();
    assert!(error.to_string().contains("IA_SERVER"));
}

#[test]
fn test_connection_config_from_flags() {
    let cli = parse(&["iaprofiler", "--server", "ia.example.com:9445", "reindex"]);
    let config = connection_config(&cli.global).unwrap();
    assert_eq!(config.base_url(), "https://ia.example.com:9445");
    assert!(config.accept_invalid_certs);
    assert!(
        config
            .retry_policy
            .next_delay(1, RequestFailure::Connection)
            .is_none()
    );

    let cli = parse(&[
        "iaprofiler",
        "--server",
        "ia.example.com",
        "--verify-certs",
        "--retries",
        "2",
        "--max-connections",
        "8",
        "reindex",
    ]);
    let config = connection_config(&cli.global).unwrap();
    assert!(!config.accept_invalid_certs);
    assert_eq!(config.max_connections, 8);
    assert!(
        config
            .retry_policy
            .next_delay(1, RequestFailure::Connection)
            .is_some()
    );
}

#[test]
fn test_connection_config_rejects_embedded_credentials() {
    let cli = parse(&["iaprofiler", "--server", "admin:pw@ia.example.com", "reindex"]);
    assert!(connection_config(&cli.global).is_err());
}

#[test]
fn test_connection_config_rejects_zero_connections() {
    let cli = parse(&["iaprofiler", "--server", "ia.example.com", "--max-connections", "0", "reindex"]);
    assert!(connection_config(&cli.global).is_err());
}

/// One host with one schema holding one table.
fn small_catalog(request: &RecordedRequest) -> iaprofiler_core::Result<CatalogResponse> {
    let body = request.json_body().cloned().unwrap_or(Value::Null);
    let types: Vec<&str> = body["types"]
        .as_array()
        .map(|types| types.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let items = match types.as_slice() {
        ["host"] if body.to_string().contains("databases") => {
            json!([{"_id": "h1", "_type": "host", "_name": "HOST1"}])
        }
        ["database_schema"] => json!([{
            "_id": "s1",
            "_type": "database_schema",
            "_name": "SCH1",
            "database.name": {"_type": "database", "_name": "DB1"},
            "database.host.name": "HOST1",
        }]),
        ["database_table"] => json!([{
            "_id": "t1",
            "_type": "database_table",
            "_name": "T1",
            "database_columns": {"items": [{"_type": "database_column", "_name": "ID"}]},
        }]),
        _ => json!([]),
    };
    Ok(CatalogResponse::ok(json!({"items": items}).to_string()))
}

#[tokio::test]
async fn test_discover_dry_run_writes_project_xml_without_commit() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("project.xml");
    let output_arg = output.to_string_lossy().to_string();
    let cli = parse(&[
        "iaprofiler",
        "discover",
        "--project",
        "Automated Profiling",
        "--description",
        "Nightly",
        "--no-files",
        "--dry-run",
        "--output",
        output_arg.as_str(),
    ]);
    let (client, transport) = client_answering(small_catalog);

    commands::execute(&client, &cli.command).await.unwrap();

    let xml = std::fs::read_to_string(&output).unwrap();
    assert!(xml.contains(r#"<Table name="T1">"#));
    assert!(xml.contains(r#"<Column name="ID"/>"#));
    assert!(
        transport
            .requests()
            .iter()
            .all(|request| !request.route().starts_with("/ibm/iis/ia/api"))
    );
}

#[tokio::test]
async fn test_analyze_submits_parsed_targets() {
    let cli = parse(&["iaprofiler", "analyze", "--project", "P", "DB1.SCH1.T1.*"]);
    let (client, transport) = client_answering(|_| {
        Ok(CatalogResponse::ok(
            r#"<TaskSequence><ScheduledTask scheduleId="SCHED_1"/></TaskSequence>"#,
        ))
    });

    commands::execute(&client, &cli.command).await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::Post);
    assert_eq!(requests[0].route(), "/ibm/iis/ia/api/executeTasks");
    assert!(requests[0].xml_body().unwrap().contains("DB1.SCH1.T1.*"));
}

#[tokio::test]
async fn test_analyze_without_targets_fails_before_any_request() {
    let cli = parse(&["iaprofiler", "analyze", "--project", "P"]);
    let (client, transport) = client_answering(|_| Ok(CatalogResponse::ok("")));

    let error = commands::execute(&client, &cli.command).await.unwrap_err();

    assert!(error.to_string().contains("no targets"));
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn test_status_queries_each_schedule_id() {
    let cli = parse(&["iaprofiler", "status", "S1", "S2"]);
    let (client, transport) = client_answering(|_| {
        Ok(CatalogResponse::ok(
            r#"<AnalysisStatus><TaskExecution executionId="EX_1" progress="100" status="successful"/></AnalysisStatus>"#,
        ))
    });

    commands::execute(&client, &cli.command).await.unwrap();

    let ids: Vec<String> = transport
        .requests()
        .iter()
        .filter_map(|request| request.query_param("scheduleID"))
        .collect();
    assert_eq!(ids, ["S1", "S2"]);
}

#[tokio::test]
async fn test_status_error_is_propagated() {
    let cli = parse(&["iaprofiler", "status", "S1"]);
    let (client, _) = client_answering(|_| {
        Ok(CatalogResponse {
            status: 500,
            body: "boom".to_string(),
        })
    });

    assert!(commands::execute(&client, &cli.command).await.is_err());
}

#[test]
fn test_targets_display_round_trip_through_parse() {
    let target: AnalysisTarget = "HOST1:/data:a.csv:COL".parse().unwrap();
    let parsed = commands::parse_targets(&[target.to_string()]).unwrap();
    assert_eq!(parsed, [target]);
}
