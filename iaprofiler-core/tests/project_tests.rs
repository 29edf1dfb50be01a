//! Project lifecycle and staleness queries against a recording transport.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{TimeZone, Utc};
use iaprofiler_core::{
    AnalysisTarget, CatalogClient, FileTarget, ProjectDocument, ProjectWrite, TableTarget,
    transport::{CatalogResponse, MemoryTransport, Method},
};
use std::sync::Arc;

const PROJECT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<iaapi:Project xmlns:iaapi="http://www.ibm.com/investigate/api/iaapi" name="Automated Profiling">
  <description>Nightly discovery</description>
  <DataSources>
    <DataSource name="DB1">
      <Schema name="SCH1">
        <Table name="T1"><Column name="A"/><Column name="B"/></Table>
      </Schema>
    </DataSource>
    <DataSource name="HOST1">
      <FileFolder name="/data">
        <FileName name="file1.csv"><Column name="id"/></FileName>
      </FileFolder>
    </DataSource>
  </DataSources>
</iaapi:Project>"#;

fn column_results(last_run: &str) -> String {
    format!(
        r#"<ColumnAnalysisResults><Column name="A"><RunInfo lastRunDate="{last_run}"/></Column></ColumnAnalysisResults>"#
    )
}

fn catalog() -> (CatalogClient, Arc<MemoryTransport>) {
    let transport = Arc::new(MemoryTransport::new(|request| {
        let body = match (request.method, request.route()) {
            (Method::Get, "/ibm/iis/ia/api/projects") => {
                r#"<Projects><Project name="Automated Profiling"/><Project name="Other"/></Projects>"#
                    .to_string()
            }
            (Method::Get, "/ibm/iis/ia/api/project") => PROJECT_XML.to_string(),
            (Method::Get, "/ibm/iis/ia/api/columnAnalysis/results") => {
                match request.query_param("columnName").as_deref() {
                    Some("DB1.SCH1.T1.*") => column_results("2024-05-02T08:00:00"),
                    _ => column_results("2024-04-01T08:00:00"),
                }
            }
            _ => String::new(),
        };
        Ok(CatalogResponse::ok(body))
    }));
    (CatalogClient::new(transport.clone()), transport)
}

#[tokio::test]
async fn test_project_listing_and_existence() {
    let (client, _) = catalog();

    assert_eq!(
        client.list_projects().await.unwrap(),
        vec!["Automated Profiling".to_string(), "Other".to_string()]
    );
    assert!(client.project_exists("Automated Profiling").await.unwrap());
    assert!(!client.project_exists("Automated").await.unwrap());
}

#[tokio::test]
async fn test_create_or_update_decides_by_listing() {
    let (client, transport) = catalog();

    let write = client
        .create_or_update_project(&ProjectDocument::new("Automated Profiling"))
        .await
        .unwrap();
    assert_eq!(write, ProjectWrite::Updated);

    let write = client
        .create_or_update_project(&ProjectDocument::new("Fresh"))
        .await
        .unwrap();
    assert_eq!(write, ProjectWrite::Created);

    assert_eq!(transport.requests_to("/ibm/iis/ia/api/update").len(), 1);
    assert_eq!(transport.requests_to("/ibm/iis/ia/api/create").len(), 1);
}

#[tokio::test]
async fn test_get_project_parses_definition() {
    let (client, transport) = catalog();

    let project = client.get_project("Automated Profiling").await.unwrap();

    assert_eq!(project.name(), "Automated Profiling");
    assert_eq!(project.description(), Some("Nightly discovery"));
    let tables: Vec<_> = project.tables().map(|(db, schema, table)| (db, schema.name.as_str(), table.name.as_str())).collect();
    assert_eq!(tables, vec![("DB1", "SCH1", "T1")]);
    assert_eq!(project.files().count(), 1);

    let request = &transport.requests()[0];
    assert_eq!(request.query_param("projectName").as_deref(), Some("Automated Profiling"));
    assert!(request.path.contains("projectName=Automated+Profiling"));
}

#[tokio::test]
async fn test_delete_project() {
    let (client, transport) = catalog();

    client.delete_project("Other").await.unwrap();

    let request = &transport.requests()[0];
    assert_eq!(request.method, Method::Delete);
    assert_eq!(request.route(), "/ibm/iis/ia/api/project");
}

#[tokio::test]
async fn test_project_targets_cover_tables_and_files() {
    let (client, _) = catalog();

    let targets = client.project_targets("Automated Profiling").await.unwrap();

    assert_eq!(
        targets,
        vec![
            AnalysisTarget::Table(TableTarget::all_columns("DB1", "SCH1", "T1")),
            AnalysisTarget::File(FileTarget::all_columns("HOST1", "/data", "file1.csv")),
        ]
    );
}

#[tokio::test]
async fn test_stale_targets_respect_cutoff() {
    let (client, _) = catalog();
    let cutoff = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();

    let stale = client.stale_targets("Automated Profiling", cutoff).await.unwrap();

    // The table was analyzed after the cutoff; the file was not.
    assert_eq!(
        stale,
        vec![AnalysisTarget::File(FileTarget::all_columns(
            "HOST1",
            "/data",
            "file1.csv"
        ))]
    );
}
