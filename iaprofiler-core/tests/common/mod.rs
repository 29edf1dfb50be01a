//! In-memory catalog shared by the integration tests.
#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use iaprofiler_core::{
    CatalogClient,
    transport::{CatalogResponse, MemoryTransport, Method, RecordedRequest},
};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

pub const SEARCH: &str = "/ibm/iis/igc-rest/v1/search";
pub const ASSETS: &str = "/ibm/iis/igc-rest/v1/assets";
pub const CREATE: &str = "/ibm/iis/ia/api/create";
pub const UPDATE: &str = "/ibm/iis/ia/api/update";
pub const PROJECTS: &str = "/ibm/iis/ia/api/projects";
pub const WORKSPACES: &str = "/ibm/iis/dq/da/rest/v1/workspaces";
pub const REGISTER: &str = "/ibm/iis/dq/da/rest/v1/dataSets/doRegisterAndAddToWorkspaces";

/// Catalog contents answered by [`FakeCatalog::respond`].
#[derive(Debug, Default)]
pub struct FakeCatalog {
    pub projects: Vec<String>,
    /// (host, database, schema)
    pub schemas: Vec<(String, String, String)>,
    /// (host, database, schema, table) and columns
    pub tables: Vec<((String, String, String, String), Vec<String>)>,
    /// (host, folder, file) and fields
    pub files: Vec<((String, String, String), Vec<String>)>,
    /// Items returned by the ignore-list search
    pub labelled: Vec<Value>,
    /// (host, database)
    pub databases: Vec<(String, String)>,
    pub workspaces: Vec<Value>,
    /// (host, connection id)
    pub connections: Vec<(String, String)>,
    labels: Mutex<Vec<String>>,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(mut self, name: &str) -> Self {
        self.projects.push(name.to_string());
        self
    }

    pub fn with_schema(mut self, host: &str, database: &str, schema: &str) -> Self {
        self.schemas
            .push((host.to_string(), database.to_string(), schema.to_string()));
        self
    }

    pub fn with_table(mut self, host: &str, database: &str, schema: &str, table: &str, columns: &[&str]) -> Self {
        self.tables.push((
            (
                host.to_string(),
                database.to_string(),
                schema.to_string(),
                table.to_string(),
            ),
            strings(columns),
        ));
        self
    }

    pub fn with_file(mut self, host: &str, folder: &str, file: &str, fields: &[&str]) -> Self {
        self.files.push((
            (host.to_string(), folder.to_string(), file.to_string()),
            strings(fields),
        ));
        self
    }

    pub fn with_labelled(mut self, item: Value) -> Self {
        self.labelled.push(item);
        self
    }

    pub fn with_database(mut self, host: &str, database: &str) -> Self {
        self.databases.push((host.to_string(), database.to_string()));
        self
    }

    pub fn with_workspace(mut self, id: &str, description: &str) -> Self {
        self.workspaces
            .push(json!({"id": id, "name": id, "description": description}));
        self
    }

    pub fn with_connection(mut self, host: &str, id: &str) -> Self {
        self.connections.push((host.to_string(), id.to_string()));
        self
    }

    /// Builds a client over a recording transport answered by this catalog.
    pub fn connect(self) -> (CatalogClient, Arc<MemoryTransport>) {
        let catalog = Arc::new(self);
        let transport = Arc::new(MemoryTransport::new(move |request| {
            Ok(catalog.respond(request))
        }));
        (CatalogClient::new(transport.clone()), transport)
    }

    pub fn respond(&self, request: &RecordedRequest) -> CatalogResponse {
        match (request.method, request.route()) {
            (Method::Post, SEARCH) => {
                let items = self.search(request.json_body().unwrap());
                CatalogResponse::ok(json!({"items": items}).to_string())
            }
            (Method::Post, ASSETS) => {
                let body = request.json_body().unwrap();
                let mut labels = self.labels.lock().unwrap();
                labels.push(body["name"].as_str().unwrap().to_string());
                CatalogResponse::ok(json!({"_id": format!("label-{}", labels.len())}).to_string())
            }
            (Method::Put, route) if route.starts_with(ASSETS) => CatalogResponse::ok("{}"),
            (Method::Get, PROJECTS) => {
                let projects: String = self
                    .projects
                    .iter()
                    .map(|name| format!(r#"<Project name="{name}"/>"#))
                    .collect();
                CatalogResponse::ok(format!(
                    r#"<?xml version="1.0" encoding="UTF-8"?><iaapi:Projects xmlns:iaapi="http://www.ibm.com/investigate/api/iaapi">{projects}</iaapi:Projects>"#
                ))
            }
            (Method::Post, CREATE | UPDATE | REGISTER) => CatalogResponse::ok(""),
            (Method::Get, WORKSPACES) => CatalogResponse::ok(Value::from(self.workspaces.clone()).to_string()),
            _ => CatalogResponse {
                status: 404,
                body: format!("no route for {} {}", request.method, request.path),
            },
        }
    }

    fn search(&self, body: &Value) -> Vec<Value> {
        let types: Vec<&str> = body["types"]
            .as_array()
            .unwrap()
            .iter()
            .map(|value| value.as_str().unwrap())
            .collect();
        let conditions = body["where"]["conditions"].as_array().cloned().unwrap_or_default();
        let has = |property: &str| conditions.iter().any(|c| c["property"] == property);
        let value = |property: &str| {
            conditions
                .iter()
                .find(|c| c["property"] == property)
                .and_then(|c| c["value"].as_str())
                .unwrap_or_default()
                .to_string()
        };

        if types.len() > 1 {
            return self.labelled.clone();
        }
        match types[0] {
            "host" if has("databases") => unique(self.schemas.iter().map(|(host, _, _)| host))
                .into_iter()
                .map(|host| json!({"_id": format!("host-{host}"), "_type": "host", "_name": host}))
                .collect(),
            "host" => unique(self.files.iter().map(|((host, _, _), _)| host))
                .into_iter()
                .map(|host| json!({"_id": format!("host-{host}"), "_type": "host", "_name": host}))
                .collect(),
            "database_schema" => self
                .schemas
                .iter()
                .filter(|(host, _, _)| *host == value("database.host.name"))
                .map(|(host, database, schema)| {
                    json!({
                        "_id": format!("schema-{database}-{schema}"),
                        "_type": "database_schema",
                        "_name": schema,
                        "database.name": {"_type": "database", "_name": database},
                        "database.host.name": host,
                    })
                })
                .collect(),
            "database_table" => self
                .tables
                .iter()
                .filter(|((host, database, schema, _), _)| {
                    *host == value("database_schema.database.host.name")
                        && *database == value("database_schema.database.name")
                        && *schema == value("database_schema.name")
                })
                .map(|((_, _, schema, table), columns)| {
                    let columns: Vec<Value> = columns
                        .iter()
                        .map(|column| json!({"_type": "database_column", "_name": column}))
                        .collect();
                    json!({
                        "_id": format!("table-{table}"),
                        "_type": "database_table",
                        "_name": table,
                        "database_columns": {"items": columns},
                        "database_schema.name": schema,
                    })
                })
                .collect(),
            "data_file" => self
                .files
                .iter()
                .filter(|((host, _, _), _)| *host == value("host.name"))
                .map(|((host, folder, file), _)| {
                    json!({
                        "_id": format!("file-{file}"),
                        "_type": "data_file",
                        "_name": file,
                        "path": folder,
                        "host.name": host,
                    })
                })
                .collect(),
            "data_file_field" => self
                .files
                .iter()
                .filter(|((host, folder, file), _)| {
                    *host == value("data_file.host.name")
                        && *folder == value("data_file.path")
                        && *file == value("data_file.name")
                })
                .flat_map(|(_, fields)| fields.iter())
                .map(|field| json!({"_id": format!("field-{field}"), "_type": "data_file_field", "_name": field}))
                .collect(),
            "label" => self
                .labels
                .lock()
                .unwrap()
                .iter()
                .enumerate()
                .filter(|(_, name)| **name == value("name"))
                .map(|(i, name)| json!({"_id": format!("label-{}", i.saturating_add(1)), "_type": "label", "_name": name}))
                .collect(),
            "database" => self
                .databases
                .iter()
                .filter(|(_, name)| *name == value("name"))
                .map(|(host, name)| {
                    json!({"_id": format!("db-{host}-{name}"), "_type": "database", "_name": name, "host.name": host})
                })
                .collect(),
            "data_connection" => self
                .connections
                .iter()
                .filter(|(host, _)| *host == value("data_connectors.host.name"))
                .map(|(_, id)| json!({"_id": id, "_type": "data_connection", "_name": "LocalFileConnector"}))
                .collect(),
            _ => Vec::new(),
        }
    }
}

fn unique<'a>(values: impl Iterator<Item = &'a String>) -> Vec<&'a String> {
    let mut seen = Vec::new();
    for value in values {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}

/// Conditions of a recorded search, as (property, value) pairs.
pub fn search_conditions(request: &RecordedRequest) -> Vec<(String, String)> {
    request.json_body().unwrap()["where"]["conditions"]
        .as_array()
        .cloned()
        .unwrap_or_default()
        .iter()
        .map(|c| {
            (
                c["property"].as_str().unwrap().to_string(),
                c["value"].as_str().unwrap_or_default().to_string(),
            )
        })
        .collect()
}

/// The first type of a recorded search.
pub fn search_type(request: &RecordedRequest) -> String {
    request.json_body().unwrap()["types"][0]
        .as_str()
        .unwrap()
        .to_string()
}
