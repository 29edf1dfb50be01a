//! Project documents and the project lifecycle API.
//!
//! # Module Structure
//! - `document`: the in-memory project and its XML form
//! - `tasks`: column analysis, publish and rule task definitions
//! - `responses`: readers for project and task endpoint responses
//! - `api`: list/create/update/get/delete against the catalog
//! - `xml`: quick-xml writer and element tree

mod api;
mod document;
mod responses;
mod tasks;
mod xml;

pub use api::{IA_API_PATH, ProjectWrite};
pub(crate) use api::ia_path;
pub use document::{
    DataSource, DataSourceContent, FileFolderNode, FileNode, IAAPI_NAMESPACE, PROJECT_ELEMENT,
    ProjectDocument, SchemaNode, TableNode,
};
pub use responses::{
    parse_catalog_timestamp, parse_column_analysis_dates, parse_executable_rules,
    parse_project_names, parse_schedule_ids, parse_task_executions,
};
pub use tasks::{
    CaptureFdResults, ColumnAnalysisOptions, ColumnAnalysisTask, DataRulesTask, ProjectTask,
    PublishResultsTask,
};
pub use xml::XmlElement;
