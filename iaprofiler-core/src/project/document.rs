//! The vendor project document.
//!
//! A [`ProjectDocument`] is built up in memory and serialized once. The XML
//! is submitted byte for byte to the catalog, so element names, attribute
//! names and nesting follow the vendor schema exactly:
//!
//! ```text
//! iaapi:Project[name]
//! ├── description
//! ├── DataSources
//! │   └── DataSource[name]
//! │       ├── Schema[name] / Table[name] / Column[name]
//! │       └── FileFolder[name] / FileName[name] / Column[name]
//! └── Tasks
//!     ├── RunColumnAnalysis[...] / Column[name]
//!     ├── PublishResults / Table[name]
//!     └── RunRules / ExecutableRule[name]
//! ```

use super::tasks::{
    CaptureFdResults, ColumnAnalysisOptions, ColumnAnalysisTask, DataRulesTask, ProjectTask,
    PublishResultsTask,
};
use super::xml::{XmlElement, XmlWriter};
use crate::{Result, error::ProfilerError, tasks::AnalysisTarget};
use serde::{Deserialize, Serialize};

/// Namespace of the project root element.
pub const IAAPI_NAMESPACE: &str = "http://www.ibm.com/investigate/api/iaapi";

/// Qualified name of the project root element.
pub const PROJECT_ELEMENT: &str = "iaapi:Project";

/// A table with its column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableNode {
    pub name: String,
    pub columns: Vec<String>,
}

/// A database schema with its tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaNode {
    pub name: String,
    pub tables: Vec<TableNode>,
}

/// A data file with its field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
    pub name: String,
    pub columns: Vec<String>,
}

/// A folder (by full path) with its files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFolderNode {
    pub name: String,
    pub files: Vec<FileNode>,
}

/// What a data source contains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSourceContent {
    Schemas(Vec<SchemaNode>),
    FileFolders(Vec<FileFolderNode>),
}

/// A database (named after the database) or a file host (named after the
/// host).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    pub name: String,
    pub content: DataSourceContent,
}

/// In-memory project definition.
///
/// Every [`add_table`](Self::add_table) and [`add_file`](Self::add_file)
/// call appends a new `DataSource` node, even when one with the same name
/// exists already. Tasks are different: there is at most one task element
/// of each kind, and repeated additions extend it.
///
/// # Example
/// ```rust
/// use iaprofiler_core::project::ProjectDocument;
///
/// let mut project = ProjectDocument::new("Automated Profiling");
/// project.set_description("Nightly discovery");
/// project.add_table("DB1", "SCH1", "T1", ["A", "B"]);
///
/// let xml = project.to_xml().unwrap();
/// assert!(xml.contains(r#"<DataSource name="DB1"><Schema name="SCH1"><Table name="T1">"#));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDocument {
    name: String,
    description: Option<String>,
    data_sources: Vec<DataSource>,
    tasks: Vec<ProjectTask>,
}

impl ProjectDocument {
    /// Creates an empty document for the named project.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            data_sources: Vec::new(),
            tasks: Vec::new(),
        }
    }

    /// Project name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the `description` element.
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    /// Project description, if set.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Data sources in insertion order.
    pub fn data_sources(&self) -> &[DataSource] {
        &self.data_sources
    }

    /// Tasks in insertion order.
    pub fn tasks(&self) -> &[ProjectTask] {
        &self.tasks
    }

    /// Appends `DataSource[datasource]/Schema[schema]/Table[table]` with the
    /// given columns.
    pub fn add_table<I, S>(&mut self, datasource: &str, schema: &str, table: &str, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data_sources.push(DataSource {
            name: datasource.to_string(),
            content: DataSourceContent::Schemas(vec![SchemaNode {
                name: schema.to_string(),
                tables: vec![TableNode {
                    name: table.to_string(),
                    columns: columns.into_iter().map(Into::into).collect(),
                }],
            }]),
        });
    }

    /// Appends one `DataSource[datasource]/Schema[schema]` holding all the
    /// given tables.
    pub fn add_schema_tables<I>(&mut self, datasource: &str, schema: &str, tables: I)
    where
        I: IntoIterator<Item = TableNode>,
    {
        self.data_sources.push(DataSource {
            name: datasource.to_string(),
            content: DataSourceContent::Schemas(vec![SchemaNode {
                name: schema.to_string(),
                tables: tables.into_iter().collect(),
            }]),
        });
    }

    /// Appends `DataSource[datasource]/FileFolder[folder]/FileName[file]`
    /// with the given fields.
    pub fn add_file<I, S>(&mut self, datasource: &str, folder: &str, file: &str, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data_sources.push(DataSource {
            name: datasource.to_string(),
            content: DataSourceContent::FileFolders(vec![FileFolderNode {
                name: folder.to_string(),
                files: vec![FileNode {
                    name: file.to_string(),
                    columns: fields.into_iter().map(Into::into).collect(),
                }],
            }]),
        });
    }

    /// Adds column analysis for the targets.
    ///
    /// The first call fixes the task options; later calls only add columns.
    pub fn add_column_analysis(&mut self, options: ColumnAnalysisOptions, targets: &[AnalysisTarget]) {
        let columns = targets.iter().map(AnalysisTarget::column_reference);
        let existing = self.tasks.iter_mut().find_map(|task| match task {
            ProjectTask::ColumnAnalysis(analysis) => Some(analysis),
            _ => None,
        });
        match existing {
            Some(analysis) => analysis.columns.extend(columns),
            None => self.tasks.push(ProjectTask::ColumnAnalysis(ColumnAnalysisTask {
                options,
                columns: columns.collect(),
            })),
        }
    }

    /// Adds the targets' tables to the publish task.
    pub fn add_publish_results(&mut self, targets: &[AnalysisTarget]) {
        let tables = targets.iter().map(AnalysisTarget::table_reference);
        let existing = self.tasks.iter_mut().find_map(|task| match task {
            ProjectTask::PublishResults(publish) => Some(publish),
            _ => None,
        });
        match existing {
            Some(publish) => publish.tables.extend(tables),
            None => self.tasks.push(ProjectTask::PublishResults(PublishResultsTask {
                tables: tables.collect(),
            })),
        }
    }

    /// Adds executable data rules to the rules task.
    pub fn add_data_rules<I, S>(&mut self, rules: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rules = rules.into_iter().map(Into::into);
        let existing = self.tasks.iter_mut().find_map(|task| match task {
            ProjectTask::RunRules(run) => Some(run),
            _ => None,
        });
        match existing {
            Some(run) => run.rules.extend(rules),
            None => self.tasks.push(ProjectTask::RunRules(DataRulesTask {
                rules: rules.collect(),
            })),
        }
    }

    /// Every `(datasource, schema, table)` in document order.
    pub fn tables(&self) -> impl Iterator<Item = (&str, &SchemaNode, &TableNode)> + '_ {
        self.data_sources.iter().flat_map(|source| {
            let schemas: &[SchemaNode] = match &source.content {
                DataSourceContent::Schemas(schemas) => schemas,
                DataSourceContent::FileFolders(_) => &[],
            };
            schemas.iter().flat_map(move |schema| {
                schema
                    .tables
                    .iter()
                    .map(move |table| (source.name.as_str(), schema, table))
            })
        })
    }

    /// Every `(host, folder, file)` in document order.
    pub fn files(&self) -> impl Iterator<Item = (&str, &FileFolderNode, &FileNode)> + '_ {
        self.data_sources.iter().flat_map(|source| {
            let folders: &[FileFolderNode] = match &source.content {
                DataSourceContent::FileFolders(folders) => folders,
                DataSourceContent::Schemas(_) => &[],
            };
            folders.iter().flat_map(move |folder| {
                folder
                    .files
                    .iter()
                    .map(move |file| (source.name.as_str(), folder, file))
            })
        })
    }

    /// Serializes the document to the vendor XML.
    ///
    /// # Errors
    /// Returns an XML error if writing fails.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = XmlWriter::new();
        writer.declaration()?;
        writer.start(
            PROJECT_ELEMENT,
            &[("xmlns:iaapi", IAAPI_NAMESPACE), ("name", self.name.as_str())],
        )?;

        if let Some(description) = &self.description {
            writer.text_element("description", description)?;
        }

        if !self.data_sources.is_empty() {
            writer.start("DataSources", &[])?;
            for source in &self.data_sources {
                write_data_source(&mut writer, source)?;
            }
            writer.end("DataSources")?;
        }

        if !self.tasks.is_empty() {
            writer.start("Tasks", &[])?;
            for task in &self.tasks {
                write_task(&mut writer, task)?;
            }
            writer.end("Tasks")?;
        }

        writer.end(PROJECT_ELEMENT)?;
        writer.finish()
    }

    /// Parses a project document, such as the response of
    /// `GET /ibm/iis/ia/api/project`.
    ///
    /// # Errors
    /// Returns an XML error for malformed input, or an unexpected-response
    /// error if the root is not a named `Project`.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let root = XmlElement::parse(xml)?;
        if root.name != "Project" {
            return Err(ProfilerError::unexpected(format!(
                "expected a Project document, found <{}>",
                root.name
            )));
        }
        let name = root
            .attr("name")
            .ok_or_else(|| ProfilerError::unexpected("Project element has no name"))?;

        let mut project = Self::new(name);
        project.description = root
            .child("description")
            .map(|description| description.trimmed_text().to_string());

        if let Some(sources) = root.child("DataSources") {
            for source in sources.children_named("DataSource") {
                project.data_sources.push(read_data_source(source));
            }
        }

        if let Some(tasks) = root.child("Tasks") {
            for task in &tasks.children {
                if let Some(task) = read_task(task)? {
                    project.tasks.push(task);
                }
            }
        }

        Ok(project)
    }
}

fn write_named_list(writer: &mut XmlWriter, element: &str, names: &[String]) -> Result<()> {
    for name in names {
        writer.empty(element, &[("name", name.as_str())])?;
    }
    Ok(())
}

/// Writes `<element name>children</element>`, or `<element name/>` when
/// there are no children.
fn write_leaf_parent(
    writer: &mut XmlWriter,
    element: &str,
    name: &str,
    child_element: &str,
    children: &[String],
) -> Result<()> {
    if children.is_empty() {
        return writer.empty(element, &[("name", name)]);
    }
    writer.start(element, &[("name", name)])?;
    write_named_list(writer, child_element, children)?;
    writer.end(element)
}

fn write_data_source(writer: &mut XmlWriter, source: &DataSource) -> Result<()> {
    writer.start("DataSource", &[("name", source.name.as_str())])?;
    match &source.content {
        DataSourceContent::Schemas(schemas) => {
            for schema in schemas {
                writer.start("Schema", &[("name", schema.name.as_str())])?;
                for table in &schema.tables {
                    write_leaf_parent(writer, "Table", &table.name, "Column", &table.columns)?;
                }
                writer.end("Schema")?;
            }
        }
        DataSourceContent::FileFolders(folders) => {
            for folder in folders {
                writer.start("FileFolder", &[("name", folder.name.as_str())])?;
                for file in &folder.files {
                    write_leaf_parent(writer, "FileName", &file.name, "Column", &file.columns)?;
                }
                writer.end("FileFolder")?;
            }
        }
    }
    writer.end("DataSource")
}

fn write_task(writer: &mut XmlWriter, task: &ProjectTask) -> Result<()> {
    let element = task.element_name();
    match task {
        ProjectTask::ColumnAnalysis(analysis) => {
            let options = &analysis.options;
            let min = options.min_fd_capture_size.to_string();
            let max = options.max_fd_capture_size.to_string();
            writer.start(
                element,
                &[
                    ("analyzeColumnProperties", bool_str(options.analyze_column_properties)),
                    ("captureFDResultsType", options.capture_fd_results.as_str()),
                    ("minFDCaptureSize", min.as_str()),
                    ("maxFDCaptureSize", max.as_str()),
                    ("analyzeDataClasses", bool_str(options.analyze_data_classes)),
                ],
            )?;
            write_named_list(writer, "Column", &analysis.columns)?;
        }
        ProjectTask::PublishResults(publish) => {
            writer.start(element, &[])?;
            write_named_list(writer, "Table", &publish.tables)?;
        }
        ProjectTask::RunRules(run) => {
            writer.start(element, &[])?;
            write_named_list(writer, "ExecutableRule", &run.rules)?;
        }
    }
    writer.end(element)
}

fn bool_str(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

fn child_names(element: &XmlElement, child: &str) -> Vec<String> {
    element
        .children_named(child)
        .filter_map(|c| c.attr("name"))
        .map(ToString::to_string)
        .collect()
}

fn name_of(element: &XmlElement) -> String {
    element.attr("name").unwrap_or_default().to_string()
}

fn read_data_source(source: &XmlElement) -> DataSource {
    let folders: Vec<FileFolderNode> = source
        .children_named("FileFolder")
        .map(|folder| FileFolderNode {
            name: name_of(folder),
            files: folder
                .children_named("FileName")
                .map(|file| FileNode {
                    name: name_of(file),
                    columns: child_names(file, "Column"),
                })
                .collect(),
        })
        .collect();

    let content = if folders.is_empty() {
        DataSourceContent::Schemas(
            source
                .children_named("Schema")
                .map(|schema| SchemaNode {
                    name: name_of(schema),
                    tables: schema
                        .children_named("Table")
                        .map(|table| TableNode {
                            name: name_of(table),
                            columns: child_names(table, "Column"),
                        })
                        .collect(),
                })
                .collect(),
        )
    } else {
        DataSourceContent::FileFolders(folders)
    };

    DataSource {
        name: name_of(source),
        content,
    }
}

fn read_task(task: &XmlElement) -> Result<Option<ProjectTask>> {
    let parsed = match task.name.as_str() {
        "RunColumnAnalysis" => {
            let defaults = ColumnAnalysisOptions::new(false);
            let options = ColumnAnalysisOptions {
                analyze_column_properties: task
                    .attr("analyzeColumnProperties")
                    .map_or(defaults.analyze_column_properties, |v| v == "true"),
                capture_fd_results: task
                    .attr("captureFDResultsType")
                    .map(str::parse::<CaptureFdResults>)
                    .transpose()?
                    .unwrap_or(defaults.capture_fd_results),
                min_fd_capture_size: parse_size(task, "minFDCaptureSize", defaults.min_fd_capture_size)?,
                max_fd_capture_size: parse_size(task, "maxFDCaptureSize", defaults.max_fd_capture_size)?,
                analyze_data_classes: task
                    .attr("analyzeDataClasses")
                    .is_some_and(|v| v == "true"),
            };
            Some(ProjectTask::ColumnAnalysis(ColumnAnalysisTask {
                options,
                columns: child_names(task, "Column"),
            }))
        }
        "PublishResults" => Some(ProjectTask::PublishResults(PublishResultsTask {
            tables: child_names(task, "Table"),
        })),
        "RunRules" => Some(ProjectTask::RunRules(DataRulesTask {
            rules: child_names(task, "ExecutableRule"),
        })),
        _ => None,
    };
    Ok(parsed)
}

fn parse_size(task: &XmlElement, attribute: &str, default: u32) -> Result<u32> {
    task.attr(attribute).map_or(Ok(default), |value| {
        value.parse().map_err(|_| {
            ProfilerError::unexpected(format!("{attribute} is not a number: '{value}'"))
        })
    })
}
