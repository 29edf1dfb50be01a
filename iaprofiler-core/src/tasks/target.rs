//! Analysis targets.
//!
//! Library callers build [`AnalysisTarget`] values directly. Only the CLI
//! parses them from strings, where the delimiter decides the kind:
//! `DB1.SCH1.T1.*` is a table target and `HOST1:/data:file1.csv:*` a file
//! target.

use crate::{Result, error::ProfilerError};
use serde::{Deserialize, Serialize};

/// Column wildcard selecting every column of a table or file.
pub const ALL_COLUMNS: &str = "*";

/// A column (or every column) of a database table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableTarget {
    pub database: String,
    pub schema: String,
    pub table: String,
    pub column: String,
}

impl TableTarget {
    /// Targets one column.
    pub fn new(
        database: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            schema: schema.into(),
            table: table.into(),
            column: column.into(),
        }
    }

    /// Targets every column of the table.
    pub fn all_columns(
        database: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self::new(database, schema, table, ALL_COLUMNS)
    }

    /// `DB.SCHEMA.TABLE`
    pub fn table_reference(&self) -> String {
        format!("{}.{}.{}", self.database, self.schema, self.table)
    }

    /// `DB.SCHEMA.TABLE.COLUMN`
    pub fn column_reference(&self) -> String {
        format!("{}.{}", self.table_reference(), self.column)
    }
}

/// A field (or every field) of a data file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileTarget {
    pub host: String,
    pub folder: String,
    pub file: String,
    pub column: String,
}

impl FileTarget {
    /// Targets one field.
    pub fn new(
        host: impl Into<String>,
        folder: impl Into<String>,
        file: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            folder: folder.into(),
            file: file.into(),
            column: column.into(),
        }
    }

    /// Targets every field of the file.
    pub fn all_columns(
        host: impl Into<String>,
        folder: impl Into<String>,
        file: impl Into<String>,
    ) -> Self {
        Self::new(host, folder, file, ALL_COLUMNS)
    }

    /// `HOST:FOLDER:FILE`
    pub fn table_reference(&self) -> String {
        format!("{}:{}:{}", self.host, self.folder, self.file)
    }

    /// `HOST:FOLDER:FILE:COLUMN`
    pub fn column_reference(&self) -> String {
        format!("{}:{}", self.table_reference(), self.column)
    }
}

/// What an analysis or publish task runs against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisTarget {
    Table(TableTarget),
    File(FileTarget),
}

impl AnalysisTarget {
    /// Name used in `<Table name>` of a publish task.
    pub fn table_reference(&self) -> String {
        match self {
            Self::Table(target) => target.table_reference(),
            Self::File(target) => target.table_reference(),
        }
    }

    /// Name used in `<Column name>` of a column analysis task.
    pub fn column_reference(&self) -> String {
        match self {
            Self::Table(target) => target.column_reference(),
            Self::File(target) => target.column_reference(),
        }
    }

    /// Returns true for file targets.
    pub fn is_file(&self) -> bool {
        matches!(self, Self::File(_))
    }
}

impl From<TableTarget> for AnalysisTarget {
    fn from(target: TableTarget) -> Self {
        Self::Table(target)
    }
}

impl From<FileTarget> for AnalysisTarget {
    fn from(target: FileTarget) -> Self {
        Self::File(target)
    }
}

impl std::fmt::Display for AnalysisTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.column_reference())
    }
}

impl std::str::FromStr for AnalysisTarget {
    type Err = ProfilerError;

    /// Parses a target string.
    ///
    /// A `:` that appears before any `.` (or a `:` with no `.` at all)
    /// selects a file target; everything else is a table target. The column
    /// part is optional and defaults to `*`.
    fn from_str(s: &str) -> Result<Self> {
        let input = s.trim();
        let colon = input.find(':');
        let dot = input.find('.');
        let is_file = match (colon, dot) {
            (Some(colon), Some(dot)) => colon < dot,
            (Some(_), None) => true,
            _ => false,
        };

        if is_file {
            parse_file_target(input).map(Self::File)
        } else {
            parse_table_target(input).map(Self::Table)
        }
    }
}

fn parse_table_target(input: &str) -> Result<TableTarget> {
    let parts: Vec<&str> = input.split('.').collect();
    if parts.iter().any(|part| part.is_empty()) {
        return Err(ProfilerError::invalid_target(input, "empty name component"));
    }
    match parts.as_slice() {
        [database, schema, table] => Ok(TableTarget::all_columns(*database, *schema, *table)),
        [database, schema, table, column] => {
            Ok(TableTarget::new(*database, *schema, *table, *column))
        }
        _ => Err(ProfilerError::invalid_target(
            input,
            "expected database.schema.table[.column]",
        )),
    }
}

fn parse_file_target(input: &str) -> Result<FileTarget> {
    let parts: Vec<&str> = input.split(':').collect();
    if parts.iter().any(|part| part.is_empty()) {
        return Err(ProfilerError::invalid_target(input, "empty name component"));
    }
    match parts.as_slice() {
        [host, folder, file] => Ok(FileTarget::all_columns(*host, *folder, *file)),
        [host, folder, file, column] => Ok(FileTarget::new(*host, *folder, *file, *column)),
        _ => Err(ProfilerError::invalid_target(
            input,
            "expected host:folder:file[:column]",
        )),
    }
}
