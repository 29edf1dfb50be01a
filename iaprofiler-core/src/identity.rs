//! Identity strings for catalog objects.
//!
//! An identity is the `::`-joined path from the host down to the object, e.g.
//! `HOST1::DB1::SCH1::T1` for a table or `HOST1::/data::file1.csv` for a
//! file. Identities are the join key between discovery and the ignore list.
//! Components must not themselves contain `::`.

use crate::{Result, error::ProfilerError};
use serde::{Deserialize, Serialize};

/// Separator between identity components.
pub const IDENTITY_DELIMITER: &str = "::";

/// Catalog object types the profiler walks or ignores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Host,
    Database,
    DatabaseSchema,
    DatabaseTable,
    DatabaseColumn,
    DataFileFolder,
    DataFile,
    DataFileField,
}

impl AssetType {
    /// Every type that can carry the ignore label.
    pub const ALL: [Self; 8] = [
        Self::Host,
        Self::Database,
        Self::DatabaseSchema,
        Self::DatabaseTable,
        Self::DatabaseColumn,
        Self::DataFileFolder,
        Self::DataFile,
        Self::DataFileField,
    ];

    /// The catalog's type name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Database => "database",
            Self::DatabaseSchema => "database_schema",
            Self::DatabaseTable => "database_table",
            Self::DatabaseColumn => "database_column",
            Self::DataFileFolder => "data_file_folder",
            Self::DataFile => "data_file",
            Self::DataFileField => "data_file_field",
        }
    }

    /// Number of components in an identity of this type.
    pub fn identity_len(self) -> usize {
        match self {
            Self::Host => 1,
            Self::Database | Self::DataFileFolder => 2,
            Self::DatabaseSchema | Self::DataFile => 3,
            Self::DatabaseTable | Self::DataFileField => 4,
            Self::DatabaseColumn => 5,
        }
    }
}

impl std::fmt::Display for AssetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AssetType {
    type Err = ProfilerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ProfilerError::unexpected(format!("unknown asset type '{s}'")))
    }
}

/// Joins components into an identity string.
///
/// Components containing `::` (an IPv6 host such as `::1`) still produce a
/// stable string for ignore-list matching, but the result no longer splits
/// back into the same components.
pub fn join_identity<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut identity = String::new();
    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            identity.push_str(IDENTITY_DELIMITER);
        }
        identity.push_str(part.as_ref());
    }
    identity
}

/// Splits an identity string into its components.
pub fn split_identity(identity: &str) -> Vec<&str> {
    identity.split(IDENTITY_DELIMITER).collect()
}

/// Identity of a host.
pub fn host_identity(host: &str) -> String {
    host.to_string()
}

/// Identity of a database.
pub fn database_identity(host: &str, database: &str) -> String {
    join_identity([host, database])
}

/// Identity of a database schema.
pub fn schema_identity(host: &str, database: &str, schema: &str) -> String {
    join_identity([host, database, schema])
}

/// Identity of a column of a database table.
pub fn column_identity(host: &str, database: &str, schema: &str, table: &str, column: &str) -> String {
    join_identity([host, database, schema, table, column])
}

/// Identity of a data file folder, keyed by its full path.
pub fn folder_identity(host: &str, folder_path: &str) -> String {
    join_identity([host, folder_path])
}

/// Identity of a field of a data file.
pub fn field_identity(host: &str, folder_path: &str, file: &str, field: &str) -> String {
    join_identity([host, folder_path, file, field])
}

/// Structured identity of a database table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableIdentity {
    pub host: String,
    pub database: String,
    pub schema: String,
    pub table: String,
}

impl TableIdentity {
    /// Creates a table identity from its components.
    pub fn new(
        host: impl Into<String>,
        database: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            database: database.into(),
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Identity of the schema containing this table.
    pub fn schema_identity(&self) -> String {
        schema_identity(&self.host, &self.database, &self.schema)
    }
}

impl std::fmt::Display for TableIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&join_identity([
            &self.host,
            &self.database,
            &self.schema,
            &self.table,
        ]))
    }
}

impl std::str::FromStr for TableIdentity {
    type Err = ProfilerError;

    fn from_str(s: &str) -> Result<Self> {
        match split_identity(s).as_slice() {
            [host, database, schema, table] => Ok(Self::new(*host, *database, *schema, *table)),
            _ => Err(ProfilerError::InvalidIdentity {
                identity: s.to_string(),
                expected: AssetType::DatabaseTable.identity_len(),
            }),
        }
    }
}

/// Structured identity of a data file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileIdentity {
    pub host: String,
    pub folder: String,
    pub file: String,
}

impl FileIdentity {
    /// Creates a file identity from its components.
    pub fn new(host: impl Into<String>, folder: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            folder: folder.into(),
            file: file.into(),
        }
    }

    /// Identity of the folder containing this file.
    pub fn folder_identity(&self) -> String {
        folder_identity(&self.host, &self.folder)
    }
}

impl std::fmt::Display for FileIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&join_identity([&self.host, &self.folder, &self.file]))
    }
}

impl std::str::FromStr for FileIdentity {
    type Err = ProfilerError;

    fn from_str(s: &str) -> Result<Self> {
        match split_identity(s).as_slice() {
            [host, folder, file] => Ok(Self::new(*host, *folder, *file)),
            _ => Err(ProfilerError::InvalidIdentity {
                identity: s.to_string(),
                expected: AssetType::DataFile.identity_len(),
            }),
        }
    }
}
