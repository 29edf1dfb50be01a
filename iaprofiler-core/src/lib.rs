//! Core library for iaprofiler.
//!
//! Wraps the REST API of a metadata catalog with a column-profiling engine:
//! discovering database and file assets, building project definitions,
//! running and polling analysis tasks, and publishing results.
//!
//! # Security Guarantees
//! - Credentials live in zeroized containers and never reach logs or errors
//! - URLs are redacted before they are logged
//! - Nothing is written to the catalog until discovery has fully completed
//!
//! # Architecture
//! - Every request goes through the [`CatalogTransport`] seam
//! - Operations are `impl CatalogClient` blocks next to their data types
//! - Undocumented endpoints are isolated behind [`InternalEndpoints`]
//! - Errors are a single [`ProfilerError`] with a logical/transport split

pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod identity;
pub mod ignore;
pub mod internal;
pub mod logging;
pub mod project;
pub mod search;
pub mod security;
pub mod tasks;
pub mod transport;

// Re-export commonly used types
pub use client::CatalogClient;
pub use config::{ConnectionConfig, DiscoveryConfig};
pub use discovery::{CommitReport, DiscoveredAssets, FileEntry, SkippedAsset, TableEntry, TreeStats};
pub use error::{ProfilerError, Result};
pub use identity::{AssetType, FileIdentity, TableIdentity};
pub use ignore::{IgnoreSet, LabelRef};
pub use internal::{InternalEndpoints, ReindexOptions};
pub use project::{ColumnAnalysisOptions, ProjectDocument, ProjectWrite};
pub use security::{Credentials, parse_server_address};
pub use tasks::{AnalysisTarget, ExecutionRecord, ExecutionStatus, FileTarget, TableTarget};
pub use transport::{CatalogTransport, HttpTransport, MemoryTransport};
