//! Configuration types.
//!
//! - `ConnectionConfig`: how to reach the catalog (host, TLS, connection cap,
//!   timeouts, retry policy)
//! - `DiscoveryConfig`: how a discovery run walks the catalog
//!
//! # Security
//! These structs intentionally do NOT store passwords. Credentials are
//! handled through the security module.

mod connection;
mod discovery;

pub use connection::ConnectionConfig;
pub use discovery::{DEFAULT_ANALYSIS_DATABASE, DEFAULT_IGNORE_LABEL, DiscoveryConfig};
