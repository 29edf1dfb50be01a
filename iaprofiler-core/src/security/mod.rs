//! Credential protection and server address handling.
//!
//! - `credentials`: secure credential container with automatic memory zeroing
//! - `address`: `host:port` parsing that refuses embedded credentials

mod address;
mod credentials;

pub use address::{DEFAULT_PORT, ServerAddress, parse_server_address};
pub use credentials::Credentials;
