//! Parsing of `host:port` server addresses supplied on the command line.

use crate::{Result, error::ProfilerError};

/// Port the catalog services listen on when none is given.
pub const DEFAULT_PORT: u16 = 9443;

/// Host and port of a catalog server, free of any credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    /// Host name or IP address
    pub host: String,
    /// HTTPS port
    pub port: u16,
}

impl std::fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Parses a `host[:port]` string.
///
/// Anything that looks like a URL with embedded credentials is rejected so a
/// password can never travel through this path into logs.
///
/// # Errors
/// Returns a configuration error for empty input, embedded credentials, or an
/// unparseable port.
///
/// # Example
/// ```rust
/// use iaprofiler_core::security::parse_server_address;
///
/// let address = parse_server_address("ia.example.com:9445").unwrap();
/// assert_eq!(address.host, "ia.example.com");
/// assert_eq!(address.port, 9445);
/// ```
pub fn parse_server_address(input: &str) -> Result<ServerAddress> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ProfilerError::configuration("server address cannot be empty"));
    }
    if trimmed.contains('@') {
        return Err(ProfilerError::configuration(
            "server address must not embed credentials; use --user and a password source",
        ));
    }

    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed)
        .trim_end_matches('/');

    let parsed = url::Url::parse(&format!("https://{without_scheme}")).map_err(|e| {
        ProfilerError::configuration(format!("invalid server address '{trimmed}': {e}"))
    })?;

    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ProfilerError::configuration(format!("no host in '{trimmed}'")))?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string();

    if parsed.path() != "/" {
        return Err(ProfilerError::configuration(format!(
            "server address '{trimmed}' must not contain a path"
        )));
    }

    Ok(ServerAddress {
        host,
        port: parsed.port().unwrap_or(DEFAULT_PORT),
    })
}
