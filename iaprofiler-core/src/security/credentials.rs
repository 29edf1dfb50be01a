//! Secure credential container with automatic memory zeroing.
//!
//! # Security
//! - Credentials are stored in `Zeroizing<T>` containers
//! - Memory is cleared when the credentials go out of scope
//! - The password is never part of `Debug` output

use zeroize::{Zeroize, Zeroizing};

/// Catalog user credentials, zeroed on drop.
///
/// # Example
///
/// ```rust
/// use iaprofiler_core::security::Credentials;
///
/// let creds = Credentials::new("isadmin".to_string(), Some("secret".to_string()));
/// assert_eq!(creds.username(), "isadmin");
/// assert!(creds.has_password());
/// assert!(!format!("{creds:?}").contains("secret"));
/// ```
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct Credentials {
    username: Zeroizing<String>,
    password: Zeroizing<Option<String>>,
}

impl Credentials {
    /// Creates new credentials with automatic memory zeroing.
    pub fn new(username: String, password: Option<String>) -> Self {
        Self {
            username: Zeroizing::new(username),
            password: Zeroizing::new(password),
        }
    }

    /// Gets the username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Checks if a password is present without exposing it.
    pub fn has_password(&self) -> bool {
        self.password.as_deref().is_some_and(|p| !p.is_empty())
    }

    /// Exposes the password for building an authorization header.
    ///
    /// Only the transport calls this; the value must not be logged.
    pub(crate) fn expose_password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Returns true when both a username and a password are present.
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && self.has_password()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username.as_str())
            .field("password", &self.password.as_ref().map(|_| "****"))
            .finish()
    }
}
