//! Password sourcing.
//!
//! Order: `IA_PASSWORD`, then `--password-file`, then an interactive prompt.
//! The password never travels through command-line arguments.

use anyhow::{Context, bail};
use std::path::{Path, PathBuf};

/// Environment variable holding the catalog password.
pub const PASSWORD_ENV: &str = "IA_PASSWORD";

/// Where a password came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordSource {
    Environment,
    File(PathBuf),
    Prompt,
}

/// A resolved password. `Debug` never shows the value.
pub struct Password {
    value: String,
    source: PasswordSource,
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Password")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .finish()
    }
}

impl Password {
    pub fn source(&self) -> &PasswordSource {
        &self.source
    }

    /// Hands the value over to the credential container.
    pub fn into_inner(self) -> String {
        self.value
    }
}

/// Resolves the catalog password.
///
/// # Errors
/// Returns an error if the file cannot be read, the value is empty, or the
/// prompt fails.
pub fn resolve_password(password_file: Option<&Path>) -> anyhow::Result<Password> {
    if let Ok(value) = std::env::var(PASSWORD_ENV)
        && !value.is_empty()
    {
        return Ok(Password {
            value,
            source: PasswordSource::Environment,
        });
    }

    if let Some(path) = password_file {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read password file {}", path.display()))?;
        let value = contents.lines().next().unwrap_or_default().trim_end().to_string();
        if value.is_empty() {
            bail!("Password file {} is empty", path.display());
        }
        return Ok(Password {
            value,
            source: PasswordSource::File(path.to_path_buf()),
        });
    }

    let value = rpassword::prompt_password("Catalog password: ").context("Failed to read password")?;
    if value.is_empty() {
        bail!("Password cannot be empty");
    }
    Ok(Password {
        value,
        source: PasswordSource::Prompt,
    })
}
