//! Asset discovery configuration.

/// Label that marks catalog objects to be left out of profiling projects.
pub const DEFAULT_IGNORE_LABEL: &str = "Information Analyzer Ignore List";

/// Name of the catalog's own analysis database.
pub const DEFAULT_ANALYSIS_DATABASE: &str = "IADB";

/// Configuration for a discovery run.
///
/// Controls which trees are walked, how many branch requests run at once and
/// which label drives the ignore list.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Maximum number of concurrent branch requests per traversal level.
    ///
    /// Requests are still subject to the transport's connection cap.
    /// Default: 4
    pub max_concurrency: usize,

    /// Walk hosts → databases → schemas → tables.
    /// Default: true
    pub include_databases: bool,

    /// Walk hosts → folders → files → fields.
    /// Default: true
    pub include_files: bool,

    /// Name of the ignore-list label.
    pub ignore_label: String,

    /// Page size sent with every catalog search.
    /// Default: 10000
    pub page_size: u32,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            include_databases: true,
            include_files: true,
            ignore_label: DEFAULT_IGNORE_LABEL.to_string(),
            page_size: 10_000,
        }
    }
}

impl DiscoveryConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum branch concurrency.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1); // Ensure at least 1
        self
    }

    /// Enables or disables the database tree.
    pub fn with_databases(mut self, include: bool) -> Self {
        self.include_databases = include;
        self
    }

    /// Enables or disables the file tree.
    pub fn with_files(mut self, include: bool) -> Self {
        self.include_files = include;
        self
    }

    /// Overrides the ignore-list label name.
    pub fn with_ignore_label(mut self, label: impl Into<String>) -> Self {
        self.ignore_label = label.into();
        self
    }

    /// Overrides the search page size.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns a configuration error if both trees are disabled, the label
    /// name is blank, or the concurrency or page size is zero.
    pub fn validate(&self) -> crate::Result<()> {
        if self.max_concurrency == 0 {
            return Err(crate::error::ProfilerError::configuration(
                "max_concurrency must be greater than 0",
            ));
        }
        if self.page_size == 0 {
            return Err(crate::error::ProfilerError::configuration(
                "page_size must be greater than 0",
            ));
        }
        if !self.include_databases && !self.include_files {
            return Err(crate::error::ProfilerError::configuration(
                "discovery needs at least one of databases or files enabled",
            ));
        }
        if self.ignore_label.trim().is_empty() {
            return Err(crate::error::ProfilerError::configuration(
                "ignore label name cannot be empty",
            ));
        }
        Ok(())
    }
}
