//! Per-tree branch accounting.

use crate::{Result, error::ProfilerError};
use serde::Serialize;

/// Counts of one traversal tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TreeStats {
    /// Branches scheduled after ignore filtering
    pub discovered: usize,
    /// Branches whose leaf response was accumulated
    pub added: usize,
    /// Objects left out because of the ignore list
    pub skipped: usize,
}

/// Tracks scheduled and reported branches of one traversal tree.
///
/// `discovered` is bumped when a branch is scheduled, before its request is
/// sent; `added` when its response has been accumulated. Skipped objects
/// never touch either counter. `added` never exceeds `discovered`.
#[derive(Debug, Default)]
pub struct BranchLedger {
    tree: &'static str,
    stats: TreeStats,
}

impl BranchLedger {
    /// A ledger for the named tree.
    pub fn new(tree: &'static str) -> Self {
        Self {
            tree,
            stats: TreeStats::default(),
        }
    }

    /// Records a scheduled branch.
    pub fn discover(&mut self) {
        self.stats.discovered = self.stats.discovered.saturating_add(1);
    }

    /// Records a reported branch.
    ///
    /// # Errors
    /// Returns an unexpected-response error if more branches report than
    /// were scheduled.
    pub fn add(&mut self) -> Result<()> {
        if self.stats.added >= self.stats.discovered {
            return Err(ProfilerError::unexpected(format!(
                "{} tree reported more branches than were scheduled ({})",
                self.tree, self.stats.discovered
            )));
        }
        self.stats.added = self.stats.added.saturating_add(1);
        Ok(())
    }

    /// Records an ignored object.
    pub fn skip(&mut self) {
        self.stats.skipped = self.stats.skipped.saturating_add(1);
    }

    /// True once every scheduled branch has reported.
    pub fn is_complete(&self) -> bool {
        self.stats.added == self.stats.discovered
    }

    /// Closes the ledger.
    ///
    /// # Errors
    /// Returns an unexpected-response error if any scheduled branch never
    /// reported.
    pub fn finish(self) -> Result<TreeStats> {
        if !self.is_complete() {
            return Err(ProfilerError::unexpected(format!(
                "{} tree finished with {} of {} branches reported",
                self.tree, self.stats.added, self.stats.discovered
            )));
        }
        Ok(self.stats)
    }

    /// Current counts.
    pub fn stats(&self) -> TreeStats {
        self.stats
    }
}
