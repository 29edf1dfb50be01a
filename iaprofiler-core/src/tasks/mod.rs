//! Task runner and status poller.
//!
//! Submits column analysis, publish and data-rule tasks for a project and
//! reads back execution records. Polling is caller driven: either call
//! [`CatalogClient::get_status`] in a loop, or let
//! [`CatalogClient::poll_until_terminal`] do it on a fixed interval.

mod target;

pub use target::{ALL_COLUMNS, AnalysisTarget, FileTarget, TableTarget};

use crate::{
    Result,
    client::CatalogClient,
    error::ProfilerError,
    project::{
        ColumnAnalysisOptions, ProjectDocument, ia_path, parse_column_analysis_dates,
        parse_executable_rules, parse_schedule_ids, parse_task_executions,
    },
    transport::with_query,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

/// Status snapshot of a scheduled task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionRecord {
    pub execution_id: String,
    /// Timestamp as reported by the catalog
    pub execution_time: Option<String>,
    /// Percent complete
    pub progress: u32,
    /// Status exactly as reported, e.g. `running`
    pub status: String,
}

impl ExecutionRecord {
    /// Classified status.
    pub fn state(&self) -> ExecutionStatus {
        ExecutionStatus::classify(&self.status)
    }

    /// Returns true once the execution will not change any more.
    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }
}

/// Classification of the catalog's status strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Running,
    Successful,
    Failed,
    Cancelled,
    /// Any status the classification does not know
    Other,
}

impl ExecutionStatus {
    /// Classifies a raw status string, ignoring case.
    pub fn classify(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "running" | "scheduled" | "queued" | "submitted" => Self::Running,
            "successful" | "succeeded" | "completed" => Self::Successful,
            "failed" | "error" => Self::Failed,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Other,
        }
    }

    /// `successful`, `failed` and `cancelled` are terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Successful | Self::Failed | Self::Cancelled)
    }
}

impl CatalogClient {
    async fn execute_tasks(&self, document: &ProjectDocument) -> Result<Vec<String>> {
        let response = self
            .post_xml(&ia_path("executeTasks"), document.to_xml()?)
            .await?;
        let schedule_ids = parse_schedule_ids(&response.body)?;
        if schedule_ids.is_empty() {
            return Err(ProfilerError::unexpected(format!(
                "executeTasks for project '{}' returned no scheduleId",
                document.name()
            )));
        }
        Ok(schedule_ids)
    }

    /// Submits column analysis and returns the schedule ids.
    ///
    /// # Errors
    /// Returns a configuration error for an empty target list, transport or
    /// status errors, or an unexpected-response error if no schedule id came
    /// back.
    pub async fn submit_column_analysis(
        &self,
        project: &str,
        targets: &[AnalysisTarget],
        options: ColumnAnalysisOptions,
    ) -> Result<Vec<String>> {
        if targets.is_empty() {
            return Err(ProfilerError::configuration("no column analysis targets given"));
        }
        let mut document = ProjectDocument::new(project);
        document.add_column_analysis(options, targets);

        let schedule_ids = self.execute_tasks(&document).await?;
        info!(
            "Column analysis of {} targets in '{}' scheduled as {:?}",
            targets.len(),
            project,
            schedule_ids
        );
        Ok(schedule_ids)
    }

    /// Reads the execution record of a scheduled task.
    ///
    /// # Errors
    /// Returns `NotFound` when the response has no `TaskExecution`,
    /// `Ambiguous` when it has more than one, and transport, status or XML
    /// errors otherwise.
    pub async fn get_status(&self, schedule_id: &str) -> Result<ExecutionRecord> {
        let path = with_query(&ia_path("analysisStatus"), &[("scheduleID", schedule_id)]);
        let body = self.get(&path).await?;
        let mut records = parse_task_executions(&body)?;
        match records.len() {
            0 => Err(ProfilerError::not_found("task execution", schedule_id)),
            1 => records
                .pop()
                .ok_or_else(|| ProfilerError::not_found("task execution", schedule_id)),
            count => Err(ProfilerError::ambiguous("task execution", schedule_id, count)),
        }
    }

    /// Publishes analysis results for the targets' tables and returns the
    /// HTTP status.
    ///
    /// # Errors
    /// Returns a configuration error for an empty target list, or transport
    /// or status errors.
    pub async fn publish_results(&self, project: &str, targets: &[AnalysisTarget]) -> Result<u16> {
        if targets.is_empty() {
            return Err(ProfilerError::configuration("no publish targets given"));
        }
        let mut document = ProjectDocument::new(project);
        document.add_publish_results(targets);

        let response = self
            .post_xml(&ia_path("publishResults"), document.to_xml()?)
            .await?;
        info!(
            "Published results of {} targets in '{}' (HTTP {})",
            targets.len(),
            project,
            response.status
        );
        Ok(response.status)
    }

    /// Polls [`get_status`](Self::get_status) every `interval` until the
    /// execution is terminal.
    ///
    /// # Errors
    /// Propagates errors from `get_status`. With `max_polls` set, returns an
    /// unexpected-response error once that many polls saw no terminal state.
    pub async fn poll_until_terminal(
        &self,
        schedule_id: &str,
        interval: Duration,
        max_polls: Option<u32>,
    ) -> Result<ExecutionRecord> {
        let mut polls: u32 = 0;
        loop {
            let record = self.get_status(schedule_id).await?;
            polls = polls.saturating_add(1);
            info!(
                "{}: {} ({}%)",
                schedule_id, record.status, record.progress
            );
            if record.is_terminal() {
                return Ok(record);
            }
            if max_polls.is_some_and(|max| polls >= max) {
                return Err(ProfilerError::unexpected(format!(
                    "{schedule_id} still '{}' after {polls} polls",
                    record.status
                )));
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// Names of the data rules that can run in a project.
    ///
    /// # Errors
    /// Returns transport, status or XML errors.
    pub async fn executable_rules(&self, project: &str) -> Result<Vec<String>> {
        let path = with_query(&ia_path("executableRules"), &[("projectName", project)]);
        parse_executable_rules(&self.get(&path).await?)
    }

    /// Runs data rules and returns the schedule ids.
    ///
    /// # Errors
    /// Returns a configuration error for an empty rule list, transport or
    /// status errors, or an unexpected-response error if no schedule id came
    /// back.
    pub async fn run_data_rules(&self, project: &str, rules: &[String]) -> Result<Vec<String>> {
        if rules.is_empty() {
            return Err(ProfilerError::configuration("no data rules given"));
        }
        let mut document = ProjectDocument::new(project);
        document.add_data_rules(rules.iter().cloned());

        let schedule_ids = self.execute_tasks(&document).await?;
        info!(
            "{} data rules in '{}' scheduled as {:?}",
            rules.len(),
            project,
            schedule_ids
        );
        Ok(schedule_ids)
    }

    /// Every table and file of a project as a whole-table target.
    ///
    /// # Errors
    /// Returns transport, status or XML errors.
    pub async fn project_targets(&self, project: &str) -> Result<Vec<AnalysisTarget>> {
        let definition = self.get_project(project).await?;
        Ok(targets_of(&definition))
    }

    /// Targets of a project whose column analysis is missing or older than
    /// `cutoff`.
    ///
    /// A table is stale if any of its columns was never analyzed or if its
    /// oldest analysis predates the cutoff.
    ///
    /// # Errors
    /// Returns transport, status or XML errors.
    pub async fn stale_targets(
        &self,
        project: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<AnalysisTarget>> {
        let mut stale = Vec::new();
        for target in self.project_targets(project).await? {
            let column = target.column_reference();
            let path = with_query(
                &ia_path("columnAnalysis/results"),
                &[("projectName", project), ("columnName", column.as_str())],
            );
            let dates = parse_column_analysis_dates(&self.get(&path).await?)?;
            if is_stale(&dates, cutoff) {
                debug!("{} is stale", target);
                stale.push(target);
            }
        }
        info!("{} stale targets in '{}'", stale.len(), project);
        Ok(stale)
    }
}

fn targets_of(definition: &ProjectDocument) -> Vec<AnalysisTarget> {
    let tables = definition.tables().map(|(database, schema, table)| {
        AnalysisTarget::Table(TableTarget::all_columns(database, &schema.name, &table.name))
    });
    let files = definition.files().map(|(host, folder, file)| {
        AnalysisTarget::File(FileTarget::all_columns(host, &folder.name, &file.name))
    });
    tables.chain(files).collect()
}

fn is_stale(dates: &[(String, Option<DateTime<Utc>>)], cutoff: DateTime<Utc>) -> bool {
    if dates.is_empty() {
        return true;
    }
    dates
        .iter()
        .any(|(_, last_run)| last_run.is_none_or(|last_run| last_run < cutoff))
}
