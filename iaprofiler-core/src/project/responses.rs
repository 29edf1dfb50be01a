//! Readers for the XML responses of the project and task endpoints.

use super::xml::XmlElement;
use crate::{Result, error::ProfilerError, tasks::ExecutionRecord};
use chrono::{DateTime, NaiveDateTime, Utc};

/// Project names from `GET /ibm/iis/ia/api/projects`.
///
/// # Errors
/// Returns an XML error for malformed input.
pub fn parse_project_names(xml: &str) -> Result<Vec<String>> {
    let root = XmlElement::parse(xml)?;
    Ok(root
        .descendants_named("Project")
        .into_iter()
        .filter_map(|project| project.attr("name"))
        .map(ToString::to_string)
        .collect())
}

/// `scheduleId` values of every `ScheduledTask` in an `executeTasks`
/// response.
///
/// # Errors
/// Returns an XML error for malformed input.
pub fn parse_schedule_ids(xml: &str) -> Result<Vec<String>> {
    let root = XmlElement::parse(xml)?;
    Ok(root
        .descendants_named("ScheduledTask")
        .into_iter()
        .filter_map(|task| task.attr("scheduleId"))
        .map(ToString::to_string)
        .collect())
}

/// Every `TaskExecution` in an `analysisStatus` response.
///
/// The `status` attribute is kept verbatim.
///
/// # Errors
/// Returns an XML error for malformed input, or an unexpected-response
/// error when an execution has no id or a non-numeric progress.
pub fn parse_task_executions(xml: &str) -> Result<Vec<ExecutionRecord>> {
    let root = XmlElement::parse(xml)?;
    root.descendants_named("TaskExecution")
        .into_iter()
        .map(|execution| {
            let execution_id = execution
                .attr("executionId")
                .ok_or_else(|| ProfilerError::unexpected("TaskExecution has no executionId"))?
                .to_string();
            let progress = match execution.attr("progress") {
                Some(value) => value.trim().parse::<u32>().map_err(|_| {
                    ProfilerError::unexpected(format!(
                        "TaskExecution {execution_id} has non-numeric progress '{value}'"
                    ))
                })?,
                None => 0,
            };
            Ok(ExecutionRecord {
                execution_id,
                execution_time: execution.attr("executionTime").map(ToString::to_string),
                progress,
                status: execution.attr("status").unwrap_or_default().to_string(),
            })
        })
        .collect()
}

/// Names of every `ExecutableRule` in an `executableRules` response.
///
/// # Errors
/// Returns an XML error for malformed input.
pub fn parse_executable_rules(xml: &str) -> Result<Vec<String>> {
    let root = XmlElement::parse(xml)?;
    Ok(root
        .descendants_named("ExecutableRule")
        .into_iter()
        .filter_map(|rule| rule.attr("name"))
        .map(ToString::to_string)
        .collect())
}

/// Last column analysis run per column in a `columnAnalysis/results`
/// response.
///
/// Each entry is the column's `name` with the `lastRunDate` of its
/// `RunInfo`, or `None` when the column was never analyzed.
///
/// # Errors
/// Returns an XML error for malformed input.
pub fn parse_column_analysis_dates(xml: &str) -> Result<Vec<(String, Option<DateTime<Utc>>)>> {
    let root = XmlElement::parse(xml)?;
    Ok(root
        .descendants_named("Column")
        .into_iter()
        .filter_map(|column| {
            let name = column.attr("name")?.to_string();
            let last_run = column
                .descendants_named("RunInfo")
                .into_iter()
                .filter_map(|info| info.attr("lastRunDate"))
                .find_map(parse_catalog_timestamp);
            Some((name, last_run))
        })
        .collect())
}

/// Parses the timestamp forms the catalog emits: RFC 3339 with an offset,
/// or a bare local timestamp read as UTC.
pub fn parse_catalog_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}
