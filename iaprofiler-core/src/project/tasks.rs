//! Task definitions carried inside a project document.

use crate::{Result, error::ProfilerError};
use serde::{Deserialize, Serialize};

/// How functional-dependency results are captured during column analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CaptureFdResults {
    #[serde(rename = "CAPTURE_NONE")]
    None,
    #[default]
    #[serde(rename = "CAPTURE_ALL")]
    All,
    #[serde(rename = "CAPTURE_N")]
    N,
}

impl CaptureFdResults {
    /// Attribute value in the project XML.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "CAPTURE_NONE",
            Self::All => "CAPTURE_ALL",
            Self::N => "CAPTURE_N",
        }
    }
}

impl std::str::FromStr for CaptureFdResults {
    type Err = ProfilerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "CAPTURE_NONE" => Ok(Self::None),
            "CAPTURE_ALL" => Ok(Self::All),
            "CAPTURE_N" => Ok(Self::N),
            other => Err(ProfilerError::unexpected(format!(
                "unknown captureFDResultsType '{other}'"
            ))),
        }
    }
}

/// Attributes of a `RunColumnAnalysis` task.
///
/// There is no `Default`: whether data classes are analyzed must be chosen
/// by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnAnalysisOptions {
    pub analyze_column_properties: bool,
    pub capture_fd_results: CaptureFdResults,
    pub min_fd_capture_size: u32,
    pub max_fd_capture_size: u32,
    pub analyze_data_classes: bool,
}

impl ColumnAnalysisOptions {
    /// Options with the catalog's usual defaults and an explicit data-class
    /// choice.
    pub fn new(analyze_data_classes: bool) -> Self {
        Self {
            analyze_column_properties: true,
            capture_fd_results: CaptureFdResults::All,
            min_fd_capture_size: 5000,
            max_fd_capture_size: 10_000,
            analyze_data_classes,
        }
    }

    /// Sets `analyzeColumnProperties`.
    pub fn with_column_properties(mut self, analyze: bool) -> Self {
        self.analyze_column_properties = analyze;
        self
    }

    /// Sets `captureFDResultsType`.
    pub fn with_capture_fd_results(mut self, capture: CaptureFdResults) -> Self {
        self.capture_fd_results = capture;
        self
    }

    /// Sets `minFDCaptureSize` and `maxFDCaptureSize`.
    pub fn with_fd_capture_sizes(mut self, min: u32, max: u32) -> Self {
        self.min_fd_capture_size = min;
        self.max_fd_capture_size = max;
        self
    }
}

/// `RunColumnAnalysis` with its `Column` references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnAnalysisTask {
    pub options: ColumnAnalysisOptions,
    pub columns: Vec<String>,
}

/// `PublishResults` with its `Table` references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResultsTask {
    pub tables: Vec<String>,
}

/// `RunRules` with its `ExecutableRule` names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRulesTask {
    pub rules: Vec<String>,
}

/// One element under `Tasks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectTask {
    ColumnAnalysis(ColumnAnalysisTask),
    PublishResults(PublishResultsTask),
    RunRules(DataRulesTask),
}

impl ProjectTask {
    /// Element name in the project XML.
    pub fn element_name(&self) -> &'static str {
        match self {
            Self::ColumnAnalysis(_) => "RunColumnAnalysis",
            Self::PublishResults(_) => "PublishResults",
            Self::RunRules(_) => "RunRules",
        }
    }
}
