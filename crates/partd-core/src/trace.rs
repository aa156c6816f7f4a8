use crate::model::{BBox, RegionKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    PageUnavailable,
    OcrUnavailable,
    RegionAmbiguous,
    CoercionFailure,
    ClassificationFallback,
}

impl IssueKind {
    pub fn severity(&self) -> Severity {
        match self {
            IssueKind::PageUnavailable => Severity::Error,
            IssueKind::OcrUnavailable
            | IssueKind::RegionAmbiguous
            | IssueKind::CoercionFailure => Severity::Warning,
            IssueKind::ClassificationFallback => Severity::Info,
        }
    }
}

/// A non-fatal condition met during extraction. Recorded, never raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionIssue {
    pub kind: IssueKind,
    pub severity: Severity,
    /// 1-based page number.
    pub page: usize,
    pub message: String,
}

impl ExtractionIssue {
    /// Build an issue and emit the matching log event.
    pub fn new(kind: IssueKind, page: usize, message: impl Into<String>) -> Self {
        let message = message.into();
        let severity = kind.severity();
        match severity {
            Severity::Error => tracing::error!(page, ?kind, "{message}"),
            Severity::Warning => tracing::warn!(page, ?kind, "{message}"),
            Severity::Info => tracing::debug!(page, ?kind, "{message}"),
        }
        ExtractionIssue {
            kind,
            severity,
            page,
            message,
        }
    }
}

/// A candidate that was labelled `unclassified` and kept out of the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub page: usize,
    pub kind: RegionKind,
    pub bbox: BBox,
    pub reason: String,
    /// Header cells for tables, title for charts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preview: Vec<String>,
}
