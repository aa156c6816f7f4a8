use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::model::{ExtractedChart, ExtractedTable, SchemaLabel};
use crate::pipeline::PageResult;
use crate::trace::{Diagnostic, ExtractionIssue, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Version of the serialized result layout.
pub const SCHEMA_VERSION: u32 = 1;

/// Run-level summary, built once from all page results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub schema_version: u32,
    pub pages_processed: usize,
    /// Pages whose fetch failed and that contributed nothing.
    pub pages_failed: usize,
    pub table_count: usize,
    pub chart_count: usize,
    /// Count per label, every label present. `unclassified` counts diagnostics.
    pub schema_counts: BTreeMap<SchemaLabel, usize>,
    /// Tables with at least `large_table_rows` rows or `large_table_cols` columns.
    pub large_table_count: usize,
    pub large_chart_count: usize,
    pub tables_with_temperature: usize,
    pub tables_with_stress: usize,
    pub coercion_failures: usize,
    /// Candidates labelled `unclassified`, kept out of the dataset for review.
    pub diagnostics: Vec<Diagnostic>,
    pub issues: Vec<ExtractionIssue>,
    pub warning_count: usize,
    pub error_count: usize,
}

impl ExtractionReport {
    /// Fold per-page results into the run report. This is the only place
    /// run-wide counters are accumulated.
    pub fn from_pages(pages: &[PageResult], config: &ExtractionConfig) -> Self {
        let mut schema_counts: BTreeMap<SchemaLabel, usize> =
            SchemaLabel::ALL.into_iter().map(|l| (l, 0)).collect();

        let tables: Vec<&ExtractedTable> = pages.iter().flat_map(|p| &p.tables).collect();
        let charts: Vec<&ExtractedChart> = pages.iter().flat_map(|p| &p.charts).collect();
        let diagnostics: Vec<Diagnostic> = pages
            .iter()
            .flat_map(|p| p.diagnostics.iter().cloned())
            .collect();
        let issues: Vec<ExtractionIssue> =
            pages.iter().flat_map(|p| p.issues.iter().cloned()).collect();

        for label in tables.iter().map(|t| t.schema).chain(charts.iter().map(|c| c.schema)) {
            *schema_counts.entry(label).or_default() += 1;
        }
        *schema_counts.entry(SchemaLabel::Unclassified).or_default() += diagnostics.len();

        let is_large = |rows: usize, cols: usize| {
            rows >= config.large_table_rows || cols >= config.large_table_cols
        };

        ExtractionReport {
            schema_version: SCHEMA_VERSION,
            pages_processed: pages.len(),
            pages_failed: pages.iter().filter(|p| p.failed).count(),
            table_count: tables.len(),
            chart_count: charts.len(),
            schema_counts,
            large_table_count: tables
                .iter()
                .filter(|t| is_large(t.metadata.row_count, t.metadata.col_count))
                .count(),
            large_chart_count: charts
                .iter()
                .filter(|c| is_large(c.metadata.row_count, c.metadata.col_count))
                .count(),
            tables_with_temperature: tables.iter().filter(|t| t.metadata.has_temperature_data).count(),
            tables_with_stress: tables.iter().filter(|t| t.metadata.has_stress_data).count(),
            coercion_failures: tables.iter().map(|t| t.metadata.coercion_failures).sum(),
            warning_count: issues.iter().filter(|i| i.severity == Severity::Warning).count(),
            error_count: issues.iter().filter(|i| i.severity == Severity::Error).count(),
            diagnostics,
            issues,
        }
    }

    /// A run succeeds when it has no errors; warnings alone do not fail it.
    pub fn is_successful(&self) -> bool {
        self.error_count == 0
    }
}

/// Full output of a run: the dataset plus its report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub tables: Vec<ExtractedTable>,
    pub charts: Vec<ExtractedChart>,
    pub report: ExtractionReport,
}

impl ExtractionResult {
    pub fn from_pages(pages: Vec<PageResult>, config: &ExtractionConfig) -> Self {
        let report = ExtractionReport::from_pages(&pages, config);
        let mut tables = Vec::new();
        let mut charts = Vec::new();
        for page in pages {
            tables.extend(page.tables);
            charts.extend(page.charts);
        }
        ExtractionResult {
            tables,
            charts,
            report,
        }
    }
}

/// Load a result previously written as JSON.
pub fn load_result(path: &Path) -> Result<ExtractionResult, ExtractError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
