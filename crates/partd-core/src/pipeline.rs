use crate::chart::{chart_text, ChartDigitizer};
use crate::classify::{classify_chart, classify_table};
use crate::config::{validate_config, ExtractionConfig};
use crate::error::ExtractError;
use crate::layout::assemble::assemble_tokens;
use crate::layout::grid::extract_grid;
use crate::layout::region::detect_regions;
use crate::metadata::chart_metadata;
use crate::model::{ExtractedChart, ExtractedTable, PositionedToken, Region, RegionKind, SchemaLabel};
use crate::normalize::normalize_table;
use crate::report::ExtractionResult;
use crate::source::{OcrEngine, PageData, PageSource};
use crate::trace::{Diagnostic, ExtractionIssue, IssueKind};
use rayon::prelude::*;
use std::fmt;
use std::str::FromStr;

/// Everything one page contributed. Built by one worker, never mutated after.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult {
    pub page_index: usize,
    pub page_number: usize,
    pub tables: Vec<ExtractedTable>,
    pub charts: Vec<ExtractedChart>,
    pub diagnostics: Vec<Diagnostic>,
    pub issues: Vec<ExtractionIssue>,
    /// The page could not be fetched and contributed nothing.
    pub failed: bool,
}

impl PageResult {
    fn failed(page_index: usize, issue: ExtractionIssue) -> Self {
        PageResult {
            page_index,
            page_number: page_index + 1,
            tables: Vec::new(),
            charts: Vec::new(),
            diagnostics: Vec::new(),
            issues: vec![issue],
            failed: true,
        }
    }
}

/// 1-based inclusive page range, parsed from `"10-40"` or `"7"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub first: usize,
    pub last: usize,
}

impl PageRange {
    pub fn new(first: usize, last: usize) -> Result<Self, ExtractError> {
        if first == 0 || last < first {
            return Err(ExtractError::ConfigInvalid(format!(
                "invalid page range {first}-{last}: pages are 1-based and last must not precede first"
            )));
        }
        Ok(PageRange { first, last })
    }

    /// Zero-based indices covered by the range.
    pub fn indices(&self) -> std::ops::Range<usize> {
        self.first - 1..self.last
    }
}

impl FromStr for PageRange {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |p: &str| {
            p.trim()
                .parse::<usize>()
                .map_err(|_| ExtractError::ConfigInvalid(format!("invalid page range '{s}'")))
        };
        match s.split_once('-') {
            Some((first, last)) => PageRange::new(parse(first)?, parse(last)?),
            None => {
                let page = parse(s)?;
                PageRange::new(page, page)
            }
        }
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.first, self.last)
    }
}

/// Runs the extraction pipeline over a page source.
pub struct Extractor<'a> {
    source: &'a dyn PageSource,
    ocr: Option<&'a dyn OcrEngine>,
    digitizer: Option<&'a dyn ChartDigitizer>,
    config: ExtractionConfig,
    pages: Option<PageRange>,
}

impl<'a> Extractor<'a> {
    pub fn new(source: &'a dyn PageSource, config: ExtractionConfig) -> Self {
        Extractor {
            source,
            ocr: None,
            digitizer: None,
            config,
            pages: None,
        }
    }

    pub fn with_ocr(mut self, ocr: &'a dyn OcrEngine) -> Self {
        self.ocr = Some(ocr);
        self
    }

    pub fn with_digitizer(mut self, digitizer: &'a dyn ChartDigitizer) -> Self {
        self.digitizer = Some(digitizer);
        self
    }

    pub fn with_pages(mut self, pages: PageRange) -> Self {
        self.pages = Some(pages);
        self
    }

    /// Extract every selected page and build the report.
    ///
    /// Only an invalid config, an unreachable page source or a worker pool
    /// that cannot start abort the run. Per-page failures are recorded in
    /// the report.
    pub fn run(&self) -> Result<ExtractionResult, ExtractError> {
        validate_config(&self.config)?;
        let page_count = self.source.page_count()?;
        let indices = match self.pages {
            Some(range) => range.indices(),
            None => 0..page_count,
        };
        tracing::info!(
            backend = self.source.backend_name(),
            page_count,
            first = indices.start + 1,
            last = indices.end,
            ocr = self.ocr.map(|o| o.backend_name()),
            "starting extraction"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers.unwrap_or(0))
            .build()
            .map_err(|e| ExtractError::WorkerPool(e.to_string()))?;
        let pages: Vec<PageResult> =
            pool.install(|| indices.into_par_iter().map(|i| self.process_page(i)).collect());

        let result = ExtractionResult::from_pages(pages, &self.config);
        tracing::info!(
            tables = result.report.table_count,
            charts = result.report.chart_count,
            unclassified = result.report.diagnostics.len(),
            warnings = result.report.warning_count,
            errors = result.report.error_count,
            "extraction finished"
        );
        Ok(result)
    }

    fn process_page(&self, index: usize) -> PageResult {
        let page = match self.source.get_page(index) {
            Ok(page) => page,
            Err(e) => {
                let issue = ExtractionIssue::new(IssueKind::PageUnavailable, index + 1, e.to_string());
                return PageResult::failed(index, issue);
            }
        };

        let mut ocr_issues = Vec::new();
        let ocr_tokens = match (self.ocr, page.raster.as_ref()) {
            (Some(ocr), Some(raster)) => ocr.recognize(raster, None).unwrap_or_else(|e| {
                ocr_issues.push(ExtractionIssue::new(
                    IssueKind::OcrUnavailable,
                    page.page_number,
                    format!("continuing with embedded text only: {e}"),
                ));
                Vec::new()
            }),
            _ => Vec::new(),
        };

        let mut result = extract_page(&page, &ocr_tokens, self.digitizer, &self.config);
        ocr_issues.append(&mut result.issues);
        result.issues = ocr_issues;
        result
    }
}

/// Run the per-page stages on one page's tokens.
///
/// Reads nothing but its arguments, so pages can be processed in any order
/// and on any thread.
pub fn extract_page(
    page: &PageData,
    ocr_tokens: &[PositionedToken],
    digitizer: Option<&dyn ChartDigitizer>,
    config: &ExtractionConfig,
) -> PageResult {
    let n = page.page_number;
    let tokens = assemble_tokens(&page.embedded_tokens, ocr_tokens, config.ocr_overlap_threshold);
    let (regions, mut issues) = detect_regions(page.page_index, &tokens, config);
    tracing::debug!(page = n, tokens = tokens.len(), regions = regions.len(), "page layout");

    let mut tables = Vec::new();
    let mut charts = Vec::new();
    let mut diagnostics = Vec::new();

    for region in &regions {
        match region.kind {
            RegionKind::Table => {
                let grid = extract_grid(&tokens, &region.token_ids, config);
                let class = classify_table(&grid);
                if class.label == SchemaLabel::Unclassified {
                    let preview = grid.header().iter().flatten().cloned().collect();
                    diagnostics.push(unclassified(n, region, class.rule, preview, &mut issues));
                    continue;
                }

                let id = format!("Page_{}_Table_{}", n, tables.len() + 1);
                let table = normalize_table(id, n, &grid, class.label);
                for cell in &table.flagged_cells {
                    issues.push(ExtractionIssue::new(
                        IssueKind::CoercionFailure,
                        n,
                        format!(
                            "{}: '{}' in column {} of row {} is not a number",
                            table.id, cell.raw, cell.column, cell.row + 1
                        ),
                    ));
                }
                if class.is_fallback() {
                    issues.push(ExtractionIssue::new(
                        IssueKind::ClassificationFallback,
                        n,
                        format!("{}: no specific rule matched, labelled {}", table.id, table.schema),
                    ));
                }
                tables.push(table);
            }
            RegionKind::Chart => {
                let text = chart_text(&tokens, region, config.row_tolerance, config.chart_description_lines);
                let class = classify_chart(&text.title, &text.description);
                if class.label == SchemaLabel::Unclassified {
                    diagnostics.push(unclassified(n, region, class.rule, Vec::new(), &mut issues));
                    continue;
                }

                let id = format!("Page_{}_Chart_{}", n, charts.len() + 1);
                let series = match digitizer {
                    Some(d) => d
                        .digitize(region, &tokens, page.raster.as_ref())
                        .unwrap_or_else(|e| {
                            tracing::warn!(%id, digitizer = d.name(), "digitization failed: {e}");
                            Vec::new()
                        }),
                    None => Vec::new(),
                };
                if class.is_fallback() {
                    issues.push(ExtractionIssue::new(
                        IssueKind::ClassificationFallback,
                        n,
                        format!("{id}: no specific rule matched, labelled {}", class.label),
                    ));
                }

                let mut chart = ExtractedChart {
                    id,
                    page: n,
                    schema: class.label,
                    title: text.title,
                    description: text.description,
                    series,
                    metadata: Default::default(),
                };
                chart.metadata = chart_metadata(&chart);
                charts.push(chart);
            }
        }
    }

    PageResult {
        page_index: page.page_index,
        page_number: n,
        tables,
        charts,
        diagnostics,
        issues,
        failed: false,
    }
}

fn unclassified(
    page: usize,
    region: &Region,
    reason: &str,
    preview: Vec<String>,
    issues: &mut Vec<ExtractionIssue>,
) -> Diagnostic {
    issues.push(ExtractionIssue::new(
        IssueKind::ClassificationFallback,
        page,
        format!("{} candidate left unclassified: {reason}", region.kind),
    ));
    Diagnostic {
        page,
        kind: region.kind,
        bbox: region.bbox,
        reason: reason.to_string(),
        preview,
    }
}
