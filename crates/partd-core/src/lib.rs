pub mod chart;
pub mod classify;
pub mod config;
pub mod error;
pub mod layout;
pub mod metadata;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod query;
pub mod report;
pub mod source;
pub mod trace;
pub mod vocab;

pub use config::ExtractionConfig;
pub use error::ExtractError;
pub use model::{CellValue, ExtractedChart, ExtractedTable, SchemaLabel};
pub use pipeline::{Extractor, PageRange};
pub use report::{ExtractionReport, ExtractionResult};

use source::{OcrEngine, PageSource};

/// Main API entry point: extract and classify every table and chart of a
/// document.
///
/// `ocr` supplements embedded text on pages the source can render;
/// `pages` limits the run to a 1-based inclusive page range.
pub fn extract_document(
    source: &dyn PageSource,
    ocr: Option<&dyn OcrEngine>,
    config: &ExtractionConfig,
    pages: Option<PageRange>,
) -> Result<ExtractionResult, ExtractError> {
    let mut extractor = Extractor::new(source, config.clone());
    if let Some(ocr) = ocr {
        extractor = extractor.with_ocr(ocr);
    }
    if let Some(pages) = pages {
        extractor = extractor.with_pages(pages);
    }
    extractor.run()
}
