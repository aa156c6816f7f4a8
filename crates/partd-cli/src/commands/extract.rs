use partd_core::config::load_config;
use partd_core::source::pdftotext::PdftotextSource;
use partd_core::source::tesseract::TesseractOcr;
use partd_core::source::OcrEngine;
use partd_core::{extract_document, ExtractError, ExtractionConfig, PageRange};
use std::path::PathBuf;

use crate::output;
use crate::Format;

pub struct ExtractArgs {
    pub pdf: PathBuf,
    pub pages: Option<PageRange>,
    pub config: Option<PathBuf>,
    pub ocr: Option<String>,
    pub dpi: u32,
    pub workers: Option<usize>,
    pub format: Format,
    pub out: Option<PathBuf>,
}

pub fn run(args: ExtractArgs) -> Result<(), ExtractError> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ExtractionConfig::default(),
    };
    if args.workers.is_some() {
        config.workers = args.workers;
    }

    let mut source = PdftotextSource::open(&args.pdf)?;
    let ocr = match args.ocr {
        Some(lang) if TesseractOcr::is_available() => {
            source = source.with_rasters(args.dpi);
            Some(TesseractOcr::new(lang, config.ocr_min_confidence))
        }
        Some(_) => {
            tracing::warn!("tesseract not found on PATH, extracting embedded text only");
            None
        }
        None => None,
    };

    let result = extract_document(
        &source,
        ocr.as_ref().map(|o| o as &dyn OcrEngine),
        &config,
        args.pages,
    )?;

    match args.format {
        Format::Json => output::json::print(&result)?,
        Format::Table => output::table::print_result(&result),
    }

    if let Some(path) = &args.out {
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(path, json)?;
        eprintln!(
            "Extracted {} table(s) and {} chart(s), written to {}",
            result.tables.len(),
            result.charts.len(),
            path.display()
        );
    }

    if !result.report.is_successful() {
        return Err(ExtractError::Extraction(format!(
            "{} page(s) could not be read",
            result.report.pages_failed
        )));
    }
    Ok(())
}
