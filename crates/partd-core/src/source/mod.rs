pub mod pdftotext;
pub mod tesseract;

use crate::error::ExtractError;
use crate::model::{BBox, PositionedToken};
use std::path::PathBuf;
use std::sync::Arc;

/// A rendered page image, kept alive for as long as any clone of it exists.
#[derive(Debug, Clone)]
pub struct PageRaster {
    pub path: PathBuf,
    pub dpi: u32,
    pub page_index: usize,
    _dir: Option<Arc<tempfile::TempDir>>,
}

impl PageRaster {
    /// A raster image owned by the caller.
    pub fn new(path: impl Into<PathBuf>, dpi: u32, page_index: usize) -> Self {
        PageRaster {
            path: path.into(),
            dpi,
            page_index,
            _dir: None,
        }
    }

    /// A raster living in a temporary directory that is removed with the last clone.
    pub(crate) fn in_temp_dir(dir: tempfile::TempDir, file_name: &str, dpi: u32, page_index: usize) -> Self {
        PageRaster {
            path: dir.path().join(file_name),
            dpi,
            page_index,
            _dir: Some(Arc::new(dir)),
        }
    }

    /// Points per pixel at this raster's resolution.
    pub fn points_per_pixel(&self) -> f32 {
        72.0 / self.dpi.max(1) as f32
    }
}

/// Everything the engine reads from one page.
#[derive(Debug, Clone)]
pub struct PageData {
    pub page_index: usize,
    /// 1-based page number as printed in ids and reports.
    pub page_number: usize,
    pub embedded_tokens: Vec<PositionedToken>,
    /// Present when the source can render pages for OCR.
    pub raster: Option<PageRaster>,
}

/// Supplies positioned text per page.
pub trait PageSource: Send + Sync {
    fn page_count(&self) -> Result<usize, ExtractError>;

    /// Fails with [`ExtractError::PageUnavailable`] for an out-of-range index.
    fn get_page(&self, index: usize) -> Result<PageData, ExtractError>;

    /// Name of this backend (for diagnostics).
    fn backend_name(&self) -> &str;
}

/// Recognizes words on a page raster. An empty result is a valid answer.
pub trait OcrEngine: Send + Sync {
    /// Tokens in PDF points, restricted to `region_hint` when one is given.
    fn recognize(
        &self,
        raster: &PageRaster,
        region_hint: Option<&BBox>,
    ) -> Result<Vec<PositionedToken>, ExtractError>;

    fn backend_name(&self) -> &str;
}
