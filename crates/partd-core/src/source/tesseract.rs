use crate::error::ExtractError;
use crate::model::{BBox, PositionedToken, TokenSource};
use crate::source::{OcrEngine, PageRaster};
use std::process::Command;

/// Tesseract TSV row level for single words.
const WORD_LEVEL: &str = "5";

/// OCR through the `tesseract` binary's TSV output.
pub struct TesseractOcr {
    lang: String,
    min_confidence: f32,
}

impl TesseractOcr {
    pub fn new(lang: impl Into<String>, min_confidence: f32) -> Self {
        TesseractOcr {
            lang: lang.into(),
            min_confidence,
        }
    }

    pub fn is_available() -> bool {
        Command::new("tesseract")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(
        &self,
        raster: &PageRaster,
        region_hint: Option<&BBox>,
    ) -> Result<Vec<PositionedToken>, ExtractError> {
        let output = Command::new("tesseract")
            .arg(&raster.path)
            .arg("stdout")
            .args(["-l", &self.lang, "tsv"])
            .output()
            .map_err(|e| ExtractError::Ocr(format!("failed to run tesseract: {e}")))?;

        if !output.status.success() {
            return Err(ExtractError::Ocr(format!(
                "tesseract exited with {}: {}",
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let tokens = parse_tsv(
            &String::from_utf8_lossy(&output.stdout),
            raster.page_index,
            raster.points_per_pixel(),
            self.min_confidence,
        );
        Ok(match region_hint {
            Some(hint) => tokens
                .into_iter()
                .filter(|t| hint.contains_point(t.bbox.center_x(), t.bbox.center_y()))
                .collect(),
            None => tokens,
        })
    }

    fn backend_name(&self) -> &str {
        "tesseract"
    }
}

/// Word rows of tesseract TSV at or above `min_confidence`, boxes scaled
/// from pixels to points. Malformed rows are skipped.
fn parse_tsv(tsv: &str, page_index: usize, scale: f32, min_confidence: f32) -> Vec<PositionedToken> {
    tsv.lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 12 || fields[0] != WORD_LEVEL {
                return None;
            }
            let text = fields[11].trim();
            let confidence: f32 = fields[10].parse().ok()?;
            if text.is_empty() || confidence < min_confidence {
                return None;
            }
            let left: f32 = fields[6].parse().ok()?;
            let top: f32 = fields[7].parse().ok()?;
            let width: f32 = fields[8].parse().ok()?;
            let height: f32 = fields[9].parse().ok()?;
            let bbox = BBox::new(
                left * scale,
                top * scale,
                (left + width) * scale,
                (top + height) * scale,
            );
            Some(PositionedToken::new(text, bbox, page_index, TokenSource::Ocr))
        })
        .collect()
}
