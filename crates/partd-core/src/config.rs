use crate::error::ExtractError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunable thresholds of the extraction engine. Distances are in PDF points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Area overlap (of the smaller box) above which an OCR token duplicating
    /// an embedded token is dropped.
    pub ocr_overlap_threshold: f32,
    /// Minimum empty vertical space that separates two blocks of lines.
    pub min_vertical_gap: f32,
    /// Tokens whose vertical centers lie within this band share a row.
    pub row_tolerance: f32,
    /// Horizontal gap below which adjacent tokens join into one cell.
    pub word_gap: f32,
    /// Overlap fraction above which two regions are merged into one.
    pub region_merge_threshold: f32,
    /// Regions with fewer tokens are discarded as noise.
    pub min_region_tokens: usize,
    /// Rows filling less than this fraction of the header width are still
    /// kept, but reported as sparse.
    pub min_row_fill: f32,
    /// Ink density (token area / region area) at which a region with mixed
    /// anchors is treated as a table.
    pub table_min_density: f32,
    pub large_table_rows: usize,
    pub large_table_cols: usize,
    /// Lines of text (title included) used as a chart description.
    pub chart_description_lines: usize,
    pub ocr_min_confidence: f32,
    /// Worker threads for page processing. `None` uses rayon's default.
    pub workers: Option<usize>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        ExtractionConfig {
            ocr_overlap_threshold: 0.70,
            min_vertical_gap: 14.0,
            row_tolerance: 3.0,
            word_gap: 4.5,
            region_merge_threshold: 0.50,
            min_region_tokens: 2,
            min_row_fill: 0.50,
            table_min_density: 0.04,
            large_table_rows: 10,
            large_table_cols: 15,
            chart_description_lines: 3,
            ocr_min_confidence: 30.0,
            workers: None,
        }
    }
}

/// Load a config from a JSON file.
pub fn load_config(path: &Path) -> Result<ExtractionConfig, ExtractError> {
    let content = std::fs::read_to_string(path).map_err(|e| ExtractError::ConfigLoad {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let config: ExtractionConfig =
        serde_json::from_str(&content).map_err(|e| ExtractError::ConfigLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    validate_config(&config)?;
    Ok(config)
}

/// Parse a config from a JSON string (no file path context).
pub fn parse_config_str(json: &str) -> Result<ExtractionConfig, ExtractError> {
    let config: ExtractionConfig = serde_json::from_str(json)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &ExtractionConfig) -> Result<(), ExtractError> {
    let fractions = [
        ("ocr_overlap_threshold", config.ocr_overlap_threshold),
        ("region_merge_threshold", config.region_merge_threshold),
        ("min_row_fill", config.min_row_fill),
        ("table_min_density", config.table_min_density),
    ];
    for (name, value) in fractions {
        if !(value > 0.0 && value <= 1.0) {
            return Err(ExtractError::ConfigInvalid(format!(
                "{name} must be in (0, 1], got {value}"
            )));
        }
    }

    let distances = [
        ("min_vertical_gap", config.min_vertical_gap),
        ("row_tolerance", config.row_tolerance),
        ("word_gap", config.word_gap),
    ];
    for (name, value) in distances {
        if !(value.is_finite() && value > 0.0) {
            return Err(ExtractError::ConfigInvalid(format!(
                "{name} must be a positive distance, got {value}"
            )));
        }
    }

    if !(0.0..=100.0).contains(&config.ocr_min_confidence) {
        return Err(ExtractError::ConfigInvalid(format!(
            "ocr_min_confidence must be in [0, 100], got {}",
            config.ocr_min_confidence
        )));
    }

    if config.min_region_tokens == 0 {
        return Err(ExtractError::ConfigInvalid(
            "min_region_tokens must be at least 1".into(),
        ));
    }

    if config.chart_description_lines == 0 {
        return Err(ExtractError::ConfigInvalid(
            "chart_description_lines must be at least 1".into(),
        ));
    }

    if config.workers == Some(0) {
        return Err(ExtractError::ConfigInvalid(
            "workers must be at least 1 when set".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(validate_config(&ExtractionConfig::default()).is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config = parse_config_str(r#"{ "row_tolerance": 2.0, "workers": 4 }"#).unwrap();
        assert_eq!(config.row_tolerance, 2.0);
        assert_eq!(config.workers, Some(4));
        assert_eq!(config.ocr_overlap_threshold, 0.70);
        assert_eq!(config.large_table_rows, 10);
    }

    #[test]
    fn test_out_of_range_fraction_rejected() {
        assert!(parse_config_str(r#"{ "ocr_overlap_threshold": 1.5 }"#).is_err());
        assert!(parse_config_str(r#"{ "region_merge_threshold": 0.0 }"#).is_err());
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(parse_config_str(r#"{ "workers": 0 }"#).is_err());
    }

    #[test]
    fn test_negative_gap_rejected() {
        assert!(parse_config_str(r#"{ "min_vertical_gap": -1.0 }"#).is_err());
    }
}
