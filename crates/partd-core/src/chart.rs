use crate::error::ExtractError;
use crate::layout::group_lines;
use crate::model::{ChartSeries, PositionedToken, Region};
use crate::source::PageRaster;
use regex::Regex;
use std::sync::LazyLock;

static CHART_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bchart\s+[a-z]+-\d+|\bfig(?:ure|\.)?\s*[a-z]?-?\d+|\bE-\d+\.\d+-\d+|average\s+isochronous\s+stress.*curves",
    )
    .expect("chart title pattern is a compile-time constant")
});

/// Title and free-text description of a chart region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartText {
    pub title: String,
    pub description: String,
}

/// Read a chart's title and description from its region.
///
/// The title is the first line that looks like a figure caption, or the
/// first line when none does. The description is the title line followed by
/// the next lines, `description_lines` in total.
pub fn chart_text(
    tokens: &[PositionedToken],
    region: &Region,
    row_tolerance: f32,
    description_lines: usize,
) -> ChartText {
    let lines: Vec<String> = group_lines(tokens, &region.token_ids, row_tolerance)
        .iter()
        .map(|l| l.text(tokens))
        .collect();

    let title_at = lines
        .iter()
        .position(|l| CHART_TITLE.is_match(l))
        .unwrap_or(0);
    let title = lines.get(title_at).cloned().unwrap_or_default();
    let description = lines
        .iter()
        .skip(title_at)
        .take(description_lines)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");

    ChartText { title, description }
}

/// Extension point for turning a chart's pixels into numeric series.
///
/// The default run has no digitizer and leaves every chart's series empty.
pub trait ChartDigitizer: Send + Sync {
    fn digitize(
        &self,
        region: &Region,
        tokens: &[PositionedToken],
        raster: Option<&PageRaster>,
    ) -> Result<Vec<ChartSeries>, ExtractError>;

    /// Name of this digitizer (for diagnostics).
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::testing::word;
    use crate::model::{BBox, RegionKind};
    use std::collections::BTreeSet;

    fn region_over(tokens: &[PositionedToken]) -> Region {
        Region {
            page_index: 0,
            bbox: BBox::new(0.0, 0.0, 600.0, 800.0),
            kind: RegionKind::Chart,
            anchor_keywords: BTreeSet::new(),
            token_ids: (0..tokens.len()).collect(),
        }
    }

    #[test]
    fn test_title_is_caption_line() {
        let tokens = vec![
            word("0.5", 40.0, 90.0, 15.0),
            word("Fig.", 40.0, 100.0, 20.0),
            word("E-100.5-1", 64.0, 100.0, 40.0),
            word("Average", 40.0, 112.0, 40.0),
            word("Isochronous", 84.0, 112.0, 60.0),
            word("Curves", 148.0, 112.0, 35.0),
            word("Type", 40.0, 124.0, 20.0),
            word("304", 64.0, 124.0, 20.0),
            word("ignored", 40.0, 136.0, 40.0),
        ];
        let text = chart_text(&tokens, &region_over(&tokens), 3.0, 3);
        assert_eq!(text.title, "Fig. E-100.5-1");
        assert_eq!(text.description, "Fig. E-100.5-1 Average Isochronous Curves Type 304");
    }

    #[test]
    fn test_falls_back_to_first_line() {
        let tokens = vec![word("Strain,", 40.0, 100.0, 30.0), word("%", 74.0, 100.0, 8.0)];
        let text = chart_text(&tokens, &region_over(&tokens), 3.0, 3);
        assert_eq!(text.title, "Strain, %");
        assert_eq!(text.description, "Strain, %");
    }

    #[test]
    fn test_empty_region() {
        let text = chart_text(&[], &region_over(&[]), 3.0, 3);
        assert_eq!(text, ChartText { title: String::new(), description: String::new() });
    }
}
