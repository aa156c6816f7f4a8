use crate::config::ExtractionConfig;
use crate::layout::{group_lines, Line};
use crate::model::{BBox, PositionedToken, Region, RegionKind};
use crate::trace::{ExtractionIssue, IssueKind};
use crate::vocab;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

/// Chart vocabulary, matched against the raw line so that figure ids such as
/// `E-1.1-3` survive.
static CHART_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:charts?|figure|fig|curves?|isochronous)\b|\bE-\d+\.\d+-\d+")
        .expect("chart anchor pattern is a compile-time constant")
});

/// Table vocabulary, matched against the folded line.
static TABLE_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\btable\b|allowable stress|design stress|\bstress\b|\bspec\.? no\b|\bksi\b|\bmpa\b|\bpsi\b|°\s*f\b|tensile|yield|modulus|coefficient",
    )
    .expect("table anchor pattern is a compile-time constant")
});

const MIN_TICKS: usize = 5;

/// Split a page's tokens into disjoint table and chart regions.
///
/// Tokens must be in reading order (see [`assemble_tokens`]). Returns the
/// regions top to bottom together with any ambiguity warnings raised while
/// merging them.
///
/// [`assemble_tokens`]: crate::layout::assemble::assemble_tokens
pub fn detect_regions(
    page_index: usize,
    tokens: &[PositionedToken],
    config: &ExtractionConfig,
) -> (Vec<Region>, Vec<ExtractionIssue>) {
    let mut issues = Vec::new();
    let all_ids: Vec<usize> = (0..tokens.len()).collect();
    let lines = group_lines(tokens, &all_ids, config.row_tolerance);

    let Some(margins) = BBox::enclosing(tokens.iter().map(|t| &t.bbox)) else {
        return (Vec::new(), issues);
    };

    // One candidate per distinct vertical band; several anchors in the same
    // block of text collapse into it.
    let mut bands: BTreeMap<(usize, usize), BandAnchors> = BTreeMap::new();
    for (index, line) in lines.iter().enumerate() {
        let Some((kind, keywords)) = line_anchor(line, tokens) else {
            continue;
        };
        let band = grow_band(&lines, index, config.min_vertical_gap);
        let entry = bands.entry(band).or_default();
        match kind {
            RegionKind::Table => entry.table = true,
            RegionKind::Chart => entry.chart = true,
        }
        entry.keywords.extend(keywords);
    }

    let candidates: Vec<Region> = bands
        .into_iter()
        .map(|((top, bottom), anchors)| {
            let band = &lines[top..=bottom];
            let mut token_ids: Vec<usize> =
                band.iter().flat_map(|l| l.token_ids.iter().copied()).collect();
            token_ids.sort_unstable();
            let bbox = BBox::new(margins.x0, band[0].bbox.y0, margins.x1, band[band.len() - 1].bbox.y1);
            let kind = anchors.kind(density(tokens, &token_ids, &bbox), config.table_min_density);
            tracing::debug!(
                page = page_index + 1,
                %kind,
                lines = band.len(),
                anchors = ?anchors.keywords,
                "region candidate"
            );
            Region {
                page_index,
                bbox,
                kind,
                anchor_keywords: anchors.keywords,
                token_ids,
            }
        })
        .collect();

    let mut regions = merge_regions(candidates, tokens, config.region_merge_threshold, &mut issues);
    regions.retain(|r| r.token_ids.len() >= config.min_region_tokens);
    regions.sort_by(|a, b| {
        a.bbox
            .y0
            .total_cmp(&b.bbox.y0)
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });
    (regions, issues)
}

#[derive(Debug, Default)]
struct BandAnchors {
    table: bool,
    chart: bool,
    keywords: BTreeSet<String>,
}

impl BandAnchors {
    fn kind(&self, density: f32, table_min_density: f32) -> RegionKind {
        match (self.table, self.chart) {
            (true, true) if density >= table_min_density => RegionKind::Table,
            (_, true) => RegionKind::Chart,
            _ => RegionKind::Table,
        }
    }
}

/// Anchor kind and matched keywords of a line, if it is an anchor at all.
/// Chart vocabulary takes precedence: a chart title such as "Stress-Strain
/// Curves" is not a table anchor.
fn line_anchor(line: &Line, tokens: &[PositionedToken]) -> Option<(RegionKind, Vec<String>)> {
    let text = line.text(tokens);

    let chart: Vec<String> = CHART_ANCHOR
        .find_iter(&text)
        .map(|m| m.as_str().to_lowercase())
        .collect();
    if !chart.is_empty() {
        return Some((RegionKind::Chart, chart));
    }
    if is_tick_sequence(line, tokens) {
        return Some((RegionKind::Chart, vec!["axis ticks".to_string()]));
    }

    let folded = vocab::fold(&text);
    let mut table: Vec<String> = TABLE_ANCHOR
        .find_iter(&folded)
        .map(|m| m.as_str().to_string())
        .collect();
    if vocab::has_temperature(&text) {
        table.push("temperature".to_string());
    }
    if table.is_empty() {
        None
    } else {
        Some((RegionKind::Table, table))
    }
}

/// Axis labels: at least five numbers in a strictly monotone arithmetic
/// progression, evenly spaced across the line.
fn is_tick_sequence(line: &Line, tokens: &[PositionedToken]) -> bool {
    if line.token_ids.len() < MIN_TICKS {
        return false;
    }
    let mut values = Vec::with_capacity(line.token_ids.len());
    let mut centers = Vec::with_capacity(line.token_ids.len());
    for &id in &line.token_ids {
        let token = &tokens[id];
        match token.text.trim().replace(',', "").parse::<f64>() {
            Ok(v) => values.push(v),
            Err(_) => return false,
        }
        centers.push(f64::from(token.bbox.center_x()));
    }
    evenly_stepped(&values, 0.05) && evenly_stepped(&centers, 0.2)
}

fn evenly_stepped(values: &[f64], tolerance: f64) -> bool {
    let steps: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
    let mean = steps.iter().sum::<f64>() / steps.len() as f64;
    if mean == 0.0 || steps.iter().any(|s| s.signum() != mean.signum()) {
        return false;
    }
    steps
        .iter()
        .all(|s| (s - mean).abs() <= tolerance * mean.abs())
}

/// Extend from `start` up and down while the blank space between
/// consecutive lines stays below `min_gap`. Returns inclusive line indices.
fn grow_band(lines: &[Line], start: usize, min_gap: f32) -> (usize, usize) {
    let mut top = start;
    while top > 0 && lines[top].bbox.y0 - lines[top - 1].bbox.y1 < min_gap {
        top -= 1;
    }
    let mut bottom = start;
    while bottom + 1 < lines.len() && lines[bottom + 1].bbox.y0 - lines[bottom].bbox.y1 < min_gap {
        bottom += 1;
    }
    (top, bottom)
}

/// Share of the region covered by token boxes.
fn density(tokens: &[PositionedToken], ids: &[usize], bbox: &BBox) -> f32 {
    let area = bbox.area();
    if area <= 0.0 {
        return 1.0;
    }
    let ink: f32 = ids.iter().filter_map(|&i| tokens.get(i)).map(|t| t.bbox.area()).sum();
    ink / area
}

/// Resolve overlaps until no two regions intersect.
///
/// Regions overlapping by at least `threshold` (of the smaller box) become
/// one; when their kinds disagree the larger box decides and a
/// `RegionAmbiguous` warning is recorded. A smaller overlap is resolved in
/// favour of the larger region: the smaller one gives up the tokens lying
/// inside it and is dropped if it still intersects.
pub fn merge_regions(
    mut regions: Vec<Region>,
    tokens: &[PositionedToken],
    threshold: f32,
    issues: &mut Vec<ExtractionIssue>,
) -> Vec<Region> {
    loop {
        if let Some((i, j)) = find_pair(&regions, |a, b| a.bbox.overlap_fraction(&b.bbox) >= threshold) {
            let absorbed = regions.remove(j);
            absorb(&mut regions[i], absorbed, issues);
            continue;
        }

        if let Some((i, j)) = find_pair(&regions, |a, b| a.bbox.intersects(&b.bbox)) {
            let (large, small) = if regions[j].bbox.area() > regions[i].bbox.area() {
                (j, i)
            } else {
                (i, j)
            };
            let large_bbox = regions[large].bbox;
            let large_ids: BTreeSet<usize> = regions[large].token_ids.iter().copied().collect();
            let page = regions[small].page_index + 1;

            let region = &mut regions[small];
            region.token_ids.retain(|id| {
                !large_ids.contains(id)
                    && tokens
                        .get(*id)
                        .is_some_and(|t| !large_bbox.contains_point(t.bbox.center_x(), t.bbox.center_y()))
            });
            let shrunk = BBox::enclosing(region.tokens(tokens).into_iter().map(|t| &t.bbox));

            match shrunk {
                Some(bbox) if !bbox.intersects(&large_bbox) => {
                    region.bbox = bbox;
                    issues.push(ExtractionIssue::new(
                        IssueKind::RegionAmbiguous,
                        page,
                        "overlapping regions: smaller region trimmed to its own tokens",
                    ));
                }
                _ => {
                    regions.remove(small);
                    issues.push(ExtractionIssue::new(
                        IssueKind::RegionAmbiguous,
                        page,
                        "overlapping regions: smaller region dropped in favour of the larger",
                    ));
                }
            }
            continue;
        }

        return regions;
    }
}

fn find_pair(regions: &[Region], pred: impl Fn(&Region, &Region) -> bool) -> Option<(usize, usize)> {
    (0..regions.len())
        .flat_map(|i| (i + 1..regions.len()).map(move |j| (i, j)))
        .find(|&(i, j)| pred(&regions[i], &regions[j]))
}

fn absorb(target: &mut Region, other: Region, issues: &mut Vec<ExtractionIssue>) {
    if target.kind != other.kind {
        let winner = if other.bbox.area() > target.bbox.area() {
            other.kind
        } else {
            target.kind
        };
        issues.push(ExtractionIssue::new(
            IssueKind::RegionAmbiguous,
            target.page_index + 1,
            format!(
                "merged {} and {} regions; kept {} from the larger box",
                target.kind, other.kind, winner
            ),
        ));
        target.kind = winner;
    }
    target.bbox = target.bbox.union(&other.bbox);
    target.anchor_keywords.extend(other.anchor_keywords);
    target.token_ids.extend(other.token_ids);
    target.token_ids.sort_unstable();
    target.token_ids.dedup();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::testing::{table_tokens, word};

    fn region(kind: RegionKind, bbox: BBox, token_ids: Vec<usize>) -> Region {
        Region {
            page_index: 0,
            bbox,
            kind,
            anchor_keywords: BTreeSet::new(),
            token_ids,
        }
    }

    #[test]
    fn test_no_anchor_no_region() {
        let tokens = vec![
            word("The", 10.0, 10.0, 20.0),
            word("rules", 35.0, 10.0, 30.0),
            word("of", 70.0, 10.0, 10.0),
            word("construction", 10.0, 22.0, 60.0),
        ];
        let (regions, issues) = detect_regions(0, &tokens, &ExtractionConfig::default());
        assert!(regions.is_empty());
        assert!(issues.is_empty());
    }

    #[test]
    fn test_empty_page() {
        let (regions, issues) = detect_regions(3, &[], &ExtractionConfig::default());
        assert!(regions.is_empty());
        assert!(issues.is_empty());
    }

    #[test]
    fn test_table_block_becomes_one_table_region() {
        let tokens = table_tokens(
            100.0,
            20.0,
            90.0,
            &[
                &["Spec_No", "Grade", "Allowable_Stress_at_100F", "Allowable_Stress_at_200F"],
                &["SA-516", "70", "20.0", "19.5"],
                &["SA-106", "B", "17.1", "17.1"],
            ],
        );
        let (regions, _) = detect_regions(0, &tokens, &ExtractionConfig::default());
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].kind, RegionKind::Table);
        assert_eq!(regions[0].token_ids.len(), tokens.len());
        assert!(regions[0].anchor_keywords.contains("spec no"));
    }

    #[test]
    fn test_separate_blocks_become_separate_regions() {
        let mut tokens = table_tokens(100.0, 20.0, 90.0, &[&["Table", "1A"], &["Stress", "ksi"]]);
        tokens.extend(table_tokens(300.0, 20.0, 90.0, &[&["Figure", "3"], &["Isochronous", "Curves"]]));
        let (regions, _) = detect_regions(0, &tokens, &ExtractionConfig::default());
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].kind, RegionKind::Table);
        assert_eq!(regions[1].kind, RegionKind::Chart);
        let first: BTreeSet<_> = regions[0].token_ids.iter().collect();
        assert!(regions[1].token_ids.iter().all(|id| !first.contains(id)));
    }

    #[test]
    fn test_unanchored_block_left_unassigned() {
        let mut tokens = table_tokens(100.0, 20.0, 90.0, &[&["Table", "2A"], &["Spec No", "ksi"]]);
        tokens.extend(table_tokens(400.0, 20.0, 90.0, &[&["General", "notes"], &["apply", "here"]]));
        let (regions, _) = detect_regions(0, &tokens, &ExtractionConfig::default());
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].token_ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_single_token_region_discarded() {
        let tokens = vec![word("Table", 10.0, 10.0, 30.0)];
        let (regions, _) = detect_regions(0, &tokens, &ExtractionConfig::default());
        assert!(regions.is_empty());
    }

    #[test]
    fn test_tick_line_is_chart_anchor() {
        let tokens: Vec<PositionedToken> = (0..6)
            .map(|i| word(&format!("{}", i * 10), 50.0 + i as f32 * 60.0, 500.0, 12.0))
            .collect();
        let (regions, _) = detect_regions(0, &tokens, &ExtractionConfig::default());
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].kind, RegionKind::Chart);
        assert!(regions[0].anchor_keywords.contains("axis ticks"));
    }

    #[test]
    fn test_data_row_is_not_tick_line() {
        let tokens = table_tokens(100.0, 20.0, 60.0, &[&["20.0", "19.5", "18.7", "17.3", "16.0"]]);
        let ids: Vec<usize> = (0..tokens.len()).collect();
        let lines = group_lines(&tokens, &ids, 3.0);
        assert!(!is_tick_sequence(&lines[0], &tokens));
    }

    #[test]
    fn test_heavy_overlap_merges() {
        let tokens = vec![word("a", 10.0, 10.0, 10.0), word("b", 30.0, 10.0, 10.0)];
        let regions = vec![
            region(RegionKind::Table, BBox::new(0.0, 0.0, 100.0, 100.0), vec![0]),
            region(RegionKind::Table, BBox::new(0.0, 0.0, 100.0, 90.0), vec![1]),
        ];
        let mut issues = Vec::new();
        let merged = merge_regions(regions, &tokens, 0.5, &mut issues);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].token_ids, vec![0, 1]);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_kind_conflict_larger_box_wins() {
        let regions = vec![
            region(RegionKind::Chart, BBox::new(0.0, 0.0, 100.0, 80.0), vec![]),
            region(RegionKind::Table, BBox::new(0.0, 0.0, 100.0, 100.0), vec![]),
        ];
        let mut issues = Vec::new();
        let merged = merge_regions(regions, &[], 0.5, &mut issues);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].kind, RegionKind::Table);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::RegionAmbiguous);
    }

    #[test]
    fn test_partial_overlap_trims_smaller() {
        let tokens = vec![
            word("big", 10.0, 10.0, 20.0),
            word("shared", 10.0, 92.0, 20.0),
            word("own", 10.0, 130.0, 20.0),
        ];
        let regions = vec![
            region(RegionKind::Table, BBox::new(0.0, 0.0, 200.0, 100.0), vec![0, 1]),
            region(RegionKind::Table, BBox::new(0.0, 90.0, 200.0, 140.0), vec![1, 2]),
        ];
        let mut issues = Vec::new();
        let merged = merge_regions(regions, &tokens, 0.5, &mut issues);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].token_ids, vec![2]);
        assert!(!merged[0].bbox.intersects(&merged[1].bbox));
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_detection_is_deterministic() {
        let tokens = table_tokens(
            50.0,
            20.0,
            80.0,
            &[&["Table", "5A"], &["Spec No", "Grade", "100F"], &["SA-516", "70", "20.0"]],
        );
        let config = ExtractionConfig::default();
        let first = detect_regions(0, &tokens, &config).0;
        for _ in 0..5 {
            assert_eq!(detect_regions(0, &tokens, &config).0, first);
        }
    }
}
