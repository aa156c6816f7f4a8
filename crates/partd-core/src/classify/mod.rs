//! Schema classification of table and chart candidates.
//!
//! Classification is a pure function of the candidate's text: the candidate
//! is reduced to folded evidence, checked for minimal structural validity,
//! then run through an ordered rule table where the first match wins.

pub mod rules;

use crate::model::{RawGrid, SchemaLabel};
use crate::vocab;
use rules::{Rule, CHART_RULES, TABLE_RULES};

/// Label assigned to a candidate and the rule (or validity check) that chose it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub label: SchemaLabel,
    pub rule: &'static str,
}

impl Classification {
    /// True when no specific rule matched and a fallback label was used.
    pub fn is_fallback(&self) -> bool {
        matches!(
            self.label,
            SchemaLabel::OtherTable | SchemaLabel::OtherChart | SchemaLabel::Unclassified
        )
    }

    fn unclassified(reason: &'static str) -> Self {
        Classification {
            label: SchemaLabel::Unclassified,
            rule: reason,
        }
    }
}

/// Folded text and shape facts of a table candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct TableEvidence {
    pub header: String,
    pub title: String,
    pub temperature_columns: usize,
    pub columns: usize,
    pub body_rows: usize,
}

impl TableEvidence {
    pub fn from_grid(grid: &RawGrid) -> Self {
        let headers: Vec<&str> = grid.header().iter().flatten().map(String::as_str).collect();
        let title = grid.title_text().unwrap_or_default();
        let context = vocab::has_fahrenheit_context(headers.iter().copied().chain([title.as_str()]));
        let temperature_columns = headers
            .iter()
            .filter(|h| vocab::column_temperature(h, context).is_some())
            .count();

        TableEvidence {
            header: vocab::fold(&headers.join(" ")),
            title: vocab::fold(&title),
            temperature_columns,
            columns: grid.col_count(),
            body_rows: grid.body().len(),
        }
    }

    /// Term appears in the header row or the title.
    pub fn mentions(&self, term: &str) -> bool {
        self.header.contains(term) || self.title.contains(term)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartEvidence {
    /// Caption as printed, for patterns that folding would blur (`Chart HA-1`).
    pub title: String,
    /// Folded title and description.
    pub text: String,
}

impl ChartEvidence {
    pub fn new(title: &str, description: &str) -> Self {
        ChartEvidence {
            title: title.trim().to_string(),
            text: vocab::fold(&format!("{title} {description}")),
        }
    }
}

pub fn classify_table(grid: &RawGrid) -> Classification {
    let evidence = TableEvidence::from_grid(grid);
    if evidence.columns < 2 {
        return Classification::unclassified("fewer than two columns");
    }
    if evidence.body_rows == 0 {
        return Classification::unclassified("no data rows");
    }
    first_match(&TABLE_RULES, &evidence, SchemaLabel::OtherTable)
}

pub fn classify_chart(title: &str, description: &str) -> Classification {
    let evidence = ChartEvidence::new(title, description);
    if evidence.text.is_empty() {
        return Classification::unclassified("no title or description text");
    }
    first_match(&CHART_RULES, &evidence, SchemaLabel::OtherChart)
}

fn first_match<E>(rules: &[Rule<E>], evidence: &E, fallback: SchemaLabel) -> Classification {
    rules
        .iter()
        .find(|rule| (rule.matches)(evidence))
        .map(|rule| Classification {
            label: rule.label,
            rule: rule.name,
        })
        .unwrap_or(Classification {
            label: fallback,
            rule: "fallback",
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(title: &[&str], rows: &[&[&str]]) -> RawGrid {
        RawGrid::from_rows(
            title.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_allowable_stress_table() {
        let g = grid(
            &[],
            &[
                &["Spec_No", "Grade", "Allowable_Stress_at_100F", "Allowable_Stress_at_200F"],
                &["SA-516", "70", "20.0", "19.5"],
            ],
        );
        let c = classify_table(&g);
        assert_eq!(c.label, SchemaLabel::AllowableStress);
        assert!(!c.is_fallback());
    }

    #[test]
    fn test_bare_temperature_headers_with_title_context() {
        let g = grid(
            &["Table 1A Maximum Allowable Stress Values, ksi, for Metal Temperature, °F"],
            &[&["Spec No", "Grade", "100", "200"], &["SA-516", "70", "20.0", "19.5"]],
        );
        assert_eq!(classify_table(&g).label, SchemaLabel::AllowableStress);
    }

    #[test]
    fn test_allowable_and_tensile_first_match_wins() {
        let g = grid(
            &[],
            &[
                &["Spec_No", "Min_Tensile_Strength_ksi", "Allowable_Stress_at_100F"],
                &["SA-516", "70", "20.0"],
            ],
        );
        let c = classify_table(&g);
        assert_eq!(c.label, SchemaLabel::AllowableStress);
        assert_eq!(c.rule, "allowable stress vs temperature");
    }

    #[test]
    fn test_allowable_without_temperature_is_not_allowable() {
        let g = grid(&[], &[&["Material", "Allowable Stress"], &["SA-516", "20.0"]]);
        assert_eq!(classify_table(&g).label, SchemaLabel::OtherTable);
    }

    #[test]
    fn test_physical_and_other() {
        let g = grid(&[], &[&["Material", "Modulus of Elasticity"], &["Carbon steel", "29.2"]]);
        assert_eq!(classify_table(&g).label, SchemaLabel::PhysicalProperties);
        let g = grid(&[], &[&["Item", "Note"], &["1", "see text"]]);
        let c = classify_table(&g);
        assert_eq!(c.label, SchemaLabel::OtherTable);
        assert!(c.is_fallback());
    }

    #[test]
    fn test_structurally_invalid_tables() {
        let one_col = grid(&[], &[&["Allowable Stress"], &["20.0"]]);
        assert_eq!(classify_table(&one_col).label, SchemaLabel::Unclassified);
        let header_only = grid(&[], &[&["Spec No", "Grade"]]);
        let c = classify_table(&header_only);
        assert_eq!(c.label, SchemaLabel::Unclassified);
        assert_eq!(c.rule, "no data rows");
    }

    #[test]
    fn test_isochronous_chart() {
        let c = classify_chart(
            "Average Isochronous Stress-Strain Curves for Type 304 SS at 800°F",
            "",
        );
        assert_eq!(c.label, SchemaLabel::IsochronousCurve);
    }

    #[test]
    fn test_external_pressure_and_other_chart() {
        assert_eq!(
            classify_chart("Figure G", "Geometric Chart for Components Under External Pressure").label,
            SchemaLabel::ExternalPressureChart
        );
        let c = classify_chart("Chart HA-1", "Chart HA-1 Austenitic Steel Type 304");
        assert_eq!(c.label, SchemaLabel::ExternalPressureChart);
        assert_eq!(c.rule, "external pressure");
        assert_eq!(classify_chart("Figure 7", "Creep rupture data").label, SchemaLabel::OtherChart);
        assert_eq!(classify_chart("  ", "").label, SchemaLabel::Unclassified);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let g = grid(&["Table 2A"], &[&["Spec No", "Design Stress Intensity"], &["SA-516", "23.3"]]);
        let first = classify_table(&g);
        for _ in 0..10 {
            assert_eq!(classify_table(&g), first);
        }
        assert_eq!(first.label, SchemaLabel::DesignStress);
    }
}
