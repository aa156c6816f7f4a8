use crate::model::CellValue;
use crate::normalize::header::clean_text;
use crate::vocab;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::LazyLock;

/// Trailing footnote reference such as `(1)` or `(a)`.
static FOOTNOTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*\(\s*[0-9a-z]{1,2}\s*\)\s*$").expect("footnote pattern is a compile-time constant")
});

const PLACEHOLDERS: &[&str] = &["", "-", "—", "–", "--", "...", "…", "N/A", "n/a", "NA"];

const NUMERIC_HEADER_TERMS: &[&str] = &[
    "ksi",
    "mpa",
    "psi",
    "strength",
    "stress",
    "modulus",
    "coefficient",
    "conductivity",
    "diffusivity",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot read '{raw}' as a number")]
pub struct CoercionError {
    pub raw: String,
}

/// Parse one raw cell.
///
/// - placeholders (`—`, `…`, empty, ...) and absent cells -> `Missing`
/// - numeric columns: `"20.0"` -> `Number(20.0)`, `"29,200"` -> `Number(29200)`,
///   `"17.1 (1)"` -> `Number(17.1)`; anything else is a [`CoercionError`]
/// - other columns -> `Text`, whitespace-collapsed
pub fn parse_cell(raw: Option<&str>, numeric: bool) -> Result<CellValue, CoercionError> {
    let Some(raw) = raw else {
        return Ok(CellValue::Missing);
    };
    let text = clean_text(raw);
    if is_placeholder(&text) {
        return Ok(CellValue::Missing);
    }
    if !numeric {
        return Ok(CellValue::Text(text));
    }
    parse_number(&text)
        .map(CellValue::Number)
        .ok_or(CoercionError { raw: text })
}

pub fn is_placeholder(s: &str) -> bool {
    PLACEHOLDERS.contains(&s.trim())
}

fn parse_number(s: &str) -> Option<Decimal> {
    let stripped = FOOTNOTE.replace(s, "");
    let normalized: String = stripped
        .trim()
        .replace('\u{2212}', "-")
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    Decimal::from_str(&normalized).ok()
}

/// Columns whose cells are coerced to numbers: temperature columns and
/// headers naming a strength, stress, modulus or unit.
pub fn is_numeric_column(header: &str, is_temperature: bool) -> bool {
    is_temperature || vocab::contains_any(&vocab::fold(header), NUMERIC_HEADER_TERMS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_numeric_cell() {
        assert_eq!(parse_cell(Some("20.0"), true), Ok(CellValue::Number(dec!(20.0))));
        assert_eq!(parse_cell(Some(" 19.5 "), true), Ok(CellValue::Number(dec!(19.5))));
    }

    #[test]
    fn test_thousands_and_footnotes() {
        assert_eq!(parse_cell(Some("29,200"), true), Ok(CellValue::Number(dec!(29200))));
        assert_eq!(parse_cell(Some("17.1 (1)"), true), Ok(CellValue::Number(dec!(17.1))));
        assert_eq!(parse_cell(Some("−20"), true), Ok(CellValue::Number(dec!(-20))));
    }

    #[test]
    fn test_placeholders_are_missing_not_zero() {
        for p in ["—", "…", "", "  ", "-", "N/A"] {
            assert_eq!(parse_cell(Some(p), true), Ok(CellValue::Missing), "placeholder {p:?}");
            assert_eq!(parse_cell(Some(p), false), Ok(CellValue::Missing));
        }
        assert_eq!(parse_cell(None, true), Ok(CellValue::Missing));
    }

    #[test]
    fn test_coercion_failure_reports_raw() {
        let err = parse_cell(Some("see note"), true).unwrap_err();
        assert_eq!(err.raw, "see note");
    }

    #[test]
    fn test_text_cell_keeps_text() {
        assert_eq!(parse_cell(Some("SA-516"), false), Ok(CellValue::Text("SA-516".into())));
        assert_eq!(parse_cell(Some("70"), false), Ok(CellValue::Text("70".into())));
        assert_eq!(parse_cell(Some("Carbon   steel"), false), Ok(CellValue::Text("Carbon steel".into())));
    }

    #[test]
    fn test_numeric_columns() {
        assert!(is_numeric_column("Allowable_Stress_at_100F", true));
        assert!(is_numeric_column("Min_Tensile_Strength_ksi", false));
        assert!(is_numeric_column("Modulus of Elasticity", false));
        assert!(!is_numeric_column("Spec_No", false));
        assert!(!is_numeric_column("Grade", false));
    }
}
