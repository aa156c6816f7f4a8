//! Domain text patterns shared by region detection, classification,
//! normalization and metadata.

use regex::Regex;
use std::sync::LazyLock;

/// A number immediately followed by a Fahrenheit marker: `100F`, `200 °F`,
/// `Allowable_Stress_at_650F`.
static TEMPERATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^0-9a-z.])(-?\d{1,4})\s*(?:°|º|deg\.?)?\s*F(?:[^a-z]|$)")
        .expect("temperature pattern is a compile-time constant")
});

static BARE_INTEGER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?\d{1,4}$").expect("integer pattern is a compile-time constant")
});

static FAHRENHEIT_CONTEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)°\s*F|\bdeg\.?\s*F\b|temperature")
        .expect("context pattern is a compile-time constant")
});

static STRESS_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(ksi|mpa|psi)\b").expect("stress unit pattern is a compile-time constant")
});

/// Lowercase, turn `_` and `-` into spaces and collapse whitespace, so that
/// `Allowable_Stress_at_100F` and `Allowable Stress` share vocabulary.
pub fn fold(s: &str) -> String {
    s.to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn contains_any(folded: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| folded.contains(n))
}

/// Temperature carried by a header with an explicit Fahrenheit marker.
pub fn temperature_of(text: &str) -> Option<i32> {
    TEMPERATURE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

pub fn has_temperature(text: &str) -> bool {
    temperature_of(text).is_some()
}

/// True if any of the texts marks its numbers as Fahrenheit temperatures.
pub fn has_fahrenheit_context<'a>(texts: impl IntoIterator<Item = &'a str>) -> bool {
    texts.into_iter().any(|t| FAHRENHEIT_CONTEXT.is_match(t))
}

/// Temperature of a column header. Bare integers (`"150"`) count only when
/// the table states elsewhere that its columns are temperatures.
pub fn column_temperature(header: &str, fahrenheit_context: bool) -> Option<i32> {
    let header = header.trim();
    if let Some(t) = temperature_of(header) {
        return Some(t);
    }
    if fahrenheit_context && BARE_INTEGER.is_match(header) {
        return header.parse().ok().filter(|t| (-459..=2000).contains(t));
    }
    None
}

pub fn has_stress_unit(text: &str) -> bool {
    STRESS_UNIT.is_match(&fold(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold() {
        assert_eq!(fold("Allowable_Stress_at_100F"), "allowable stress at 100f");
        assert_eq!(fold("  Design   Stress-Intensity "), "design stress intensity");
    }

    #[test]
    fn test_temperature_of_variants() {
        assert_eq!(temperature_of("Allowable_Stress_at_100F"), Some(100));
        assert_eq!(temperature_of("200F"), Some(200));
        assert_eq!(temperature_of("650 °F"), Some(650));
        assert_eq!(temperature_of("at 800°F"), Some(800));
        assert_eq!(temperature_of("-20F"), Some(-20));
        assert_eq!(temperature_of("Allowable_Stress_at_100F_2"), Some(100));
    }

    #[test]
    fn test_temperature_of_rejects_plain_headers() {
        assert_eq!(temperature_of("Spec_No"), None);
        assert_eq!(temperature_of("Grade"), None);
        assert_eq!(temperature_of("Min Tensile Strength, ksi"), None);
        assert_eq!(temperature_of("100 ft"), None);
    }

    #[test]
    fn test_bare_integer_needs_context() {
        assert_eq!(column_temperature("150", false), None);
        assert_eq!(column_temperature("150", true), Some(150));
        assert_eq!(column_temperature("Grade", true), None);
    }

    #[test]
    fn test_fahrenheit_context() {
        assert!(has_fahrenheit_context(["Maximum Allowable Stress, ksi, for Metal Temperature, °F"]));
        assert!(!has_fahrenheit_context(["Spec No", "Grade"]));
    }

    #[test]
    fn test_stress_unit() {
        assert!(has_stress_unit("Min_Tensile_Strength_ksi"));
        assert!(has_stress_unit("Stress, MPa"));
        assert!(!has_stress_unit("Spec No"));
    }
}
