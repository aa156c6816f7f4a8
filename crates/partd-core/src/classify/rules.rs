use crate::classify::{ChartEvidence, TableEvidence};
use crate::model::SchemaLabel;
use crate::vocab::contains_any;
use regex::Regex;
use std::sync::LazyLock;

/// Section II-D Subpart 3 caption id such as `Chart HA-1` or `CHART CS-2`.
/// That subpart numbers only its external-pressure charts this way.
static EXTERNAL_PRESSURE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bchart\s+[a-z]+-\d+").expect("chart id pattern is a compile-time constant")
});

/// One entry of an ordered rule table. The first rule whose predicate holds
/// assigns its label.
pub struct Rule<E> {
    pub name: &'static str,
    pub label: SchemaLabel,
    pub matches: fn(&E) -> bool,
}

/// Most specific first; the last entry always matches.
pub static TABLE_RULES: [Rule<TableEvidence>; 5] = [
    Rule {
        name: "allowable stress vs temperature",
        label: SchemaLabel::AllowableStress,
        matches: allowable_stress,
    },
    Rule {
        name: "design stress",
        label: SchemaLabel::DesignStress,
        matches: design_stress,
    },
    Rule {
        name: "tensile or yield strength",
        label: SchemaLabel::MechanicalProperties,
        matches: mechanical_properties,
    },
    Rule {
        name: "modulus or coefficient",
        label: SchemaLabel::PhysicalProperties,
        matches: physical_properties,
    },
    Rule {
        name: "fallback table",
        label: SchemaLabel::OtherTable,
        matches: |_| true,
    },
];

pub static CHART_RULES: [Rule<ChartEvidence>; 3] = [
    Rule {
        name: "isochronous",
        label: SchemaLabel::IsochronousCurve,
        matches: isochronous_curve,
    },
    Rule {
        name: "external pressure",
        label: SchemaLabel::ExternalPressureChart,
        matches: external_pressure_chart,
    },
    Rule {
        name: "fallback chart",
        label: SchemaLabel::OtherChart,
        matches: |_| true,
    },
];

const STRENGTH_TERMS: &[&str] = &["tensile", "yield strength", "yield"];

const PHYSICAL_TERMS: &[&str] = &[
    "modulus",
    "coefficient",
    "thermal expansion",
    "conductivity",
    "diffusivity",
    "poisson",
];

const GEOMETRY_TERMS: &[&str] = &[
    "external pressure",
    "factor a",
    "factor b",
    "geometric factor",
    "geometry factor",
    "do/t",
    "l/do",
];

fn allowable_stress(e: &TableEvidence) -> bool {
    e.mentions("allowable stress") && e.temperature_columns > 0
}

fn design_stress(e: &TableEvidence) -> bool {
    e.mentions("design stress intensity") || e.mentions("design stress")
}

/// Strength vocabulary, unless the table tabulates a stress against
/// temperature columns.
fn mechanical_properties(e: &TableEvidence) -> bool {
    let stress_vs_temperature = e.temperature_columns > 0 && e.mentions("stress");
    STRENGTH_TERMS.iter().any(|t| e.mentions(t)) && !stress_vs_temperature
}

fn physical_properties(e: &TableEvidence) -> bool {
    PHYSICAL_TERMS.iter().any(|t| e.mentions(t))
}

fn isochronous_curve(e: &ChartEvidence) -> bool {
    e.text.contains("isochronous")
}

fn external_pressure_chart(e: &ChartEvidence) -> bool {
    EXTERNAL_PRESSURE_ID.is_match(&e.title) || contains_any(&e.text, GEOMETRY_TERMS)
}
