use crate::model::SchemaLabel;
use crate::vocab;
use std::collections::HashSet;

/// Canonical, pairwise distinct column names for a table of the given schema.
///
/// Headers are trimmed and whitespace-collapsed. A header that names a
/// temperature is rewritten to the schema's template, e.g.
/// `Allowable_Stress_at_100F`, so downstream lookups can read the
/// temperature back. Empty headers become `Column_<n>`; collisions get a
/// `_2`, `_3`, ... suffix in column order.
pub fn canonical_headers(raw: &[Option<String>], title: Option<&str>, schema: SchemaLabel) -> Vec<String> {
    let cleaned: Vec<String> = raw
        .iter()
        .map(|h| h.as_deref().map(clean_text).unwrap_or_default())
        .collect();
    let context = vocab::has_fahrenheit_context(
        cleaned.iter().map(String::as_str).chain(title),
    );

    let mut used: HashSet<String> = HashSet::new();
    cleaned
        .iter()
        .enumerate()
        .map(|(i, header)| {
            let base = if header.is_empty() {
                format!("Column_{}", i + 1)
            } else if let Some(t) = vocab::column_temperature(header, context) {
                temperature_header(schema, t)
            } else {
                header.clone()
            };
            unique_name(base, &mut used)
        })
        .collect()
}

pub fn temperature_header(schema: SchemaLabel, temperature: i32) -> String {
    let prefix = match schema {
        SchemaLabel::AllowableStress => "Allowable_Stress",
        SchemaLabel::DesignStress => "Design_Stress_Intensity",
        SchemaLabel::MechanicalProperties => "Yield_Strength_ksi",
        SchemaLabel::PhysicalProperties => "Property",
        _ => "Value",
    };
    format!("{prefix}_at_{temperature}F")
}

/// Trim and collapse internal whitespace to single spaces.
pub fn clean_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn unique_name(base: String, used: &mut HashSet<String>) -> String {
    let mut name = base.clone();
    let mut n = 2;
    while used.contains(&name) {
        name = format!("{base}_{n}");
        n += 1;
    }
    used.insert(name.clone());
    name
}
