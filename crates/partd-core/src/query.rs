//! Lookups over extracted tables: material search and temperature-indexed
//! values with linear interpolation between adjacent temperature columns.

use crate::model::{CellValue, ExtractedTable, SchemaLabel, TableRow};
use crate::vocab;
use rust_decimal::Decimal;
use serde::Serialize;

/// A row whose text cells mention the searched keyword.
#[derive(Debug, Clone, Copy)]
pub struct RowMatch<'a> {
    pub table: &'a ExtractedTable,
    pub row_index: usize,
    pub row: &'a TableRow,
}

impl RowMatch<'_> {
    /// Text cells of the row joined, e.g. `"SA-516 70"`.
    pub fn label(&self) -> String {
        row_label(self.row)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TemperatureValue {
    pub value: Decimal,
    /// False when a column exists at exactly the requested temperature.
    pub interpolated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StressLookup {
    pub table_id: String,
    pub page: usize,
    pub schema: SchemaLabel,
    pub material: String,
    pub temperature: Decimal,
    pub value: Decimal,
    pub interpolated: bool,
}

/// Rows with a text cell containing `keyword`, case-insensitively.
pub fn find_rows<'a>(tables: &'a [ExtractedTable], keyword: &str) -> Vec<RowMatch<'a>> {
    let needle = keyword.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    tables
        .iter()
        .flat_map(|table| {
            let needle = needle.as_str();
            table
                .rows
                .iter()
                .enumerate()
                .filter(move |(_, row)| {
                    row.values()
                        .filter_map(CellValue::as_text)
                        .any(|t| t.to_lowercase().contains(needle))
                })
                .map(move |(row_index, row)| RowMatch {
                    table,
                    row_index,
                    row,
                })
        })
        .collect()
}

pub fn tables_with_label(tables: &[ExtractedTable], label: SchemaLabel) -> Vec<&ExtractedTable> {
    tables.iter().filter(|t| t.schema == label).collect()
}

/// Tables with a column at exactly `temperature` °F.
pub fn tables_with_temperature(tables: &[ExtractedTable], temperature: i32) -> Vec<&ExtractedTable> {
    tables
        .iter()
        .filter(|t| temperature_columns(t).iter().any(|(temp, _)| *temp == temperature))
        .collect()
}

/// Temperature-bearing columns of a table, ascending. The first column wins
/// when two share a temperature.
pub fn temperature_columns(table: &ExtractedTable) -> Vec<(i32, &str)> {
    let mut columns: Vec<(i32, &str)> = Vec::new();
    for column in &table.columns {
        if let Some(t) = vocab::temperature_of(column) {
            if !columns.iter().any(|(seen, _)| *seen == t) {
                columns.push((t, column.as_str()));
            }
        }
    }
    columns.sort_by_key(|(t, _)| *t);
    columns
}

/// Value of `row` at `temperature`: the exact column if there is one,
/// otherwise linear interpolation between the two columns bracketing it.
/// `None` outside the tabulated range or when a needed cell is missing.
pub fn value_at_temperature(
    table: &ExtractedTable,
    row: &TableRow,
    temperature: Decimal,
) -> Option<TemperatureValue> {
    let columns = temperature_columns(table);
    let value_of = |name: &str| row.get(name).and_then(CellValue::as_decimal);

    if let Some((_, name)) = columns.iter().find(|(t, _)| Decimal::from(*t) == temperature) {
        return value_of(name).map(|value| TemperatureValue {
            value,
            interpolated: false,
        });
    }

    let (low, high) = columns
        .windows(2)
        .map(|w| (w[0], w[1]))
        .find(|((t0, _), (t1, _))| Decimal::from(*t0) < temperature && temperature < Decimal::from(*t1))?;
    let (t0, v0) = (Decimal::from(low.0), value_of(low.1)?);
    let (t1, v1) = (Decimal::from(high.0), value_of(high.1)?);
    let value = v0 + (v1 - v0) * (temperature - t0) / (t1 - t0);

    Some(TemperatureValue {
        value: value.round_dp(4).normalize(),
        interpolated: true,
    })
}

/// Allowable or design stress of every material matching `keyword` at
/// `temperature`, across all stress tables.
pub fn stress_lookup(tables: &[ExtractedTable], keyword: &str, temperature: Decimal) -> Vec<StressLookup> {
    find_rows(tables, keyword)
        .into_iter()
        .filter(|m| m.table.schema.is_stress())
        .filter_map(|m| {
            let found = value_at_temperature(m.table, m.row, temperature)?;
            Some(StressLookup {
                table_id: m.table.id.clone(),
                page: m.table.page,
                schema: m.table.schema,
                material: m.label(),
                temperature,
                value: found.value,
                interpolated: found.interpolated,
            })
        })
        .collect()
}

fn row_label(row: &TableRow) -> String {
    row.values()
        .filter_map(CellValue::as_text)
        .collect::<Vec<_>>()
        .join(" ")
}
