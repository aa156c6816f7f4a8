use partd_core::model::ExtractedTable;
use partd_core::query::{find_rows, stress_lookup, tables_with_temperature};
use partd_core::report::load_result;
use partd_core::{ExtractError, SchemaLabel};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::path::Path;

use crate::output;
use crate::Format;

pub fn run(
    result_file: &Path,
    material: Option<&str>,
    temperature: Option<Decimal>,
    label: Option<&str>,
    format: Format,
) -> Result<(), ExtractError> {
    let result = load_result(result_file)?;

    let tables: Vec<ExtractedTable> = match label {
        Some(l) => {
            let label = SchemaLabel::from_str_loose(l)
                .ok_or_else(|| ExtractError::ConfigInvalid(format!("unknown schema label '{l}'")))?;
            result.tables.into_iter().filter(|t| t.schema == label).collect()
        }
        None => result.tables,
    };

    match (material, temperature) {
        (Some(material), Some(t)) => {
            let hits = stress_lookup(&tables, material, t);
            match format {
                Format::Json => output::json::print(&hits)?,
                Format::Table => output::table::print_lookups(&hits),
            }
        }
        (Some(material), None) => {
            let matches = find_rows(&tables, material);
            match format {
                Format::Json => {
                    let rows: Vec<serde_json::Value> = matches
                        .iter()
                        .map(|m| {
                            serde_json::json!({
                                "table": m.table.id,
                                "row_index": m.row_index,
                                "row": m.row,
                            })
                        })
                        .collect();
                    output::json::print(&rows)?;
                }
                Format::Table => output::table::print_rows(&matches),
            }
        }
        (None, Some(t)) => {
            let whole = t
                .fract()
                .is_zero()
                .then(|| t.to_i32())
                .flatten()
                .ok_or_else(|| {
                    ExtractError::ConfigInvalid(format!(
                        "temperature {t} must be a whole number of °F without --material"
                    ))
                })?;
            let found: Vec<&ExtractedTable> = tables_with_temperature(&tables, whole);
            print_tables(&found, format)?;
        }
        (None, None) => {
            let all: Vec<&ExtractedTable> = tables.iter().collect();
            print_tables(&all, format)?;
        }
    }
    Ok(())
}

fn print_tables(tables: &[&ExtractedTable], format: Format) -> Result<(), ExtractError> {
    match format {
        Format::Json => output::json::print(tables),
        Format::Table => {
            output::table::print_tables(tables);
            Ok(())
        }
    }
}
