pub mod header;
pub mod values;

use crate::metadata::table_metadata;
use crate::model::{CellValue, ExtractedTable, FlaggedCell, RawGrid, SchemaLabel, TableRow};
use crate::vocab;
use std::collections::HashSet;

/// Turn a classified raw grid into an extracted table.
///
/// Applying this to `table.to_raw_grid()` of its own output yields the same
/// columns and rows.
pub fn normalize_table(id: String, page: usize, grid: &RawGrid, schema: SchemaLabel) -> ExtractedTable {
    let title = grid.title_text().map(|t| header::clean_text(&t));
    let columns = header::canonical_headers(grid.header(), title.as_deref(), schema);

    // Canonical temperature headers carry an explicit `F`, so no context is
    // needed to recognise them here.
    let numeric: Vec<bool> = columns
        .iter()
        .map(|c| values::is_numeric_column(c, vocab::temperature_of(c).is_some()))
        .collect();

    let mut rows: Vec<TableRow> = Vec::with_capacity(grid.body().len());
    let mut flagged_cells = Vec::new();
    let mut seen: HashSet<Vec<(CellValue, Option<String>)>> = HashSet::new();

    for (row_index, raw_row) in grid.body().iter().enumerate() {
        // A cell that failed coercion keeps its source text in the duplicate
        // key, so rows differing only in unreadable cells are both kept.
        let parsed: Vec<(CellValue, Option<String>)> = (0..columns.len())
            .map(|col| {
                let raw = raw_row.get(col).and_then(|c| c.as_deref());
                match values::parse_cell(raw, numeric[col]) {
                    Ok(value) => (value, None),
                    Err(e) => (CellValue::Missing, Some(e.raw)),
                }
            })
            .collect();
        if !seen.insert(parsed.clone()) {
            tracing::debug!(%id, row = row_index, "dropping exact duplicate row");
            continue;
        }

        let row = rows.len();
        for (column, (_, failed)) in columns.iter().zip(&parsed) {
            if let Some(raw) = failed {
                flagged_cells.push(FlaggedCell {
                    row,
                    column: column.clone(),
                    raw: raw.clone(),
                });
            }
        }
        rows.push(columns.iter().cloned().zip(parsed.into_iter().map(|(v, _)| v)).collect());
    }

    let mut table = ExtractedTable {
        id,
        page,
        schema,
        title,
        columns,
        rows,
        flagged_cells,
        metadata: Default::default(),
    };
    table.metadata = table_metadata(&table);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn grid(rows: &[&[&str]]) -> RawGrid {
        RawGrid::from_rows(
            vec![],
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    fn scenario_a() -> RawGrid {
        grid(&[
            &["Spec_No", "Grade", "Allowable_Stress_at_100F", "Allowable_Stress_at_200F"],
            &["SA-516", "70", "20.0", "19.5"],
        ])
    }

    #[test]
    fn test_allowable_stress_values_become_numbers() {
        let table = normalize_table("Page_1_Table_1".into(), 1, &scenario_a(), SchemaLabel::AllowableStress);
        let row = &table.rows[0];
        assert_eq!(row["Allowable_Stress_at_100F"], CellValue::Number(dec!(20.0)));
        assert_eq!(row["Allowable_Stress_at_200F"], CellValue::Number(dec!(19.5)));
        assert_eq!(row["Allowable_Stress_at_100F"].as_f64(), Some(20.0));
        assert_eq!(row["Spec_No"], CellValue::Text("SA-516".into()));
        assert_eq!(row["Grade"], CellValue::Text("70".into()));
        assert!(table.flagged_cells.is_empty());
    }

    #[test]
    fn test_coercion_failure_is_missing_and_flagged() {
        let g = grid(&[&["Spec_No", "Allowable_Stress_at_100F"], &["SA-516", "see Note 3"]]);
        let table = normalize_table("t".into(), 1, &g, SchemaLabel::AllowableStress);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0]["Allowable_Stress_at_100F"], CellValue::Missing);
        assert_ne!(table.rows[0]["Allowable_Stress_at_100F"], CellValue::Number(dec!(0)));
        assert_eq!(
            table.flagged_cells,
            vec![FlaggedCell {
                row: 0,
                column: "Allowable_Stress_at_100F".into(),
                raw: "see Note 3".into(),
            }]
        );
        assert_eq!(table.metadata.coercion_failures, 1);
    }

    #[test]
    fn test_exact_duplicates_removed_order_kept() {
        let g = grid(&[
            &["Spec_No", "Grade"],
            &["SA-516", "70"],
            &["SA-106", "B"],
            &["SA-516", "70"],
            &["SA-53", "B"],
        ]);
        let table = normalize_table("t".into(), 1, &g, SchemaLabel::OtherTable);
        let specs: Vec<String> = table.rows.iter().map(|r| r["Spec_No"].to_string()).collect();
        assert_eq!(specs, vec!["SA-516", "SA-106", "SA-53"]);
    }

    #[test]
    fn test_rows_differing_only_in_unreadable_cells_are_kept() {
        let g = grid(&[
            &["Spec_No", "Allowable_Stress_at_100F"],
            &["SA-516", "see Note 3"],
            &["SA-516", "see Note 7"],
            &["SA-516", "see Note 3"],
        ]);
        let table = normalize_table("t".into(), 1, &g, SchemaLabel::AllowableStress);
        assert_eq!(table.rows.len(), 2);
        let flagged: Vec<(usize, &str)> = table
            .flagged_cells
            .iter()
            .map(|f| (f.row, f.raw.as_str()))
            .collect();
        assert_eq!(flagged, vec![(0, "see Note 3"), (1, "see Note 7")]);
        assert!(table.flagged_cells.iter().all(|f| f.row < table.rows.len()));

        let again = normalize_table("t".into(), 1, &table.to_raw_grid(), SchemaLabel::AllowableStress);
        assert_eq!(again.rows, table.rows);
        assert_eq!(again.flagged_cells, table.flagged_cells);
    }

    #[test]
    fn test_every_row_has_every_column() {
        let mut g = grid(&[&["A", "B", "C", "D"]]);
        g.push_row(vec![Some("1".into()), Some("2".into()), Some("3".into())]);
        let table = normalize_table("t".into(), 1, &g, SchemaLabel::OtherTable);
        assert_eq!(table.rows[0].len(), 4);
        assert_eq!(table.rows[0]["D"], CellValue::Missing);
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let g = grid(&[
            &["  Spec   No ", "", "100°F", "100 F", "Tensile Strength, ksi"],
            &["SA-516 ", "x", "20.0", "—", "70"],
            &["SA-516 ", "x", "20.0", "—", "70"],
            &["SA-106", "", "17.1 (2)", "bad", "60,000"],
        ]);
        let once = normalize_table("t".into(), 1, &g, SchemaLabel::AllowableStress);
        let twice = normalize_table("t".into(), 1, &once.to_raw_grid(), SchemaLabel::AllowableStress);
        assert_eq!(twice.columns, once.columns);
        assert_eq!(twice.rows, once.rows);
        assert_eq!(
            once.columns,
            vec![
                "Spec No",
                "Column_2",
                "Allowable_Stress_at_100F",
                "Allowable_Stress_at_100F_2",
                "Tensile Strength, ksi"
            ]
        );
    }
}
