use crate::model::{ExtractedChart, ExtractedTable, ExtractionMetadata};
use crate::vocab;

/// Derived flags of a table. Recomputing on the same table gives the same result.
pub fn table_metadata(table: &ExtractedTable) -> ExtractionMetadata {
    ExtractionMetadata {
        has_temperature_data: table.columns.iter().any(|c| vocab::has_temperature(c)),
        has_stress_data: table.schema.is_stress()
            || table.columns.iter().any(|c| vocab::has_stress_unit(c)),
        row_count: table.rows.len(),
        col_count: table.columns.len(),
        coercion_failures: table.flagged_cells.len(),
    }
}

/// Charts have no header row; temperature and stress units are read from the
/// title and description, and counts describe the digitized series if any.
pub fn chart_metadata(chart: &ExtractedChart) -> ExtractionMetadata {
    let text = format!("{} {}", chart.title, chart.description);
    ExtractionMetadata {
        has_temperature_data: vocab::has_temperature(&text),
        has_stress_data: chart.schema.is_stress() || vocab::has_stress_unit(&text),
        row_count: chart.series.iter().map(|s| s.points.len()).max().unwrap_or(0),
        col_count: chart.series.len(),
        coercion_failures: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CellValue, ChartSeries, SchemaLabel};

    fn table(schema: SchemaLabel, columns: &[&str]) -> ExtractedTable {
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        let row = columns.iter().map(|c| (c.clone(), CellValue::Missing)).collect();
        ExtractedTable {
            id: "Page_1_Table_1".into(),
            page: 1,
            schema,
            title: None,
            columns,
            rows: vec![row],
            flagged_cells: vec![],
            metadata: Default::default(),
        }
    }

    #[test]
    fn test_stress_schema_with_temperature_columns() {
        let t = table(
            SchemaLabel::AllowableStress,
            &["Spec_No", "Grade", "Allowable_Stress_at_100F", "Allowable_Stress_at_200F"],
        );
        let m = table_metadata(&t);
        assert!(m.has_temperature_data);
        assert!(m.has_stress_data);
        assert_eq!((m.row_count, m.col_count), (1, 4));
    }

    #[test]
    fn test_stress_unit_header_without_stress_schema() {
        let t = table(SchemaLabel::MechanicalProperties, &["Spec_No", "Min_Tensile_Strength_ksi"]);
        let m = table_metadata(&t);
        assert!(!m.has_temperature_data);
        assert!(m.has_stress_data);
    }

    #[test]
    fn test_plain_table_has_no_flags() {
        let m = table_metadata(&table(SchemaLabel::OtherTable, &["Item", "Note"]));
        assert!(!m.has_temperature_data);
        assert!(!m.has_stress_data);
    }

    #[test]
    fn test_chart_metadata() {
        let chart = ExtractedChart {
            id: "Page_3_Chart_1".into(),
            page: 3,
            schema: SchemaLabel::IsochronousCurve,
            title: "Average Isochronous Stress-Strain Curves for Type 304 SS at 800°F".into(),
            description: String::new(),
            series: vec![ChartSeries {
                label: "1 hr".into(),
                points: vec![(0.0, 0.0), (0.5, 10.0)],
            }],
            metadata: Default::default(),
        };
        let m = chart_metadata(&chart);
        assert!(m.has_temperature_data);
        // "Stress-Strain" in a title is not a stress unit.
        assert!(!m.has_stress_data);
        assert_eq!((m.row_count, m.col_count), (2, 1));
    }

    #[test]
    fn test_chart_stress_needs_a_unit() {
        let mut chart = ExtractedChart {
            id: "Page_9_Chart_1".into(),
            page: 9,
            schema: SchemaLabel::ExternalPressureChart,
            title: "Chart HA-1".into(),
            description: "Chart HA-1 Austenitic Steel Type 304, stress values".into(),
            series: vec![],
            metadata: Default::default(),
        };
        assert!(!chart_metadata(&chart).has_stress_data);

        chart.description = "Factor B, psi".into();
        let m = chart_metadata(&chart);
        assert!(m.has_stress_data);
        assert!(!m.has_temperature_data);
        assert_eq!((m.row_count, m.col_count), (0, 0));
    }
}
