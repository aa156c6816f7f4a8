use partd_core::model::ExtractedTable;
use partd_core::query::{RowMatch, StressLookup};
use partd_core::trace::Severity;
use partd_core::ExtractionResult;

pub fn print_result(result: &ExtractionResult) {
    let report = &result.report;

    if !result.tables.is_empty() {
        println!("=== Tables ===\n");
        print_tables(&result.tables.iter().collect::<Vec<_>>());
    }

    if !result.charts.is_empty() {
        println!("=== Charts ===\n");
        let max_id = result.charts.iter().map(|c| c.id.len()).max().unwrap_or(10);
        for chart in &result.charts {
            println!(
                "  {:<width$}  {:<24} {}",
                chart.id,
                chart.schema.as_str(),
                chart.title,
                width = max_id
            );
        }
        println!();
    }

    println!("=== Summary ===\n");
    println!(
        "  Pages: {} processed, {} failed",
        report.pages_processed, report.pages_failed
    );
    println!(
        "  Extracted: {} table(s) ({} large), {} chart(s) ({} large)",
        report.table_count, report.large_table_count, report.chart_count, report.large_chart_count
    );
    println!(
        "  Tables with temperature data: {}, with stress data: {}",
        report.tables_with_temperature, report.tables_with_stress
    );
    println!();
    for (label, count) in report.schema_counts.iter().filter(|(_, n)| **n > 0) {
        println!("  {:<24} {}", label.as_str(), count);
    }
    println!();

    if !report.diagnostics.is_empty() {
        println!("  Unclassified candidates:");
        for d in &report.diagnostics {
            let preview = if d.preview.is_empty() {
                String::new()
            } else {
                format!("  [{}]", d.preview.join(" | "))
            };
            println!("    page {} {}: {}{}", d.page, d.kind, d.reason, preview);
        }
        println!();
    }

    let notable: Vec<_> = report
        .issues
        .iter()
        .filter(|i| i.severity != Severity::Info)
        .collect();
    if !notable.is_empty() {
        println!(
            "  {} error(s), {} warning(s):",
            report.error_count, report.warning_count
        );
        for issue in notable {
            let marker = match issue.severity {
                Severity::Error => "error",
                _ => "warning",
            };
            println!("    {marker}: page {}: {}", issue.page, issue.message);
        }
        println!();
    }
}

pub fn print_tables(tables: &[&ExtractedTable]) {
    if tables.is_empty() {
        println!("No matching tables.");
        return;
    }
    let max_id = tables.iter().map(|t| t.id.len()).max().unwrap_or(10);
    for table in tables {
        println!(
            "  {:<width$}  {:<24} {:>4} x {:<3} {}",
            table.id,
            table.schema.as_str(),
            table.metadata.row_count,
            table.metadata.col_count,
            table.title.as_deref().unwrap_or(""),
            width = max_id
        );
    }
    println!();
}

pub fn print_rows(matches: &[RowMatch<'_>]) {
    if matches.is_empty() {
        println!("No matching rows.");
        return;
    }
    for m in matches {
        println!("{} row {} ({})", m.table.id, m.row_index + 1, m.table.schema);
        let max_name = m.row.keys().map(|k| k.len()).max().unwrap_or(10);
        for (column, value) in m.row {
            println!("  {:<width$}  {}", column, value, width = max_name);
        }
        println!();
    }
}

pub fn print_lookups(hits: &[StressLookup]) {
    if hits.is_empty() {
        println!("No stress value found.");
        return;
    }
    let max_material = hits.iter().map(|h| h.material.len()).max().unwrap_or(10);
    for hit in hits {
        let marker = if hit.interpolated { " (interpolated)" } else { "" };
        println!(
            "  {:<width$}  {} at {}°F{}  [{}, {}]",
            hit.material,
            hit.value,
            hit.temperature,
            marker,
            hit.table_id,
            hit.schema,
            width = max_material
        );
    }
}
