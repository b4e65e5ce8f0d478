use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use hrb_load::SubmissionOutcome;
use hrb_model::{Diagnostic, WriteSummary};

use crate::types::CommandResult;

/// Diagnostics listed in full; the rest are counted.
const MAX_LISTED_DIAGNOSTICS: usize = 50;

pub fn print_summary(result: &CommandResult) {
    println!("Command: {}", result.command);
    print_write_table(&result.report.writes);
    if let Some(outcome) = &result.outcome {
        print_outcome(outcome);
    }
    print_diagnostic_table(&result.report.diagnostics);
    if let Some(error) = &result.error {
        eprintln!("error: {error}");
    }
}

fn print_write_table(writes: &[WriteSummary]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Target"),
        header_cell("Rows"),
        header_cell("Status"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    let mut total = 0u64;
    for write in writes {
        total += write.rows;
        let status = match &write.failure {
            Some(message) => Cell::new(message).fg(Color::Red),
            None => Cell::new("ok").fg(Color::Green),
        };
        table.add_row(vec![Cell::new(&write.target), Cell::new(write.rows), status]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(total).add_attribute(Attribute::Bold),
        dim_cell("-"),
    ]);
    println!("{table}");
}

fn print_outcome(outcome: &SubmissionOutcome) {
    match outcome {
        SubmissionOutcome::Accepted { status, .. } => {
            println!("Aggregate server accepted the payload (HTTP {status})");
        }
        SubmissionOutcome::Rejected { status, body } => {
            eprintln!("Aggregate server rejected the payload (HTTP {status}):");
            eprintln!("{body}");
        }
    }
}

fn print_diagnostic_table(diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Scope"),
        header_cell("Row"),
        header_cell("Identity"),
        header_cell("Issue"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    for diagnostic in diagnostics.iter().take(MAX_LISTED_DIAGNOSTICS) {
        table.add_row(vec![
            Cell::new(diagnostic.scope),
            diagnostic
                .row
                .map_or_else(|| dim_cell("-"), |row| Cell::new(row + 1)),
            diagnostic
                .identity
                .as_ref()
                .map_or_else(|| dim_cell("-"), Cell::new),
            Cell::new(&diagnostic.issue).fg(Color::Yellow),
        ]);
    }
    println!();
    println!("Skipped ({}):", diagnostics.len());
    println!("{table}");
    if diagnostics.len() > MAX_LISTED_DIAGNOSTICS {
        println!("... and {} more", diagnostics.len() - MAX_LISTED_DIAGNOSTICS);
    }
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(140);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
