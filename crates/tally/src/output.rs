//! Plain-text table rendering for report output.

use tally_core::table::MemTable;
use tally_core::value::{DataType, Value};

/// Render a table with a header row, a separator and padded columns.
/// Numeric columns are right aligned; floats print with two decimals.
pub fn render_table(table: &MemTable) -> String {
    let fields = table.schema().fields();

    let header: Vec<String> = fields.iter().map(|f| f.name.clone()).collect();
    let rows: Vec<Vec<String>> = table
        .rows()
        .iter()
        .map(|row| row.iter().map(render_value).collect())
        .collect();

    let mut widths: Vec<usize> = header.iter().map(|name| name.len()).collect();
    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(cell.len());
        }
    }

    let numeric: Vec<bool> = fields
        .iter()
        .map(|f| {
            matches!(
                f.data_type,
                DataType::Int32 | DataType::Int64 | DataType::Float64
            )
        })
        .collect();

    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();

    let mut out = String::new();
    push_line(&mut out, &header, &widths, &numeric);
    push_line(&mut out, &separator, &widths, &numeric);
    for row in &rows {
        push_line(&mut out, row, &widths, &numeric);
    }
    out
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize], numeric: &[bool]) {
    for (idx, cell) in cells.iter().enumerate() {
        if idx > 0 {
            out.push_str("  ");
        }
        let width = widths[idx];
        if numeric[idx] {
            out.push_str(&format!("{cell:>width$}"));
        } else if idx + 1 == cells.len() {
            // skip padding so lines have no trailing whitespace
            out.push_str(cell);
        } else {
            out.push_str(&format!("{cell:<width$}"));
        }
    }
    out.push('\n');
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Float64(v) => format!("{v:.2}"),
        other => other.to_string(),
    }
}
