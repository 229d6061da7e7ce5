//! Aligned plain-text table of a schema tree's fields.

use std::fmt::Write as _;

use itertools::Itertools;

use crate::tree::NodeSummary;

const HEADERS: [&str; 6] = ["path", "type", "number", "label", "repeat", "columns"];

/// Numeric columns are right-aligned, the rest left-aligned.
const RIGHT_ALIGNED: [bool; 6] = [false, false, true, false, true, false];

pub fn render_summary(nodes: &[NodeSummary]) -> String {
    let rows = nodes.iter().map(summary_cells).collect::<Vec<_>>();
    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(&HEADERS.map(String::from), &widths));
    let separator = widths.map(|w| "-".repeat(w));
    let _ = writeln!(output, "{}", format_row(&separator, &widths));
    for row in &rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

pub fn print_summary(nodes: &[NodeSummary]) {
    print!("{}", render_summary(nodes));
}

fn summary_cells(node: &NodeSummary) -> [String; 6] {
    let type_name = if node.common {
        format!("{} (common)", node.type_name)
    } else {
        node.type_name.clone()
    };
    [
        node.path.clone(),
        type_name,
        node.field_number
            .map(|n| n.to_string())
            .unwrap_or_default(),
        node.label.clone(),
        node.repeated_count.to_string(),
        node.columns.iter().join(" "),
    ]
}

fn format_row(cells: &[String; 6], widths: &[usize; 6]) -> String {
    let line = cells
        .iter()
        .zip(widths)
        .zip(RIGHT_ALIGNED)
        .map(|((cell, &width), right)| {
            let cell = cell.replace(['\n', '\r', '\t'], " ");
            if right {
                format!("{cell:>width$}")
            } else {
                format!("{cell:<width$}")
            }
        })
        .join("  ");
    line.trim_end().to_string()
}
