//! Formatted terminal output for catalog listings and selection previews.
//!
//! All formatting lives here so output changes stay localized (and covered by
//! golden-string tests).

use crate::app::session::LoadedSelection;
use crate::data::{GroupDetail, GroupSummary};
use crate::domain::{AlignedTable, DateRange, DateStrategy};
use crate::report::summarize_columns;

/// Date format used in previews (exports always use ISO dates).
pub const PREVIEW_DATE_FORMAT: &str = "%Y/%m/%d";

const NAME_WIDTH: usize = 32;
const VALUE_WIDTH: usize = 12;

/// One line per group: catalog name and label.
pub fn format_groups(groups: &[GroupSummary]) -> String {
    let mut out = String::new();
    push_line(&mut out, format!("{:<NAME_WIDTH$} {}", "group", "label"));
    push_line(&mut out, format!("{:-<NAME_WIDTH$} {:-<5}", "", ""));
    for g in groups {
        push_line(&mut out, format!("{:<NAME_WIDTH$} {}", g.name, g.label));
    }
    out
}

/// A group's header followed by its series.
pub fn format_group_detail(detail: &GroupDetail) -> String {
    let mut out = String::new();
    push_line(&mut out, format!("{} ({})", detail.label, detail.name));
    if !detail.description.trim().is_empty() {
        push_line(&mut out, detail.description.trim().to_string());
    }
    out.push('\n');
    push_line(&mut out, format!("{:<NAME_WIDTH$} {}", "series", "label"));
    push_line(&mut out, format!("{:-<NAME_WIDTH$} {:-<5}", "", ""));
    for s in &detail.series {
        push_line(&mut out, format!("{:<NAME_WIDTH$} {}", s.name, s.label));
    }
    out
}

/// Selection header: range, cadence and per-series bookkeeping.
pub fn format_selection_summary(selection: &LoadedSelection, view: &AlignedTable, range: &DateRange) -> String {
    let mut out = String::new();

    out.push_str("=== valet - Selection ===\n");
    out.push_str(&format!("Range: {range} ({} dates)\n", view.len()));
    if let Some(full) = DateRange::full(&selection.table) {
        out.push_str(&format!("Available: {full} ({} dates)\n", selection.table.len()));
    }
    match view.frequency {
        Some(freq) => out.push_str(&format!("Cadence: {freq}\n")),
        None => out.push_str("Cadence: irregular\n"),
    }

    out.push_str("\nSeries:\n");
    let columns = summarize_columns(view);
    for ((meta, stats), col) in selection.metadata.iter().zip(&selection.stats).zip(&columns) {
        out.push_str(&format!("- {} ({})\n", meta.label, meta.name));
        if !meta.description.trim().is_empty() {
            out.push_str(&format!("  {}\n", meta.description.trim()));
        }
        let strategy = match stats.date_strategy {
            DateStrategy::Strict => "iso",
            DateStrategy::Fallback => "fallback",
        };
        out.push_str(&format!(
            "  rows: read={} used={} footnotes={} sentinels={} duplicates={} | dates: {strategy}\n",
            stats.rows_read,
            stats.rows_used(),
            stats.dropped_id,
            stats.dropped_label,
            stats.duplicate_dates,
        ));
        match (col.last, col.min, col.max) {
            (Some((date, last)), Some(min), Some(max)) => out.push_str(&format!(
                "  in range: n={} missing={} | last={last} on {date} | min={min} max={max}\n",
                col.present, col.missing
            )),
            _ => out.push_str("  in range: no observations\n"),
        }
    }

    out
}

/// Table preview: the last `max_rows` dates, `-` for missing values.
pub fn format_table(table: &AlignedTable, max_rows: usize) -> String {
    if table.is_empty() {
        return "(no rows)\n".to_string();
    }

    let mut out = String::new();

    let mut header = format!("{:<10}", "Date");
    let mut rule = format!("{:-<10}", "");
    for col in &table.columns {
        header.push_str(&format!(" {:>VALUE_WIDTH$}", truncate(col, VALUE_WIDTH)));
        rule.push_str(&format!(" {:-<VALUE_WIDTH$}", ""));
    }
    push_line(&mut out, header);
    push_line(&mut out, rule);

    let skip = table.len().saturating_sub(max_rows);
    for (date, row) in table.dates.iter().zip(&table.rows).skip(skip) {
        let mut line = date.format(PREVIEW_DATE_FORMAT).to_string();
        for v in row {
            line.push_str(&format!(" {:>VALUE_WIDTH$}", fmt_cell(*v)));
        }
        push_line(&mut out, line);
    }

    if skip > 0 {
        push_line(&mut out, format!("({} of {} rows shown)", table.len() - skip, table.len()));
    }

    out
}

fn fmt_cell(v: Option<f64>) -> String {
    match v {
        Some(v) => v.to_string(),
        None => "-".to_string(),
    }
}

fn push_line(out: &mut String, line: String) {
    out.push_str(line.trim_end());
    out.push('\n');
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
