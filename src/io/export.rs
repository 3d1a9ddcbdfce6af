//! CSV export (and read-back) of aligned tables.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts:
//! `Date,<col1>,<col2>,...`, ISO dates, one LF-terminated row per date, empty
//! fields for missing values, no BOM.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;

use crate::domain::{AlignedTable, infer_frequency};
use crate::error::{AppError, PipelineError};
use crate::io::ingest::STRICT_DATE_FORMAT;

/// Name of the date column in exported files.
pub const DATE_HEADER: &str = "Date";

/// Serialize a table to CSV text.
///
/// `rename` maps current column labels to export labels; unmapped columns keep
/// their label. Fields are quoted only when they contain a comma, a quote or a
/// line break.
pub fn table_to_csv(
    table: &AlignedTable,
    rename: Option<&HashMap<String, String>>,
) -> Result<String, PipelineError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    let mut header = Vec::with_capacity(table.columns.len() + 1);
    header.push(DATE_HEADER.to_string());
    for col in &table.columns {
        let label = rename.and_then(|m| m.get(col)).unwrap_or(col);
        header.push(label.clone());
    }
    writer.write_record(&header).map_err(csv_error)?;

    for (date, row) in table.dates.iter().zip(&table.rows) {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(date.format(STRICT_DATE_FORMAT).to_string());
        // f64 Display is the shortest text that parses back to the same value.
        record.extend(row.iter().map(|v| v.map(|v| v.to_string()).unwrap_or_default()));
        writer.write_record(&record).map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| PipelineError::Csv(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| PipelineError::Csv(e.to_string()))
}

/// Parse CSV text produced by [`table_to_csv`] back into a table.
///
/// Empty fields become missing values; the cadence is inferred again from the dates.
pub fn table_from_csv(text: &str) -> Result<AlignedTable, PipelineError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::None)
        .from_reader(text.as_bytes());

    let headers = reader.headers().map_err(csv_error)?.clone();
    let first = headers
        .get(0)
        .map(|h| h.trim_start_matches('\u{feff}'))
        .unwrap_or("");
    if !first.eq_ignore_ascii_case(DATE_HEADER) {
        return Err(PipelineError::CsvRow {
            line: 1,
            message: format!("first column must be `{DATE_HEADER}`, found `{first}`"),
        });
    }
    // Labels are kept verbatim; only date and value fields are trimmed.
    let columns: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

    let mut dates: Vec<NaiveDate> = Vec::new();
    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: 1-based lines, header on line 1.
        let line = idx + 2;
        let record = result.map_err(csv_error)?;

        if record.len() != headers.len() {
            return Err(PipelineError::CsvRow {
                line,
                message: format!("expected {} fields, found {}", headers.len(), record.len()),
            });
        }

        let raw_date = record.get(0).unwrap_or("").trim();
        let date = NaiveDate::parse_from_str(raw_date, STRICT_DATE_FORMAT).map_err(|e| {
            PipelineError::CsvRow {
                line,
                message: format!("invalid date '{raw_date}': {e}"),
            }
        })?;
        if let Some(prev) = dates.last() {
            if date <= *prev {
                return Err(PipelineError::CsvRow {
                    line,
                    message: format!("date {date} is not after {prev}"),
                });
            }
        }

        let mut row = Vec::with_capacity(columns.len());
        for (col, field) in columns.iter().zip(record.iter().skip(1).map(str::trim)) {
            if field.is_empty() {
                row.push(None);
                continue;
            }
            let v = field
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| PipelineError::CsvRow {
                    line,
                    message: format!("invalid value '{field}' in column `{col}`"),
                })?;
            row.push(Some(v));
        }

        dates.push(date);
        rows.push(row);
    }

    let frequency = infer_frequency(&dates);
    AlignedTable::new(dates, columns, rows, frequency)
}

/// Default download file name, with spaces replaced by underscores.
///
/// A single series is named by its label. Several series are named by the
/// group they were picked from, or by their catalog names joined with `_`
/// when there is no group.
pub fn export_file_name(names: &[String], labels: &[String], group: Option<&str>) -> String {
    let stem = match (labels, group) {
        ([label], _) => label.replace(' ', "_"),
        (_, Some(group)) if !group.trim().is_empty() => group.trim().replace(' ', "_"),
        _ if names.is_empty() => "selection".to_string(),
        _ => names.join("_"),
    };
    let stem: String = stem
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '-' } else { c })
        .collect();
    format!("{stem}.csv")
}

/// Write CSV text to a file.
pub fn write_csv_file(path: &Path, csv_text: &str) -> Result<(), AppError> {
    fs::write(path, csv_text)
        .map_err(|e| AppError::new(4, format!("Failed to write export CSV '{}': {e}", path.display())))?;
    tracing::info!(path = %path.display(), bytes = csv_text.len(), "wrote export CSV");
    Ok(())
}

/// Read a previously exported CSV file.
pub fn read_csv_file(path: &Path) -> Result<AlignedTable, AppError> {
    let text = fs::read_to_string(path)
        .map_err(|e| AppError::new(4, format!("Failed to open CSV '{}': {e}", path.display())))?;
    Ok(table_from_csv(&text)?)
}

fn csv_error(e: csv::Error) -> PipelineError {
    PipelineError::Csv(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Frequency;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn table() -> AlignedTable {
        AlignedTable {
            dates: vec![d(2020, 1, 1), d(2020, 1, 2), d(2020, 1, 3)],
            columns: vec!["USD/CAD".to_string(), "EUR, CAD".to_string()],
            rows: vec![
                vec![Some(1.2994), None],
                vec![Some(1.3), Some(1.4553)],
                vec![None, Some(-0.5)],
            ],
            frequency: Some(Frequency::Daily),
        }
    }

    #[test]
    fn csv_layout_golden() {
        let text = table_to_csv(&table(), None).unwrap();
        let expected = concat!(
            "Date,USD/CAD,\"EUR, CAD\"\n",
            "2020-01-01,1.2994,\n",
            "2020-01-02,1.3,1.4553\n",
            "2020-01-03,,-0.5\n",
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn rename_applies_only_to_mapped_columns() {
        let mut rename = HashMap::new();
        rename.insert("USD/CAD".to_string(), "usd_cad".to_string());
        let text = table_to_csv(&table(), Some(&rename)).unwrap();
        assert!(text.starts_with("Date,usd_cad,\"EUR, CAD\"\n"));
    }

    #[test]
    fn csv_read_back_restores_missing_markers() {
        let original = table();
        let text = table_to_csv(&original, None).unwrap();
        let parsed = table_from_csv(&text).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn read_rejects_bad_header_and_unsorted_dates() {
        let err = table_from_csv("When,A\n2020-01-01,1\n").unwrap_err();
        assert!(matches!(err, PipelineError::CsvRow { line: 1, .. }));

        let err = table_from_csv("Date,A\n2020-01-02,1\n2020-01-01,2\n").unwrap_err();
        assert!(matches!(err, PipelineError::CsvRow { line: 3, .. }));

        let err = table_from_csv("Date,A\n2020-01-01,abc\n").unwrap_err();
        assert!(matches!(err, PipelineError::CsvRow { line: 2, .. }));
    }

    #[test]
    fn read_keeps_padded_labels_and_trims_values() {
        let parsed = table_from_csv("Date,CORRA , 10Y\n2020-01-01, 2.25 ,\n").unwrap();
        assert_eq!(parsed.columns, vec!["CORRA ".to_string(), " 10Y".to_string()]);
        assert_eq!(parsed.rows, vec![vec![Some(2.25), None]]);
    }

    #[test]
    fn read_tolerates_bom() {
        let parsed = table_from_csv("\u{feff}Date,A\n2020-01-01,1\n").unwrap();
        assert_eq!(parsed.columns, vec!["A".to_string()]);
        assert_eq!(parsed.rows, vec![vec![Some(1.0)]]);
    }

    #[test]
    fn file_names() {
        let names = vec!["FXUSDCAD".to_string()];
        let labels = vec!["USD to CAD".to_string()];
        assert_eq!(export_file_name(&names, &labels, None), "USD_to_CAD.csv");
        assert_eq!(
            export_file_name(&names, &labels, Some("Exchange rates")),
            "USD_to_CAD.csv"
        );

        let names = vec!["FXUSDCAD".to_string(), "FXEURCAD".to_string()];
        let labels = vec!["USD/CAD".to_string(), "EUR/CAD".to_string()];
        assert_eq!(export_file_name(&names, &labels, None), "FXUSDCAD_FXEURCAD.csv");
        assert_eq!(
            export_file_name(&names, &labels, Some("Daily exchange rates")),
            "Daily_exchange_rates.csv"
        );
        assert_eq!(export_file_name(&names, &labels, Some("  ")), "FXUSDCAD_FXEURCAD.csv");

        let labels = vec!["USD/CAD".to_string()];
        assert_eq!(export_file_name(&names[..1], &labels, None), "USD-CAD.csv");
        assert_eq!(export_file_name(&names, &[], Some("Rates: CAD/USD")), "Rates-_CAD-USD.csv");
    }
}
