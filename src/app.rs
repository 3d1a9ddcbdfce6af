//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and loads configuration
//! - sets up logging
//! - opens the catalog (Valet API or local mirror)
//! - dispatches to the command handlers

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::picker::{Prompter, validate_export_path};
use crate::cli::{Cli, Command, ExportArgs, GroupsArgs, SeriesArgs, ShowArgs};
use crate::config::{DEFAULT_LOG_FILTER, ExplorerConfig, open_source};
use crate::data::{SeriesSource, visible_groups};
use crate::domain::{AlignedTable, DateRange};
use crate::error::{AppError, RangeError};
use crate::io::{export_file_name, write_csv_file};
use crate::pipeline::SeriesIngestionPipeline;

pub mod explore;
pub mod session;

use session::{LoadedSelection, load_selection};

const SUBCOMMANDS: [&str; 5] = ["groups", "series", "show", "export", "explore"];

/// Entry point for the `valet` binary.
pub fn run() -> Result<(), AppError> {
    // `valet` and `valet --offline-dir DIR` behave like `valet explore ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = Cli::parse_from(argv);

    let config = ExplorerConfig::from_env()?.with_offline_dir(cli.offline_dir.clone());
    init_logging(&config);

    let source = open_source(&config)?;
    let pipeline = SeriesIngestionPipeline::new();

    match cli.command {
        Command::Groups(args) => handle_groups(source.as_ref(), &args),
        Command::Series(args) => handle_series(source.as_ref(), &args),
        Command::Show(args) => handle_show(source.as_ref(), &pipeline, &args),
        Command::Export(args) => handle_export(source.as_ref(), &pipeline, &args),
        Command::Explore => handle_explore(source.as_ref(), pipeline),
    }
}

/// Install the stderr subscriber. Returns `false` when one was already set.
fn init_logging(config: &ExplorerConfig) -> bool {
    let filter = match &config.log_filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };
    // Logs go to stderr so stdout stays clean for tables and JSON.
    match tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
    {
        Ok(()) => true,
        Err(err) => {
            // The subscriber already in place keeps receiving events.
            tracing::debug!(error = %err, "logging already initialized");
            false
        }
    }
}

fn handle_groups(source: &dyn SeriesSource, args: &GroupsArgs) -> Result<(), AppError> {
    let mut groups = visible_groups(source.list_groups()?);
    if let Some(needle) = args.filter.as_deref().map(str::to_lowercase) {
        groups.retain(|g| g.name.to_lowercase().contains(&needle) || g.label.to_lowercase().contains(&needle));
    }
    print!("{}", crate::report::format_groups(&groups));
    Ok(())
}

fn handle_series(source: &dyn SeriesSource, args: &SeriesArgs) -> Result<(), AppError> {
    let detail = source.group_detail(args.group.trim())?;
    print!("{}", crate::report::format_group_detail(&detail));
    Ok(())
}

fn handle_show(source: &dyn SeriesSource, pipeline: &SeriesIngestionPipeline, args: &ShowArgs) -> Result<(), AppError> {
    let selection = load_selection(source, pipeline, &args.selection.series)?;
    let (range, view) = select_range(pipeline, &selection, &args.selection)?;

    if args.json {
        let json = serde_json::to_string_pretty(&view)
            .map_err(|e| AppError::new(4, format!("Failed to encode table as JSON: {e}")))?;
        println!("{json}");
        return Ok(());
    }

    println!("{}", crate::report::format_selection_summary(&selection, &view, &range));
    println!("{}", crate::report::format_table(&view, args.rows));
    if !args.no_plot {
        println!("{}", crate::plot::render_ascii_chart(&view, args.width, args.height));
    }
    Ok(())
}

fn handle_export(
    source: &dyn SeriesSource,
    pipeline: &SeriesIngestionPipeline,
    args: &ExportArgs,
) -> Result<(), AppError> {
    let selection = load_selection(source, pipeline, &args.selection.series)?;
    let (_, view) = select_range(pipeline, &selection, &args.selection)?;

    let rename = rename_map(&selection, &args.rename);
    let text = pipeline.to_csv(&view, Some(&rename))?;

    let path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(export_file_name(&selection.names(), &selection.labels(), None)));
    let path = validate_export_path(&path)?;
    write_csv_file(&path, &text)?;

    println!("Wrote {} rows x {} series to {}", view.len(), view.columns.len(), path.display());
    Ok(())
}

fn handle_explore(source: &dyn SeriesSource, pipeline: SeriesIngestionPipeline) -> Result<(), AppError> {
    let mut prompter = Prompter::new(io::stdin().lock(), io::stdout());
    explore::Explorer::new(source, pipeline).run(&mut prompter)
}

fn select_range(
    pipeline: &SeriesIngestionPipeline,
    selection: &LoadedSelection,
    args: &crate::cli::SelectionArgs,
) -> Result<(DateRange, AlignedTable), AppError> {
    let range = resolve_range(&selection.table, args.start, args.end, args.last)?;
    let view = pipeline.filter_range(&selection.table, &range)?;
    Ok((range, view))
}

/// Turn optional bounds into a concrete range over `table`.
///
/// - explicit bounds win
/// - otherwise `last` keeps the trailing `last` dates
/// - otherwise the whole table
///
/// Bounds are only checked for order here; `filter_range` checks them against the table.
pub fn resolve_range(
    table: &AlignedTable,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    last: Option<usize>,
) -> Result<DateRange, AppError> {
    let full = DateRange::full(table).ok_or(RangeError::EmptyTable)?;
    let start = match (start, last) {
        (Some(start), _) => start,
        (None, Some(n)) => DateRange::trailing(table, n).map_or(full.start(), |r| r.start()),
        (None, None) => full.start(),
    };
    let end = end.unwrap_or(full.end());
    Ok(DateRange::new(start, end)?)
}

/// `--rename OLD=NEW` pairs keyed by column label; `OLD` may also be a catalog name.
fn rename_map(selection: &LoadedSelection, pairs: &[(String, String)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(old, new)| {
            let label = selection
                .metadata
                .iter()
                .find(|m| m.name.eq_ignore_ascii_case(old))
                .map_or_else(|| old.clone(), |m| m.label.clone());
            (label, new.clone())
        })
        .collect()
}

/// Rewrite argv so `valet` defaults to `valet explore`.
///
/// Rules:
/// - `valet`                       -> `valet explore`
/// - `valet --offline-dir DIR`     -> `valet --offline-dir DIR explore`
/// - `valet --help/--version/-h`   -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    if needs_default_command(&argv) {
        argv.push("explore".to_string());
    }
    argv
}

fn needs_default_command(argv: &[String]) -> bool {
    let mut iter = argv.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" | "-V" | "--version" | "help" => return false,
            "--offline-dir" => {
                iter.next();
            }
            other if SUBCOMMANDS.contains(&other) => return false,
            _ => {}
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::session::tests::FakeSource;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn table() -> AlignedTable {
        AlignedTable {
            dates: vec![d(2020, 1, 1), d(2020, 1, 2), d(2020, 1, 3), d(2020, 1, 6)],
            columns: vec!["A".to_string()],
            rows: vec![vec![Some(1.0)]; 4],
            frequency: None,
        }
    }

    #[test]
    fn default_command_is_explore() {
        assert_eq!(rewrite_args(args(&["valet"])), args(&["valet", "explore"]));
        assert_eq!(
            rewrite_args(args(&["valet", "--offline-dir", "show"])),
            args(&["valet", "--offline-dir", "show", "explore"])
        );
        assert_eq!(rewrite_args(args(&["valet", "--help"])), args(&["valet", "--help"]));
        assert_eq!(rewrite_args(args(&["valet", "groups"])), args(&["valet", "groups"]));
    }

    #[test]
    fn range_resolution() {
        let t = table();
        let full = resolve_range(&t, None, None, None).unwrap();
        assert_eq!((full.start(), full.end()), (d(2020, 1, 1), d(2020, 1, 6)));

        let last = resolve_range(&t, None, None, Some(2)).unwrap();
        assert_eq!(last.start(), d(2020, 1, 3));

        let explicit = resolve_range(&t, Some(d(2020, 1, 2)), None, Some(1)).unwrap();
        assert_eq!((explicit.start(), explicit.end()), (d(2020, 1, 2), d(2020, 1, 6)));

        let err = resolve_range(&t, Some(d(2020, 1, 6)), Some(d(2020, 1, 1)), None).unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let err = resolve_range(&AlignedTable::default(), None, None, None).unwrap_err();
        assert_eq!(err.message(), "the table has no dates to filter");
    }

    #[test]
    fn rename_accepts_labels_and_catalog_names() {
        let source = FakeSource::new();
        let selection = load_selection(
            &source,
            &SeriesIngestionPipeline::new(),
            &args(&["FXUSDCAD", "FXEURCAD"]),
        )
        .unwrap();
        let map = rename_map(
            &selection,
            &[
                ("fxusdcad".to_string(), "usd".to_string()),
                ("EUR/CAD".to_string(), "eur".to_string()),
            ],
        );
        assert_eq!(map.get("USD/CAD").map(String::as_str), Some("usd"));
        assert_eq!(map.get("EUR/CAD").map(String::as_str), Some("eur"));
    }

    #[test]
    fn out_of_bounds_range_is_rejected_by_filter() {
        let source = FakeSource::new();
        let pipeline = SeriesIngestionPipeline::new();
        let selection = load_selection(&source, &pipeline, &args(&["FXUSDCAD"])).unwrap();
        let selection_args = crate::cli::SelectionArgs {
            series: args(&["FXUSDCAD"]),
            start: Some(d(2019, 12, 1)),
            end: None,
            last: None,
        };
        let err = select_range(&pipeline, &selection, &selection_args).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().starts_with("start date 2019-12-01 must be within"));
    }

    #[test]
    fn second_logging_init_keeps_the_first_subscriber() {
        let config = ExplorerConfig {
            log_filter: Some("debug".to_string()),
            ..ExplorerConfig::default()
        };
        init_logging(&config);
        assert!(!init_logging(&config));
    }
}
