//! Command-line parsing for the Valet series explorer.
//!
//! Argument parsing lives here; command dispatch lives in [`crate::app`].

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

pub mod picker;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "valet", version, about = "Browse, preview and export Bank of Canada Valet time series")]
pub struct Cli {
    /// Read the catalog from a local mirror of Valet JSON responses instead of the API.
    #[arg(long, global = true, value_name = "DIR")]
    pub offline_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the data groups of the catalog.
    Groups(GroupsArgs),
    /// List the series of one group.
    Series(SeriesArgs),
    /// Fetch series and preview them as a table and a terminal chart.
    Show(ShowArgs),
    /// Fetch series and write them to a CSV file.
    Export(ExportArgs),
    /// Interactive session: pick a group, pick series, preview and export.
    Explore,
}

#[derive(Debug, Args, Clone)]
pub struct GroupsArgs {
    /// Only show groups whose name or label contains this text (case-insensitive).
    #[arg(long)]
    pub filter: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct SeriesArgs {
    /// Group name, e.g. `FX_RATES_DAILY`.
    pub group: String,
}

/// Series selection and date range, shared by `show` and `export`.
#[derive(Debug, Args, Clone)]
pub struct SelectionArgs {
    /// One or more series names, e.g. `FXUSDCAD FXEURCAD`.
    #[arg(required = true, num_args = 1..)]
    pub series: Vec<String>,

    /// First date to keep (YYYY-MM-DD).
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last date to keep (YYYY-MM-DD).
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Keep only the last N dates (ignored when --start is given).
    #[arg(long, value_name = "N")]
    pub last: Option<usize>,
}

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Number of table rows to print (most recent first in time order).
    #[arg(long, default_value_t = 20)]
    pub rows: usize,

    /// Skip the terminal chart.
    #[arg(long)]
    pub no_plot: bool,

    /// Chart width (columns).
    #[arg(long, default_value_t = 80)]
    pub width: usize,

    /// Chart height (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Print the filtered table as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Output path (defaults to a name derived from the selection).
    #[arg(short = 'o', long, value_name = "CSV")]
    pub output: Option<PathBuf>,

    /// Rename a column in the header, `OLD=NEW` (repeatable).
    #[arg(long, value_name = "OLD=NEW", value_parser = parse_rename)]
    pub rename: Vec<(String, String)>,
}

fn parse_rename(raw: &str) -> Result<(String, String), String> {
    let (old, new) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected OLD=NEW, got '{raw}'"))?;
    let (old, new) = (old.trim(), new.trim());
    if old.is_empty() || new.is_empty() {
        return Err(format!("expected OLD=NEW, got '{raw}'"));
    }
    Ok((old.to_string(), new.to_string()))
}
