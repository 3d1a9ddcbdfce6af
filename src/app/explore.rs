//! `valet explore`: the interactive session.
//!
//! Pick a group, pick one or more of its series, then preview, narrow the date
//! range, export, or go back and pick again. Loaded selections are memoized for
//! the lifetime of the session.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use chrono::NaiveDate;

use crate::app::resolve_range;
use crate::app::session::{LoadedSelection, SelectionCache, SelectionKey, load_selection};
use crate::cli::picker::{Answer, Prompter, validate_export_path};
use crate::data::{SeriesSource, visible_groups};
use crate::domain::{AlignedTable, DateRange};
use crate::error::AppError;
use crate::io::{STRICT_DATE_FORMAT, export_file_name, write_csv_file};
use crate::pipeline::SeriesIngestionPipeline;
use crate::plot::render_ascii_chart;
use crate::report::{format_selection_summary, format_table};

/// Observations shown when a selection is first loaded.
pub const DEFAULT_TRAILING_DATES: usize = 24;

const PREVIEW_ROWS: usize = 12;
const CHART_WIDTH: usize = 72;
const CHART_HEIGHT: usize = 16;

enum Next {
    Series,
    Group,
    Quit,
}

pub struct Explorer<'a> {
    source: &'a dyn SeriesSource,
    pipeline: SeriesIngestionPipeline,
    cache: SelectionCache,
}

impl<'a> Explorer<'a> {
    pub fn new(source: &'a dyn SeriesSource, pipeline: SeriesIngestionPipeline) -> Self {
        Self {
            source,
            pipeline,
            cache: SelectionCache::new(),
        }
    }

    pub fn cache(&self) -> &SelectionCache {
        &self.cache
    }

    pub fn run<R: BufRead, W: Write>(&mut self, prompter: &mut Prompter<R, W>) -> Result<(), AppError> {
        let groups = visible_groups(self.source.list_groups()?);
        let group_items: Vec<String> = groups.iter().map(|g| format!("{} ({})", g.label, g.name)).collect();

        loop {
            let group = match prompter.pick_one("Data groups", &group_items)? {
                Answer::Value(idx) => &groups[idx],
                Answer::Quit | Answer::Eof => break,
            };
            let detail = self.source.group_detail(&group.name)?;
            let series_items: Vec<String> = detail
                .series
                .iter()
                .map(|s| format!("{} ({})", s.label, s.name))
                .collect();

            let next = loop {
                let picked = match prompter.pick_many(&format!("Series in {}", detail.label), &series_items)? {
                    Answer::Value(picked) => picked,
                    Answer::Quit | Answer::Eof => break Next::Quit,
                };
                let names: Vec<String> = picked.iter().map(|&i| detail.series[i].name.clone()).collect();

                let selection = match self.load(&names) {
                    Ok(selection) => selection,
                    Err(err) => {
                        prompter.say(&format!("Could not load selection: {err}"))?;
                        continue;
                    }
                };

                match self.session(prompter, &selection, &detail.label)? {
                    Next::Series => continue,
                    other => break other,
                }
            };

            match next {
                Next::Group | Next::Series => continue,
                Next::Quit => break,
            }
        }

        tracing::debug!(
            hits = self.cache.hits(),
            misses = self.cache.misses(),
            "explore session finished"
        );
        Ok(())
    }

    fn load(&mut self, names: &[String]) -> Result<LoadedSelection, AppError> {
        let key = SelectionKey::today(self.source.name(), names);
        let (source, pipeline) = (self.source, &self.pipeline);
        self.cache
            .get_or_load(key, || load_selection(source, pipeline, names))
            .cloned()
    }

    /// Preview / range / export loop for one loaded selection.
    fn session<R: BufRead, W: Write>(
        &self,
        prompter: &mut Prompter<R, W>,
        selection: &LoadedSelection,
        group_label: &str,
    ) -> Result<Next, AppError> {
        let Some(mut range) = DateRange::trailing(&selection.table, DEFAULT_TRAILING_DATES) else {
            prompter.say("The selected series have no observations.")?;
            return Ok(Next::Series);
        };
        let mut view = self.pipeline.filter_range(&selection.table, &range)?;
        show(prompter, selection, &view, &range)?;

        loop {
            let choice = match prompter.ask("[r]ange, [e]xport, [s]eries, [g]roup, [q]uit: ")? {
                Answer::Value(v) => v.to_ascii_lowercase(),
                Answer::Quit | Answer::Eof => return Ok(Next::Quit),
            };
            match choice.as_str() {
                "r" | "range" => {
                    let Some((new_range, new_view)) = self.ask_range(prompter, &selection.table)? else {
                        continue;
                    };
                    range = new_range;
                    view = new_view;
                    show(prompter, selection, &view, &range)?;
                }
                "e" | "export" => self.export(prompter, selection, &view, group_label)?,
                "s" | "series" => return Ok(Next::Series),
                "g" | "group" => return Ok(Next::Group),
                other => prompter.say(&format!("Unknown command: {other}"))?,
            }
        }
    }

    fn ask_range<R: BufRead, W: Write>(
        &self,
        prompter: &mut Prompter<R, W>,
        table: &AlignedTable,
    ) -> Result<Option<(DateRange, AlignedTable)>, AppError> {
        let start = match ask_date(prompter, "Start date (YYYY-MM-DD, empty for first): ")? {
            Some(v) => v,
            None => return Ok(None),
        };
        let end = match ask_date(prompter, "End date (YYYY-MM-DD, empty for last): ")? {
            Some(v) => v,
            None => return Ok(None),
        };

        let filtered = resolve_range(table, start, end, None)
            .and_then(|range| Ok((range, self.pipeline.filter_range(table, &range)?)));
        match filtered {
            Ok(found) => Ok(Some(found)),
            Err(err) => {
                prompter.say(&err.to_string())?;
                Ok(None)
            }
        }
    }

    fn export<R: BufRead, W: Write>(
        &self,
        prompter: &mut Prompter<R, W>,
        selection: &LoadedSelection,
        view: &AlignedTable,
        group_label: &str,
    ) -> Result<(), AppError> {
        let default_name = export_file_name(&selection.names(), &selection.labels(), Some(group_label));
        let path = match prompter.ask(&format!("File name [{default_name}]: "))? {
            Answer::Value(v) if v.is_empty() => PathBuf::from(&default_name),
            Answer::Value(v) => PathBuf::from(v),
            Answer::Quit | Answer::Eof => return Ok(()),
        };

        let written = validate_export_path(&path).and_then(|path| {
            let text = self.pipeline.to_csv(view, None)?;
            write_csv_file(&path, &text)?;
            Ok(path)
        });
        match written {
            Ok(path) => prompter.say(&format!("Wrote {} rows to {}", view.len(), path.display())),
            Err(err) => prompter.say(&err.to_string()),
        }
    }
}

fn show<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    selection: &LoadedSelection,
    view: &AlignedTable,
    range: &DateRange,
) -> Result<(), AppError> {
    prompter.say(&format_selection_summary(selection, view, range))?;
    prompter.say(&format_table(view, PREVIEW_ROWS))?;
    prompter.say(&render_ascii_chart(view, CHART_WIDTH, CHART_HEIGHT))
}

/// `Some(None)` for an empty answer, `None` when the user gave up.
fn ask_date<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    prompt: &str,
) -> Result<Option<Option<NaiveDate>>, AppError> {
    loop {
        let raw = match prompter.ask(prompt)? {
            Answer::Value(v) => v,
            Answer::Quit | Answer::Eof => return Ok(None),
        };
        if raw.is_empty() {
            return Ok(Some(None));
        }
        match NaiveDate::parse_from_str(&raw, STRICT_DATE_FORMAT) {
            Ok(date) => return Ok(Some(Some(date))),
            Err(_) => prompter.say(&format!("Invalid date '{raw}', expected YYYY-MM-DD."))?,
        }
    }
}
