//! Line-based interactive prompts.
//!
//! Kept separate from clap parsing:
//! - clap handles structured flags/subcommands
//! - the picker drives the `valet explore` session (choose a group, choose series)
//!
//! Prompts are generic over the input/output streams so sessions can be scripted in tests.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use crate::error::AppError;

/// Outcome of a single prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer<T> {
    Value(T),
    /// The user typed `q`.
    Quit,
    /// End of input.
    Eof,
}

pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn output(&mut self) -> &mut W {
        &mut self.output
    }

    /// Print a line to the session output.
    pub fn say(&mut self, text: &str) -> Result<(), AppError> {
        writeln!(self.output, "{text}").map_err(write_error)
    }

    /// Ask a free-form question. Empty answers are returned as an empty string.
    pub fn ask(&mut self, prompt: &str) -> Result<Answer<String>, AppError> {
        write!(self.output, "{prompt}").map_err(write_error)?;
        self.output.flush().map_err(write_error)?;

        let mut line = String::new();
        let bytes = self
            .input
            .read_line(&mut line)
            .map_err(|e| AppError::new(2, format!("Failed to read input: {e}")))?;
        if bytes == 0 {
            return Ok(Answer::Eof);
        }
        let line = line.trim();
        if line.eq_ignore_ascii_case("q") {
            return Ok(Answer::Quit);
        }
        Ok(Answer::Value(line.to_string()))
    }

    /// List `items` and let the user pick exactly one. Re-prompts on invalid input.
    pub fn pick_one(&mut self, title: &str, items: &[String]) -> Result<Answer<usize>, AppError> {
        if items.is_empty() {
            return Err(AppError::new(2, format!("Nothing to choose from: {title}")));
        }
        self.list(title, items)?;
        loop {
            let prompt = format!("Select by number (1-{}), q to quit: ", items.len());
            let input = match self.ask(&prompt)? {
                Answer::Value(v) => v,
                Answer::Quit => return Ok(Answer::Quit),
                Answer::Eof => return Ok(Answer::Eof),
            };
            match parse_selection(&input, items.len()) {
                Ok(picked) if picked.len() == 1 => return Ok(Answer::Value(picked[0])),
                Ok(_) => self.say("Pick a single entry.")?,
                Err(msg) => self.say(&msg)?,
            }
        }
    }

    /// List `items` and let the user pick one or more, e.g. `1,3` or `2-4`.
    pub fn pick_many(&mut self, title: &str, items: &[String]) -> Result<Answer<Vec<usize>>, AppError> {
        if items.is_empty() {
            return Err(AppError::new(2, format!("Nothing to choose from: {title}")));
        }
        self.list(title, items)?;
        loop {
            let prompt = format!("Select one or more (e.g. 1,3 or 2-4; 1-{}), q to quit: ", items.len());
            let input = match self.ask(&prompt)? {
                Answer::Value(v) => v,
                Answer::Quit => return Ok(Answer::Quit),
                Answer::Eof => return Ok(Answer::Eof),
            };
            match parse_selection(&input, items.len()) {
                Ok(picked) => return Ok(Answer::Value(picked)),
                Err(msg) => self.say(&msg)?,
            }
        }
    }

    fn list(&mut self, title: &str, items: &[String]) -> Result<(), AppError> {
        self.say(&format!("{title} ({}):", items.len()))?;
        for (idx, item) in items.iter().enumerate() {
            self.say(&format!("{:>3}) {item}", idx + 1))?;
        }
        Ok(())
    }
}

/// Parse a 1-based selection like `1,3,5-7` into 0-based indices (input order, no duplicates).
pub fn parse_selection(input: &str, len: usize) -> Result<Vec<usize>, String> {
    let mut out: Vec<usize> = Vec::new();
    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (lo, hi) = match part.split_once('-') {
            Some((a, b)) => (parse_choice(a, len)?, parse_choice(b, len)?),
            None => {
                let n = parse_choice(part, len)?;
                (n, n)
            }
        };
        if lo > hi {
            return Err(format!("Invalid range: {part}."));
        }
        for n in lo..=hi {
            if !out.contains(&(n - 1)) {
                out.push(n - 1);
            }
        }
    }
    if out.is_empty() {
        return Err("Nothing selected.".to_string());
    }
    Ok(out)
}

fn parse_choice(raw: &str, len: usize) -> Result<usize, String> {
    let raw = raw.trim();
    match raw.parse::<usize>() {
        Ok(n) if (1..=len).contains(&n) => Ok(n),
        _ => Err(format!("Invalid choice: {raw}. Enter a number between 1 and {len}.")),
    }
}

/// Validate an export destination: must not be a directory and must end in `.csv`.
pub fn validate_export_path(path: &Path) -> Result<PathBuf, AppError> {
    if path.is_dir() {
        return Err(AppError::new(
            2,
            format!("Expected a file, got a directory: {}", path.display()),
        ));
    }
    if path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        != Some(true)
    {
        return Err(AppError::new(
            2,
            format!("Expected a .csv file name (got: {}).", path.display()),
        ));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.is_dir() {
            return Err(AppError::new(
                2,
                format!("Directory does not exist: {}", parent.display()),
            ));
        }
    }
    Ok(path.to_path_buf())
}

fn write_error(e: std::io::Error) -> AppError {
    AppError::new(4, format!("Failed to write prompt: {e}"))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn items() -> Vec<String> {
        vec!["USD/CAD".to_string(), "EUR/CAD".to_string(), "JPY/CAD".to_string()]
    }

    #[test]
    fn selection_syntax() {
        assert_eq!(parse_selection("1,3", 3), Ok(vec![0, 2]));
        assert_eq!(parse_selection("3, 1-2", 3), Ok(vec![2, 0, 1]));
        assert_eq!(parse_selection("2,2", 3), Ok(vec![1]));
        assert!(parse_selection("4", 3).is_err());
        assert!(parse_selection("3-1", 3).is_err());
        assert!(parse_selection(" , ", 3).is_err());
    }

    #[test]
    fn pick_one_reprompts_until_valid() {
        let input = Cursor::new("9\n1,2\n2\n");
        let mut out = Vec::new();
        let answer = Prompter::new(input, &mut out).pick_one("Series", &items()).unwrap();
        assert_eq!(answer, Answer::Value(1));

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Series (3):\n  1) USD/CAD\n"));
        assert!(text.contains("Invalid choice: 9."));
        assert!(text.contains("Pick a single entry."));
    }

    #[test]
    fn pick_many_and_quit() {
        let mut out = Vec::new();
        let answer = Prompter::new(Cursor::new("1,3\n"), &mut out)
            .pick_many("Series", &items())
            .unwrap();
        assert_eq!(answer, Answer::Value(vec![0, 2]));

        let answer = Prompter::new(Cursor::new("q\n"), &mut out)
            .pick_many("Series", &items())
            .unwrap();
        assert_eq!(answer, Answer::Quit);

        let answer = Prompter::new(Cursor::new(""), &mut out)
            .pick_one("Series", &items())
            .unwrap();
        assert_eq!(answer, Answer::Eof);
    }

    #[test]
    fn export_path_rules() {
        assert!(validate_export_path(Path::new("out.csv")).is_ok());
        assert!(validate_export_path(Path::new("out.txt")).is_err());
        assert!(validate_export_path(&std::env::temp_dir()).is_err());
        assert!(validate_export_path(Path::new("/definitely/not/here/out.csv")).is_err());
    }
}
