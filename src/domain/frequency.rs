//! Calendar cadence detection for a date axis.
//!
//! Detection is best-effort and purely informational: an irregular axis (holiday
//! gaps in a daily series, a missing month, ...) simply yields `None`.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;

/// Regular cadence of a date axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Frequency {
    Daily,
    /// Monday to Friday, no weekday skipped.
    BusinessDaily,
    /// Every 7 days, anchored on the weekday of the observations.
    Weekly(Weekday),
    MonthStart,
    MonthEnd,
    QuarterStart,
    QuarterEnd,
    YearStart,
    YearEnd,
}

impl Frequency {
    /// Short offset-style code (`D`, `B`, `W-FRI`, `MS`, `M`, ...).
    pub fn code(&self) -> String {
        match self {
            Frequency::Daily => "D".to_string(),
            Frequency::BusinessDaily => "B".to_string(),
            Frequency::Weekly(day) => format!("W-{}", weekday_code(*day)),
            Frequency::MonthStart => "MS".to_string(),
            Frequency::MonthEnd => "M".to_string(),
            Frequency::QuarterStart => "QS".to_string(),
            Frequency::QuarterEnd => "Q".to_string(),
            Frequency::YearStart => "AS".to_string(),
            Frequency::YearEnd => "A".to_string(),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::BusinessDaily => "business daily",
            Frequency::Weekly(_) => "weekly",
            Frequency::MonthStart => "monthly (month start)",
            Frequency::MonthEnd => "monthly (month end)",
            Frequency::QuarterStart => "quarterly (quarter start)",
            Frequency::QuarterEnd => "quarterly (quarter end)",
            Frequency::YearStart => "annual (year start)",
            Frequency::YearEnd => "annual (year end)",
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.display_name(), self.code())
    }
}

fn weekday_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MON",
        Weekday::Tue => "TUE",
        Weekday::Wed => "WED",
        Weekday::Thu => "THU",
        Weekday::Fri => "FRI",
        Weekday::Sat => "SAT",
        Weekday::Sun => "SUN",
    }
}

/// Infer the cadence of a strictly increasing date axis.
///
/// At least three dates are needed; fewer leaves the cadence unknown.
pub fn infer_frequency(dates: &[NaiveDate]) -> Option<Frequency> {
    if dates.len() < 3 {
        return None;
    }

    let gaps: Vec<i64> = dates.windows(2).map(|w| (w[1] - w[0]).num_days()).collect();
    if gaps.iter().any(|g| *g <= 0) {
        return None;
    }

    if gaps.iter().all(|g| *g == 1) {
        return Some(Frequency::Daily);
    }
    if gaps.iter().all(|g| *g == 7) {
        return Some(Frequency::Weekly(dates[0].weekday()));
    }
    if is_business_daily(dates) {
        return Some(Frequency::BusinessDaily);
    }

    infer_monthly(dates)
}

fn is_business_daily(dates: &[NaiveDate]) -> bool {
    let is_weekend = |d: &NaiveDate| matches!(d.weekday(), Weekday::Sat | Weekday::Sun);
    if dates.iter().any(is_weekend) {
        return false;
    }
    dates.windows(2).all(|w| {
        let gap = (w[1] - w[0]).num_days();
        match w[0].weekday() {
            Weekday::Fri => gap == 3,
            _ => gap == 1,
        }
    })
}

fn infer_monthly(dates: &[NaiveDate]) -> Option<Frequency> {
    let month_index = |d: &NaiveDate| d.year() as i64 * 12 + d.month0() as i64;

    let step = month_index(&dates[1]) - month_index(&dates[0]);
    if !matches!(step, 1 | 3 | 12) {
        return None;
    }
    if dates.windows(2).any(|w| month_index(&w[1]) - month_index(&w[0]) != step) {
        return None;
    }

    let starts = dates.iter().all(|d| d.day() == 1);
    let ends = dates.iter().all(is_month_end);

    match (step, starts, ends) {
        (1, true, _) => Some(Frequency::MonthStart),
        (1, _, true) => Some(Frequency::MonthEnd),
        (3, true, _) => Some(Frequency::QuarterStart),
        (3, _, true) => Some(Frequency::QuarterEnd),
        (12, true, _) => Some(Frequency::YearStart),
        (12, _, true) => Some(Frequency::YearEnd),
        _ => None,
    }
}

fn is_month_end(d: &NaiveDate) -> bool {
    match d.succ_opt() {
        Some(next) => next.month() != d.month(),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn too_few_dates_is_unknown() {
        assert_eq!(infer_frequency(&[]), None);
        assert_eq!(infer_frequency(&[d(2020, 1, 1), d(2020, 1, 2)]), None);
    }

    #[test]
    fn detects_daily_and_weekly() {
        let daily = [d(2020, 1, 1), d(2020, 1, 2), d(2020, 1, 3)];
        assert_eq!(infer_frequency(&daily), Some(Frequency::Daily));

        let weekly = [d(2020, 1, 3), d(2020, 1, 10), d(2020, 1, 17)];
        assert_eq!(infer_frequency(&weekly), Some(Frequency::Weekly(Weekday::Fri)));
        assert_eq!(Frequency::Weekly(Weekday::Fri).code(), "W-FRI");
    }

    #[test]
    fn detects_business_days_across_weekend() {
        // Thu, Fri, Mon, Tue
        let dates = [d(2020, 1, 2), d(2020, 1, 3), d(2020, 1, 6), d(2020, 1, 7)];
        assert_eq!(infer_frequency(&dates), Some(Frequency::BusinessDaily));
    }

    #[test]
    fn holiday_gap_is_irregular() {
        // Mon, Tue, Thu: Wednesday missing.
        let dates = [d(2020, 1, 6), d(2020, 1, 7), d(2020, 1, 9)];
        assert_eq!(infer_frequency(&dates), None);
    }

    #[test]
    fn detects_month_quarter_and_year_anchors() {
        let ms = [d(2020, 1, 1), d(2020, 2, 1), d(2020, 3, 1)];
        assert_eq!(infer_frequency(&ms), Some(Frequency::MonthStart));

        let me = [d(2020, 1, 31), d(2020, 2, 29), d(2020, 3, 31)];
        assert_eq!(infer_frequency(&me), Some(Frequency::MonthEnd));

        let qs = [d(2019, 10, 1), d(2020, 1, 1), d(2020, 4, 1)];
        assert_eq!(infer_frequency(&qs), Some(Frequency::QuarterStart));

        let ye = [d(2018, 12, 31), d(2019, 12, 31), d(2020, 12, 31)];
        assert_eq!(infer_frequency(&ye), Some(Frequency::YearEnd));
    }

    #[test]
    fn mid_month_or_skipped_month_is_irregular() {
        let mid = [d(2020, 1, 15), d(2020, 2, 15), d(2020, 3, 15)];
        assert_eq!(infer_frequency(&mid), None);

        let skipped = [d(2020, 1, 1), d(2020, 2, 1), d(2020, 4, 1)];
        assert_eq!(infer_frequency(&skipped), None);
    }
}
