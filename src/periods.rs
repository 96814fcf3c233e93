use std::sync::LazyLock;

use chrono::{Datelike, Days, NaiveDate};
use regex::Regex;

use crate::classify::sheet_name_parts;
use crate::decode::{expand_year, parse_full_date};
use crate::models::{DateSource, Period};
use crate::workbook::Grid;

static DATE_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Date\s+Range:\s*(\d{1,2}/\d{1,2}/\d{4})\s*[-–]\s*(\d{1,2}/\d{1,2}/\d{4})")
        .expect("date range pattern")
});

/// An explicit `Date Range:` header cell wins over the sheet name.
pub fn extract_period(grid: &Grid, sheet_name: &str, period_length_days: i64) -> Period {
    if let Some((start_date, end_date)) = header_date_range(grid) {
        return Period {
            period_name: sheet_name.to_owned(),
            start_date,
            end_date,
            date_source: DateSource::DateRange,
        };
    }

    let start_date = start_from_sheet_name(sheet_name);
    let span = u64::try_from(period_length_days.max(1) - 1).unwrap_or(0);
    let end_date = start_date
        .checked_add_days(Days::new(span))
        .unwrap_or(NaiveDate::MAX);
    log::debug!("period {sheet_name:?} dated from its sheet name");
    Period {
        period_name: sheet_name.to_owned(),
        start_date,
        end_date,
        date_source: DateSource::SheetName,
    }
}

fn header_date_range(grid: &Grid) -> Option<(NaiveDate, NaiveDate)> {
    grid.header().iter().find_map(|cell| {
        let text = cell.as_text();
        let caps = DATE_RANGE.captures(&text)?;
        let start = parse_full_date(&caps[1])?;
        let end = parse_full_date(&caps[2])?;
        (end >= start).then_some((start, end))
    })
}

/// Reads `M-D-YY` from the sheet name, clamping an impossible month or day.
fn start_from_sheet_name(sheet_name: &str) -> NaiveDate {
    let (month, day, year) = sheet_name_parts(sheet_name).unwrap_or((1, 1, 0));
    let year = expand_year(year);
    let month = month.clamp(1, 12);
    let day = day.clamp(1, days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map_or(28, |last| last.day())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::Cell;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn explicit_date_range_wins() {
        let grid = Grid::from_rows(vec![vec![
            Cell::from("Field"),
            Cell::from("Date Range: 04/29/2024 - 05/12/2024"),
        ]]);
        let period = extract_period(&grid, "5-1-24", 14);
        assert_eq!(period.period_name, "5-1-24");
        assert_eq!(period.start_date, date(2024, 4, 29));
        assert_eq!(period.end_date, date(2024, 5, 12));
        assert_eq!(period.date_source, DateSource::DateRange);
    }

    #[test]
    fn falls_back_to_sheet_name_plus_thirteen_days() {
        let period = extract_period(&Grid::default(), "5-1-24", 14);
        assert_eq!(period.start_date, date(2024, 5, 1));
        assert_eq!(period.end_date, date(2024, 5, 14));
        assert_eq!(period.date_source, DateSource::SheetName);

        let long_year = extract_period(&Grid::default(), "12-25-2023", 14);
        assert_eq!(long_year.end_date, date(2024, 1, 7));
    }

    #[test]
    fn inverted_or_malformed_range_uses_fallback() {
        let inverted = Grid::from_rows(vec![vec![Cell::from(
            "Date Range: 05/14/2024 - 05/01/2024",
        )]]);
        assert_eq!(
            extract_period(&inverted, "5-1-24", 14).date_source,
            DateSource::SheetName
        );

        let malformed = Grid::from_rows(vec![vec![Cell::from(
            "Date Range: 02/30/2024 - 03/12/2024",
        )]]);
        assert_eq!(extract_period(&malformed, "5-1-24", 14).start_date, date(2024, 5, 1));
    }

    #[test]
    fn impossible_sheet_dates_are_clamped() {
        let period = extract_period(&Grid::default(), "2-30-24", 14);
        assert_eq!(period.start_date, date(2024, 2, 29));
        assert_eq!(period.period_name, "2-30-24");

        let period = extract_period(&Grid::default(), "13-1-23", 14);
        assert_eq!(period.start_date, date(2023, 12, 1));
    }

    #[test]
    fn period_length_is_configurable() {
        let period = extract_period(&Grid::default(), "5-1-24", 7);
        assert_eq!(period.end_date, date(2024, 5, 7));
    }

    #[test]
    fn oversized_period_length_clamps_end_date() {
        let period = extract_period(&Grid::default(), "5-1-24", i64::MAX);
        assert_eq!(period.start_date, date(2024, 5, 1));
        assert_eq!(period.end_date, NaiveDate::MAX);
    }
}
