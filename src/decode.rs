use std::sync::LazyLock;

use chrono::{Datelike, Duration, NaiveDate, Utc};
use regex::Regex;
use serde::Serialize;

use crate::workbook::Cell;

static TERMINAL_SUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"=\s*(\d+)").expect("terminal sum pattern"));
static LEADING_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)").expect("leading digits pattern"));
static ZERO_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bzero\b").expect("zero pattern"));

static INJURIES: LazyLock<[Regex; 2]> = LazyLock::new(|| category(r"injur(?:y|ies)|inj"));
static AUTO: LazyLock<[Regex; 2]> = LazyLock::new(|| category(r"auto"));
static PROPERTY_DAMAGE: LazyLock<[Regex; 2]> = LazyLock::new(|| category(r"property\s+damage|pd"));
static NEAR_MISS: LazyLock<[Regex; 2]> = LazyLock::new(|| category(r"near[\s-]*miss|nm"));
static POSITIONAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+)\s*,\s*(\d+)\s*,\s*(\d+)\s*,\s*(\d+)\s*$").expect("positional pattern")
});

static FULL_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4}|\d{2})$").expect("full date pattern")
});
static MONTH_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})$").expect("month/day pattern"));
static MONTH_NAME_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([a-z]+)\.?\s+(\d{1,2})(?:st|nd|rd|th)?$").expect("month name pattern")
});

/// `<label>: <count>`, then `<count> (<label>)` or `<count> <label>`.
fn category(labels: &str) -> [Regex; 2] {
    [
        Regex::new(&format!(r"(?i)\b(?:{labels})\s*:\s*(\d+)")).expect("label-first pattern"),
        Regex::new(&format!(r"(?i)(\d+)\s*\(?\s*(?:{labels})\b")).expect("category pattern"),
    ]
}

fn category_count(patterns: &[Regex; 2], text: &str) -> Option<u32> {
    patterns
        .iter()
        .find_map(|re| re.captures(text)?.get(1)?.as_str().parse().ok())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InvestigationBreakdown {
    pub injuries: u32,
    pub auto: u32,
    pub property_damage: u32,
    pub near_miss: u32,
}

impl InvestigationBreakdown {
    pub fn total(&self) -> u32 {
        self.injuries
            .saturating_add(self.auto)
            .saturating_add(self.property_damage)
            .saturating_add(self.near_miss)
    }

    pub fn is_zero(&self) -> bool {
        self.total() == 0
    }
}

pub fn decode_count(raw: &Cell) -> Option<u32> {
    match raw {
        Cell::Empty => None,
        Cell::Number(n) => number_to_count(*n),
        Cell::Text(text) => {
            if let Some(caps) = TERMINAL_SUM.captures_iter(text).last() {
                return caps[1].parse().ok();
            }
            if let Some(caps) = LEADING_DIGITS.captures(text) {
                return caps[1].parse().ok();
            }
            if ZERO_WORD.is_match(text) {
                return Some(0);
            }
            None
        }
    }
}

fn number_to_count(n: f64) -> Option<u32> {
    if n.is_finite() && n >= 0.0 && n <= f64::from(u32::MAX) {
        Some(n.trunc() as u32)
    } else {
        None
    }
}

/// Splits an investigations cell into its four categories.
///
/// A bare number is the legacy injury-only count. Labelled text is matched
/// per category in any order; unlabelled text falls back to a strict
/// `injuries, auto, pd, nm` list.
pub fn decode_investigation_breakdown(raw: &Cell) -> InvestigationBreakdown {
    let text = match raw {
        Cell::Empty => return InvestigationBreakdown::default(),
        Cell::Number(n) => {
            return InvestigationBreakdown {
                injuries: number_to_count(*n).unwrap_or(0),
                ..InvestigationBreakdown::default()
            };
        }
        Cell::Text(text) => text,
    };

    let labelled = [&*INJURIES, &*AUTO, &*PROPERTY_DAMAGE, &*NEAR_MISS]
        .map(|re| category_count(re, text));
    if labelled.iter().any(Option::is_some) {
        let [injuries, auto, property_damage, near_miss] = labelled.map(|n| n.unwrap_or(0));
        return InvestigationBreakdown {
            injuries,
            auto,
            property_damage,
            near_miss,
        };
    }

    if let Some(caps) = POSITIONAL.captures(text) {
        let field = |i: usize| caps[i].parse::<u32>().unwrap_or(0);
        return InvestigationBreakdown {
            injuries: field(1),
            auto: field(2),
            property_damage: field(3),
            near_miss: field(4),
        };
    }

    InvestigationBreakdown::default()
}

pub fn decode_date(raw: &Cell) -> Option<NaiveDate> {
    decode_date_in_year(raw, Utc::now().year())
}

pub fn decode_date_in_year(raw: &Cell, default_year: i32) -> Option<NaiveDate> {
    match raw {
        Cell::Empty => None,
        Cell::Number(serial) => from_serial(*serial),
        Cell::Text(text) => parse_date_text(text.trim(), default_year),
    }
}

pub fn parse_full_date(text: &str) -> Option<NaiveDate> {
    let caps = FULL_DATE.captures(text.trim())?;
    let month = caps[1].parse().ok()?;
    let day = caps[2].parse().ok()?;
    let year = expand_year(caps[3].parse().ok()?);
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Two-digit years are read as 20YY.
pub fn expand_year(year: i32) -> i32 {
    if year < 100 {
        2000 + year
    } else {
        year
    }
}

fn parse_date_text(text: &str, default_year: i32) -> Option<NaiveDate> {
    if text.is_empty() {
        return None;
    }
    if FULL_DATE.is_match(text) {
        return parse_full_date(text);
    }
    if let Some(caps) = MONTH_DAY.captures(text) {
        let month = caps[1].parse().ok()?;
        let day = caps[2].parse().ok()?;
        return NaiveDate::from_ymd_opt(default_year, month, day);
    }
    if let Some(caps) = MONTH_NAME_DAY.captures(text) {
        let month = month_number(&caps[1])?;
        let day = caps[2].parse().ok()?;
        return NaiveDate::from_ymd_opt(default_year, month, day);
    }
    None
}

fn month_number(name: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "january",
        "february",
        "march",
        "april",
        "may",
        "june",
        "july",
        "august",
        "september",
        "october",
        "november",
        "december",
    ];
    let name = name.to_lowercase();
    if name.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|month| *month == name || (name.len() == 3 && month.starts_with(&name)))
        .map(|idx| idx as u32 + 1)
        .or_else(|| (name == "sept").then_some(9))
}

/// Converts a 1900-system workbook serial to a calendar date.
///
/// Serial 1 is 1900-01-01. The format counts a 1900-02-29 that never
/// existed (serial 60), so serials after it are one day ahead.
fn from_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > 2_958_465.0 {
        return None;
    }
    let days = serial.trunc() as i64;
    let (epoch, offset) = if days < 60 {
        (NaiveDate::from_ymd_opt(1899, 12, 31)?, days)
    } else if days == 60 {
        return NaiveDate::from_ymd_opt(1900, 2, 28);
    } else {
        (NaiveDate::from_ymd_opt(1899, 12, 30)?, days)
    };
    epoch.checked_add_signed(Duration::days(offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::from(s)
    }

    #[test]
    fn numeric_counts_pass_through() {
        for n in [0u32, 1, 2, 17, 250] {
            assert_eq!(decode_count(&Cell::Number(f64::from(n))), Some(n));
        }
        assert_eq!(decode_count(&Cell::Number(-1.0)), None);
    }

    #[test]
    fn terminal_sum_wins_over_prefix_text() {
        assert_eq!(
            decode_count(&text("1(Code Red) + 2(Code Green) + 4(Install) = 7")),
            Some(7)
        );
        assert_eq!(decode_count(&text("lots of stuff = 7")), Some(7));
        assert_eq!(decode_count(&text("3 + 4 = 7 = 8")), Some(8));
    }

    #[test]
    fn leading_digits_and_zero_word() {
        assert_eq!(decode_count(&text("4 (branch visits)")), Some(4));
        assert_eq!(decode_count(&text("Zero")), Some(0));
        assert_eq!(decode_count(&text("zero this period")), Some(0));
        assert_eq!(decode_count(&text("none")), None);
        assert_eq!(decode_count(&text("")), None);
        assert_eq!(decode_count(&Cell::Empty), None);
    }

    #[test]
    fn labelled_breakdown() {
        assert_eq!(
            decode_investigation_breakdown(&text("1(Injury) + 3(Auto) + 11(PD) + 1(NM) = 16")),
            InvestigationBreakdown {
                injuries: 1,
                auto: 3,
                property_damage: 11,
                near_miss: 1,
            }
        );
    }

    #[test]
    fn labels_match_in_any_order_and_subset() {
        assert_eq!(
            decode_investigation_breakdown(&text("2 nm, 1 inj")),
            InvestigationBreakdown {
                injuries: 1,
                near_miss: 2,
                ..Default::default()
            }
        );
        assert_eq!(
            decode_investigation_breakdown(&text("4 Property Damage")),
            InvestigationBreakdown {
                property_damage: 4,
                ..Default::default()
            }
        );
    }

    #[test]
    fn label_first_breakdown() {
        assert_eq!(
            decode_investigation_breakdown(&text("Injuries: 2, Auto: 1")),
            InvestigationBreakdown {
                injuries: 2,
                auto: 1,
                ..Default::default()
            }
        );
        assert_eq!(
            decode_investigation_breakdown(&text("PD: 3 NM:4")),
            InvestigationBreakdown {
                property_damage: 3,
                near_miss: 4,
                ..Default::default()
            }
        );
    }

    #[test]
    fn positional_fallback() {
        assert_eq!(
            decode_investigation_breakdown(&text("5, 8, 6, 4")),
            InvestigationBreakdown {
                injuries: 5,
                auto: 8,
                property_damage: 6,
                near_miss: 4,
            }
        );
        assert!(decode_investigation_breakdown(&text("5, 8, 6")).is_zero());
    }

    #[test]
    fn bare_number_is_injuries() {
        let breakdown = decode_investigation_breakdown(&Cell::Number(3.0));
        assert_eq!(breakdown.injuries, 3);
        assert_eq!(breakdown.total(), 3);
        assert!(decode_investigation_breakdown(&text("pending")).is_zero());
    }

    #[test]
    fn serial_and_text_encodings_agree() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 1);
        assert_eq!(decode_date(&Cell::Number(45413.0)), expected);
        assert_eq!(decode_date(&text("05/01/2024")), expected);
        assert_eq!(decode_date(&text("5/1/24")), expected);
    }

    #[test]
    fn serial_epoch_edges() {
        assert_eq!(decode_date(&Cell::Number(1.0)), NaiveDate::from_ymd_opt(1900, 1, 1));
        assert_eq!(decode_date(&Cell::Number(59.0)), NaiveDate::from_ymd_opt(1900, 2, 28));
        assert_eq!(decode_date(&Cell::Number(61.0)), NaiveDate::from_ymd_opt(1900, 3, 1));
        assert_eq!(decode_date(&Cell::Number(0.0)), None);
        assert_eq!(decode_date(&Cell::Number(45413.75)), NaiveDate::from_ymd_opt(2024, 5, 1));
    }

    #[test]
    fn year_less_text_uses_default_year() {
        assert_eq!(
            decode_date_in_year(&text("3/14"), 2023),
            NaiveDate::from_ymd_opt(2023, 3, 14)
        );
        assert_eq!(
            decode_date_in_year(&text("March 14th"), 2023),
            NaiveDate::from_ymd_opt(2023, 3, 14)
        );
        assert_eq!(
            decode_date_in_year(&text("Sep 2"), 2023),
            NaiveDate::from_ymd_opt(2023, 9, 2)
        );
        assert_eq!(
            decode_date(&text("3/14")).map(|d| d.year()),
            Some(Utc::now().year())
        );
    }

    #[test]
    fn unparseable_dates_are_absent() {
        assert_eq!(decode_date(&text("")), None);
        assert_eq!(decode_date(&text("TBD")), None);
        assert_eq!(decode_date(&text("13/45/2024")), None);
        assert_eq!(decode_date_in_year(&text("Ma 3"), 2024), None);
        assert_eq!(decode_date_in_year(&text("Smarch 3"), 2024), None);
    }
}
