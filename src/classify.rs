use std::sync::LazyLock;

use regex::Regex;

/// Period sheets are named after their start date, e.g. `5-1-24`.
static PERIOD_SHEET_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d{1,2})-(\d{1,2})-(\d{4}|\d{2})\s*$").expect("period sheet pattern")
});

/// Returns the sheets that hold bi-weekly period data, in workbook order.
pub fn classify_sheets(names: &[String]) -> Vec<String> {
    names
        .iter()
        .filter(|name| is_period_sheet(name))
        .cloned()
        .collect()
}

pub fn is_period_sheet(name: &str) -> bool {
    PERIOD_SHEET_NAME.is_match(name)
}

/// Splits a period sheet name into (month, day, year) without validating
/// the calendar date.
pub fn sheet_name_parts(name: &str) -> Option<(u32, u32, i32)> {
    let caps = PERIOD_SHEET_NAME.captures(name)?;
    Some((
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    ))
}
