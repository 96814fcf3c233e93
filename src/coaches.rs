use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::decode::decode_date_in_year;
use crate::error::{MigrationError, Stage};
use crate::models::{Coach, CoachDescriptor};
use crate::workbook::{Cell, Grid};

static DATE_OF_HIRE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bDOH\b[\s:]*(\d{1,2}/\d{1,2}/\d{2,4}|\?+)").expect("date of hire pattern")
});
static VACATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[\s*(\d+)\s*out\s+of\s+(\d+)\s*\]").expect("vacation pattern")
});

#[derive(Debug, Clone)]
pub struct CoachMatcher {
    leading_name: Option<Regex>,
}

impl CoachMatcher {
    pub fn new(known_first_names: &[String]) -> Result<Self, MigrationError> {
        if known_first_names.is_empty() {
            return Ok(Self { leading_name: None });
        }
        let alternatives = known_first_names
            .iter()
            .map(|name| regex::escape(name.trim()))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = format!(r"(?s)^\s*({alternatives})\b(.*)$");
        let leading_name = Regex::new(&pattern).map_err(|e| {
            MigrationError::input(Stage::LoadConfig, format!("invalid coach name list: {e}"))
        })?;
        Ok(Self {
            leading_name: Some(leading_name),
        })
    }

    /// Parses one header cell; `None` when it is not a coach-identity cell.
    pub fn parse_cell(&self, text: &str, default_year: i32) -> Option<Coach> {
        let caps = self.leading_name.as_ref()?.captures(text)?;
        let name = caps[1].to_owned();
        let rest = caps.get(2).map_or("", |m| m.as_str());

        let hire_token = DATE_OF_HIRE.captures(rest)?.get(1)?.as_str().to_owned();
        let vacation = VACATION.captures(rest)?;
        let vacation_days_remaining = vacation[1].parse().ok()?;
        let vacation_days_total = vacation[2].parse().ok()?;

        let hire_date = if is_placeholder(&hire_token) {
            None
        } else {
            decode_date_in_year(&Cell::Text(hire_token), default_year)
        };

        Some(Coach {
            name,
            hire_date,
            vacation_days_remaining,
            vacation_days_total,
        })
    }
}

pub fn header_starts_with_name(text: &str, name: &str) -> bool {
    text.trim_start()
        .strip_prefix(name)
        .is_some_and(|rest| !rest.starts_with(|c: char| c.is_alphanumeric()))
}

fn is_placeholder(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c == '?')
}

pub fn extract_coaches(grid: &Grid, matcher: &CoachMatcher, default_year: i32) -> Vec<CoachDescriptor> {
    let mut seen = HashSet::new();
    let mut coaches = Vec::new();

    for (column, cell) in grid.header().iter().enumerate() {
        let Cell::Text(text) = cell else {
            continue;
        };
        let Some(coach) = matcher.parse_cell(text, default_year) else {
            continue;
        };
        if !seen.insert(coach.name.clone()) {
            log::debug!("coach {:?} repeated in column {column}, keeping first", coach.name);
            continue;
        }
        log::debug!("coach {:?} found in column {column}", coach.name);
        coaches.push(CoachDescriptor {
            coach,
            source_column: column,
        });
    }

    coaches
}
