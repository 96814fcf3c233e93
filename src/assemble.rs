use std::sync::LazyLock;

use regex::Regex;

use crate::coaches::header_starts_with_name;
use crate::config::RowLayout;
use crate::decode::{decode_count, decode_date_in_year, decode_investigation_breakdown};
use crate::models::{CoachDescriptor, MetricRecord, Period};
use crate::workbook::{Cell, Grid};

static NOTES_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bnotes\b").expect("notes header pattern"));

pub fn assemble_records(
    coaches: &[CoachDescriptor],
    period: &Period,
    grid: &Grid,
    layout: &RowLayout,
    default_year: i32,
) -> Vec<MetricRecord> {
    let notes_column = find_notes_column(grid);

    coaches
        .iter()
        .filter_map(|descriptor| {
            let column = locate_column(grid, descriptor);
            let record = read_record(
                grid,
                column,
                layout,
                default_year,
                &descriptor.coach.name,
                &period.period_name,
            );
            let notes = notes_column
                .map(|col| collect_notes(grid, col, &descriptor.coach.name))
                .unwrap_or_default();
            let record = MetricRecord { notes, ..record };
            if record.has_data() {
                Some(record)
            } else {
                log::debug!(
                    "no data for {} in {}, skipping",
                    descriptor.coach.name,
                    period.period_name
                );
                None
            }
        })
        .collect()
}

/// Column of the coach on this sheet: the header cell naming the coach, or
/// the reference sheet's column when the header does not name them.
fn locate_column(grid: &Grid, descriptor: &CoachDescriptor) -> usize {
    let name = &descriptor.coach.name;
    let named_here = |cell: &Cell| matches!(cell, Cell::Text(text) if header_starts_with_name(text, name));

    if named_here(grid.cell(0, descriptor.source_column)) {
        return descriptor.source_column;
    }
    match grid.header().iter().position(named_here) {
        Some(column) => {
            log::debug!(
                "coach {name:?} moved from column {} to {column}",
                descriptor.source_column
            );
            column
        }
        None => descriptor.source_column,
    }
}

fn read_record(
    grid: &Grid,
    column: usize,
    layout: &RowLayout,
    default_year: i32,
    coach_name: &str,
    period_name: &str,
) -> MetricRecord {
    let at = |row: usize| grid.cell(row, column);
    let count = |row: usize| decode_count(at(row)).unwrap_or(0);
    let date = |row: usize| decode_date_in_year(at(row), default_year);

    MetricRecord {
        coach_name: coach_name.to_owned(),
        period_name: period_name.to_owned(),
        travel_plans: at(layout.travel_plans).as_text(),
        training_branch_location: at(layout.training_branch_location).as_text(),
        site_safety_evaluations: count(layout.site_safety_evaluations),
        forklift_evaluations: count(layout.forklift_evaluations),
        office_audits: count(layout.office_audits),
        investigations: decode_investigation_breakdown(at(layout.investigations)),
        safety_report_date: date(layout.safety_report_date),
        quarterly_report_date: date(layout.quarterly_report_date),
        safety_meeting_date: date(layout.safety_meeting_date),
        training_meeting_date: date(layout.training_meeting_date),
        notes: String::new(),
    }
}

fn find_notes_column(grid: &Grid) -> Option<usize> {
    grid.header()
        .iter()
        .position(|cell| matches!(cell, Cell::Text(text) if NOTES_HEADER.is_match(text)))
}

fn collect_notes(grid: &Grid, column: usize, coach_name: &str) -> String {
    let Ok(mentions) = Regex::new(&format!(r"\b{}\b", regex::escape(coach_name))) else {
        return String::new();
    };
    (1..grid.height())
        .map(|row| grid.cell(row, column).as_text())
        .filter(|text| mentions.is_match(text))
        .collect::<Vec<_>>()
        .join("\n")
}
