use serde::Serialize;

use crate::assemble::assemble_records;
use crate::classify::classify_sheets;
use crate::coaches::{extract_coaches, CoachMatcher};
use crate::config::MigrationConfig;
use crate::emit::{emit_operations, Operation};
use crate::error::MigrationError;
use crate::models::{Coach, CoachDescriptor, MetricRecord, Period};
use crate::periods::extract_period;
use crate::workbook::Workbook;

#[derive(Debug, Clone)]
pub struct MigrationPlan {
    pub sheets: Vec<String>,
    pub coaches: Vec<CoachDescriptor>,
    pub periods: Vec<Period>,
    pub records: Vec<MetricRecord>,
    pub operations: Vec<Operation>,
}

#[derive(Debug, Serialize)]
struct PlanView<'a> {
    sheets: &'a [String],
    coaches: Vec<&'a Coach>,
    periods: &'a [Period],
    records: &'a [MetricRecord],
    operations: &'a [Operation],
}

impl MigrationPlan {
    pub fn coach_count(&self) -> usize {
        self.coaches.len()
    }

    pub fn period_count(&self) -> usize {
        self.periods.len()
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&PlanView {
            sheets: &self.sheets,
            coaches: self.coaches.iter().map(|d| &d.coach).collect(),
            periods: &self.periods,
            records: &self.records,
            operations: &self.operations,
        })
    }
}

/// Coaches come from the first period sheet only.
pub fn plan_migration<W: Workbook>(
    workbook: &mut W,
    config: &MigrationConfig,
) -> Result<MigrationPlan, MigrationError> {
    let matcher = CoachMatcher::new(&config.known_first_names)?;
    let default_year = config.year_for_partial_dates();

    let all_sheets = workbook.sheet_names();
    let sheets = classify_sheets(&all_sheets);
    log::info!(
        "{} of {} sheets hold period data",
        sheets.len(),
        all_sheets.len()
    );
    if sheets.is_empty() {
        log::warn!("no sheet names look like a period start date (e.g. 5-1-24)");
    }
    if config.known_first_names.is_empty() {
        log::warn!("known_first_names is empty, no coaches will be recognized");
    }

    let mut coaches = Vec::new();
    let mut periods = Vec::with_capacity(sheets.len());
    let mut records = Vec::new();

    for (idx, sheet) in sheets.iter().enumerate() {
        let grid = workbook.sheet_grid(sheet)?;
        if idx == 0 {
            coaches = extract_coaches(&grid, &matcher, default_year);
            log::info!("{} coaches found on reference sheet {sheet:?}", coaches.len());
        }

        let period = extract_period(&grid, sheet, config.period_length_days);
        let assembled = assemble_records(&coaches, &period, &grid, &config.layout, default_year);
        log::debug!(
            "sheet {sheet:?}: {} to {}, {} records",
            period.start_date,
            period.end_date,
            assembled.len()
        );
        records.extend(assembled);
        periods.push(period);
    }

    let operations = emit_operations(&coaches, &periods, &records)?;
    log::info!(
        "planned {} operations for {} coaches, {} periods, {} metric records",
        operations.len(),
        coaches.len(),
        periods.len(),
        records.len()
    );

    Ok(MigrationPlan {
        sheets,
        coaches,
        periods,
        records,
        operations,
    })
}
