use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::MetricRecord;

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    coach_name: &'a str,
    period_name: &'a str,
    travel_plans: &'a str,
    training_branch_location: &'a str,
    site_safety_evaluations: u32,
    forklift_evaluations: u32,
    office_audits: u32,
    injury_investigations: u32,
    auto_investigations: u32,
    property_damage_investigations: u32,
    near_miss_investigations: u32,
    safety_report_date: Option<NaiveDate>,
    quarterly_report_date: Option<NaiveDate>,
    safety_meeting_date: Option<NaiveDate>,
    training_meeting_date: Option<NaiveDate>,
    notes: &'a str,
}

impl<'a> From<&'a MetricRecord> for ExportRow<'a> {
    fn from(record: &'a MetricRecord) -> Self {
        Self {
            coach_name: &record.coach_name,
            period_name: &record.period_name,
            travel_plans: &record.travel_plans,
            training_branch_location: &record.training_branch_location,
            site_safety_evaluations: record.site_safety_evaluations,
            forklift_evaluations: record.forklift_evaluations,
            office_audits: record.office_audits,
            injury_investigations: record.investigations.injuries,
            auto_investigations: record.investigations.auto,
            property_damage_investigations: record.investigations.property_damage,
            near_miss_investigations: record.investigations.near_miss,
            safety_report_date: record.safety_report_date,
            quarterly_report_date: record.quarterly_report_date,
            safety_meeting_date: record.safety_meeting_date,
            training_meeting_date: record.training_meeting_date,
            notes: &record.notes,
        }
    }
}

pub fn write_records<W: std::io::Write>(writer: W, records: &[MetricRecord]) -> anyhow::Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(ExportRow::from(record))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn export_csv(path: &Path, records: &[MetricRecord]) -> anyhow::Result<usize> {
    let file = std::fs::File::create(path)?;
    write_records(file, records)?;
    Ok(records.len())
}
