use chrono::NaiveDate;
use serde::Serialize;

use crate::decode::InvestigationBreakdown;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Coach {
    pub name: String,
    pub hire_date: Option<NaiveDate>,
    pub vacation_days_remaining: u32,
    pub vacation_days_total: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoachDescriptor {
    pub coach: Coach,
    pub source_column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateSource {
    DateRange,
    SheetName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Period {
    pub period_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub date_source: DateSource,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricRecord {
    pub coach_name: String,
    pub period_name: String,
    pub travel_plans: String,
    pub training_branch_location: String,
    pub site_safety_evaluations: u32,
    pub forklift_evaluations: u32,
    pub office_audits: u32,
    pub investigations: InvestigationBreakdown,
    pub safety_report_date: Option<NaiveDate>,
    pub quarterly_report_date: Option<NaiveDate>,
    pub safety_meeting_date: Option<NaiveDate>,
    pub training_meeting_date: Option<NaiveDate>,
    pub notes: String,
}

impl MetricRecord {
    /// True when the record carries a non-zero counter or travel plans.
    pub fn has_data(&self) -> bool {
        self.site_safety_evaluations > 0
            || self.forklift_evaluations > 0
            || self.office_audits > 0
            || !self.investigations.is_zero()
            || !self.travel_plans.trim().is_empty()
    }

    pub fn evaluation_total(&self) -> u32 {
        self.site_safety_evaluations
            .saturating_add(self.forklift_evaluations)
            .saturating_add(self.office_audits)
    }
}

#[derive(Debug, Clone)]
pub struct PeriodSummary {
    pub period_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub record_count: usize,
    pub evaluation_total: u32,
    pub investigation_total: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_records_have_no_data() {
        let record = MetricRecord {
            coach_name: "Mike".into(),
            period_name: "5-1-24".into(),
            training_branch_location: "Denver".into(),
            notes: "Mike: out sick".into(),
            ..MetricRecord::default()
        };
        assert!(!record.has_data());
    }

    #[test]
    fn travel_plans_or_any_counter_count_as_data() {
        let travel = MetricRecord {
            travel_plans: "Boise".into(),
            ..MetricRecord::default()
        };
        assert!(travel.has_data());

        let investigated = MetricRecord {
            investigations: InvestigationBreakdown {
                near_miss: 1,
                ..Default::default()
            },
            ..MetricRecord::default()
        };
        assert!(investigated.has_data());
    }
}
