use std::fmt::Write;

use crate::models::{DateSource, PeriodSummary};
use crate::pipeline::MigrationPlan;

pub fn summarize_by_period(plan: &MigrationPlan) -> Vec<PeriodSummary> {
    let mut summaries: Vec<PeriodSummary> = plan
        .periods
        .iter()
        .map(|period| {
            let records = plan
                .records
                .iter()
                .filter(|record| record.period_name == period.period_name);
            let (record_count, evaluation_total, investigation_total) =
                records.fold((0, 0, 0), |(count, evals, investigations), record| {
                    (
                        count + 1,
                        evals + record.evaluation_total(),
                        investigations + record.investigations.total(),
                    )
                });
            PeriodSummary {
                period_name: period.period_name.clone(),
                start_date: period.start_date,
                end_date: period.end_date,
                record_count,
                evaluation_total,
                investigation_total,
            }
        })
        .collect();

    summaries.sort_by(|a, b| a.start_date.cmp(&b.start_date));
    summaries
}

pub fn build_report(workbook_label: &str, plan: &MigrationPlan) -> String {
    let summaries = summarize_by_period(plan);

    let mut output = String::new();

    let _ = writeln!(output, "# Coach Safety Migration Report");
    let _ = writeln!(output, "Generated from {workbook_label}");
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "- {} coaches, {} periods, {} metric records, {} operations",
        plan.coach_count(),
        plan.period_count(),
        plan.record_count(),
        plan.operations.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Periods");

    if summaries.is_empty() {
        let _ = writeln!(output, "No period sheets found in this workbook.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {} ({} to {}): {} records, {} evaluations, {} investigations",
                summary.period_name,
                summary.start_date,
                summary.end_date,
                summary.record_count,
                summary.evaluation_total,
                summary.investigation_total
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Coaches");

    if plan.coaches.is_empty() {
        let _ = writeln!(output, "No coaches recognized on the reference sheet.");
    } else {
        for descriptor in plan.coaches.iter() {
            let coach = &descriptor.coach;
            let hire_date = coach
                .hire_date
                .map_or_else(|| "unknown".to_string(), |d| d.to_string());
            let _ = writeln!(
                output,
                "- {} (hired {}, vacation {} of {})",
                coach.name, hire_date, coach.vacation_days_remaining, coach.vacation_days_total
            );
        }
    }

    let estimated: Vec<&str> = plan
        .periods
        .iter()
        .filter(|period| period.date_source == DateSource::SheetName)
        .map(|period| period.period_name.as_str())
        .collect();
    let _ = writeln!(output);
    let _ = writeln!(output, "## Review Before Trusting");

    if estimated.is_empty() {
        let _ = writeln!(output, "Every period carried an explicit date range.");
    } else {
        let _ = writeln!(
            output,
            "- End dates assumed from a fixed period length: {}",
            estimated.join(", ")
        );
    }
    let missing_hire: Vec<&str> = plan
        .coaches
        .iter()
        .filter(|d| d.coach.hire_date.is_none())
        .map(|d| d.coach.name.as_str())
        .collect();
    if !missing_hire.is_empty() {
        let _ = writeln!(output, "- Hire date unknown: {}", missing_hire.join(", "));
    }

    output
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::decode::InvestigationBreakdown;
    use crate::models::{Coach, CoachDescriptor, MetricRecord, Period};

    fn plan() -> MigrationPlan {
        let period = |name: &str, day: u32, source| Period {
            period_name: name.into(),
            start_date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 5, day + 13).unwrap(),
            date_source: source,
        };
        MigrationPlan {
            sheets: vec!["5-15-24".into(), "5-1-24".into()],
            coaches: vec![CoachDescriptor {
                coach: Coach {
                    name: "Dana".into(),
                    hire_date: None,
                    vacation_days_remaining: 3,
                    vacation_days_total: 10,
                },
                source_column: 2,
            }],
            periods: vec![
                period("5-15-24", 15, DateSource::SheetName),
                period("5-1-24", 1, DateSource::DateRange),
            ],
            records: vec![
                MetricRecord {
                    coach_name: "Dana".into(),
                    period_name: "5-1-24".into(),
                    site_safety_evaluations: 2,
                    office_audits: 1,
                    investigations: InvestigationBreakdown {
                        auto: 2,
                        ..Default::default()
                    },
                    ..MetricRecord::default()
                },
            ],
            operations: Vec::new(),
        }
    }

    #[test]
    fn periods_sort_by_start_date() {
        let summaries = summarize_by_period(&plan());
        assert_eq!(summaries[0].period_name, "5-1-24");
        assert_eq!(summaries[0].record_count, 1);
        assert_eq!(summaries[0].evaluation_total, 3);
        assert_eq!(summaries[0].investigation_total, 2);
        assert_eq!(summaries[1].record_count, 0);
    }

    #[test]
    fn report_flags_estimated_periods_and_unknown_hire_dates() {
        let report = build_report("tracking.xlsx", &plan());
        assert!(report.starts_with("# Coach Safety Migration Report\nGenerated from tracking.xlsx"));
        assert!(report.contains("- 1 coaches, 2 periods, 1 metric records, 0 operations"));
        assert!(report.contains("- Dana (hired unknown, vacation 3 of 10)"));
        assert!(report.contains("- End dates assumed from a fixed period length: 5-15-24"));
        assert!(report.contains("- Hire date unknown: Dana"));
    }
}
