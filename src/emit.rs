use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{MigrationError, Stage};
use crate::models::{CoachDescriptor, MetricRecord, Period};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Coaches,
    Periods,
    Metrics,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Self::Coaches => "coaches",
            Self::Periods => "periods",
            Self::Metrics => "metrics",
        }
    }

    pub fn unique_key(self) -> &'static [&'static str] {
        match self {
            Self::Coaches => &["name"],
            Self::Periods => &["period_name"],
            Self::Metrics => &["period_id", "coach_id"],
        }
    }
}

/// Column value. `Ref` points at another table's row by its natural key and
/// is resolved to that row's id by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Text(String),
    Int(i32),
    Date(Option<NaiveDate>),
    Ref { table: Table, key: String },
}

impl Value {
    fn count(n: u32) -> Self {
        Self::Int(i32::try_from(n).unwrap_or(i32::MAX))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Row {
    pub columns: Vec<(&'static str, Value)>,
}

impl Row {
    pub fn with(mut self, column: &'static str, value: Value) -> Self {
        self.columns.push((column, value));
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Insert { table: Table, row: Row },
    Upsert {
        table: Table,
        row: Row,
        conflict_key: Vec<&'static str>,
    },
}

impl Operation {
    pub fn table(&self) -> Table {
        match self {
            Self::Insert { table, .. } | Self::Upsert { table, .. } => *table,
        }
    }
}

pub fn emit_operations(
    coaches: &[CoachDescriptor],
    periods: &[Period],
    records: &[MetricRecord],
) -> Result<Vec<Operation>, MigrationError> {
    let coach_names: HashSet<&str> = coaches.iter().map(|c| c.coach.name.as_str()).collect();
    let period_names: HashSet<&str> = periods.iter().map(|p| p.period_name.as_str()).collect();

    let mut operations = Vec::with_capacity(coaches.len() + periods.len() + records.len());

    for descriptor in coaches {
        let coach = &descriptor.coach;
        operations.push(Operation::Insert {
            table: Table::Coaches,
            row: Row::default()
                .with("name", Value::Text(coach.name.clone()))
                .with("hire_date", Value::Date(coach.hire_date))
                .with(
                    "vacation_days_remaining",
                    Value::count(coach.vacation_days_remaining),
                )
                .with("vacation_days_total", Value::count(coach.vacation_days_total)),
        });
    }

    for period in periods {
        operations.push(Operation::Insert {
            table: Table::Periods,
            row: Row::default()
                .with("period_name", Value::Text(period.period_name.clone()))
                .with("start_date", Value::Date(Some(period.start_date)))
                .with("end_date", Value::Date(Some(period.end_date))),
        });
    }

    for record in records {
        if !coach_names.contains(record.coach_name.as_str()) {
            return Err(MigrationError::consistency(
                Stage::EmitOperations,
                format!(
                    "metric record for period {:?} references unknown coach {:?}",
                    record.period_name, record.coach_name
                ),
            ));
        }
        if !period_names.contains(record.period_name.as_str()) {
            return Err(MigrationError::consistency(
                Stage::EmitOperations,
                format!(
                    "metric record for coach {:?} references unknown period {:?}",
                    record.coach_name, record.period_name
                ),
            ));
        }
        operations.push(Operation::Upsert {
            table: Table::Metrics,
            row: metric_row(record),
            conflict_key: Table::Metrics.unique_key().to_vec(),
        });
    }

    Ok(operations)
}

fn metric_row(record: &MetricRecord) -> Row {
    let investigations = &record.investigations;
    Row::default()
        .with(
            "period_id",
            Value::Ref {
                table: Table::Periods,
                key: record.period_name.clone(),
            },
        )
        .with(
            "coach_id",
            Value::Ref {
                table: Table::Coaches,
                key: record.coach_name.clone(),
            },
        )
        .with("travel_plans", Value::Text(record.travel_plans.clone()))
        .with(
            "training_branch_location",
            Value::Text(record.training_branch_location.clone()),
        )
        .with(
            "site_safety_evaluations",
            Value::count(record.site_safety_evaluations),
        )
        .with("forklift_evaluations", Value::count(record.forklift_evaluations))
        .with("office_audits", Value::count(record.office_audits))
        .with("injury_investigations", Value::count(investigations.injuries))
        .with("auto_investigations", Value::count(investigations.auto))
        .with(
            "property_damage_investigations",
            Value::count(investigations.property_damage),
        )
        .with("near_miss_investigations", Value::count(investigations.near_miss))
        .with("safety_report_date", Value::Date(record.safety_report_date))
        .with("quarterly_report_date", Value::Date(record.quarterly_report_date))
        .with("safety_meeting_date", Value::Date(record.safety_meeting_date))
        .with("training_meeting_date", Value::Date(record.training_meeting_date))
        .with("notes", Value::Text(record.notes.clone()))
}
