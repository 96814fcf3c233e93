use std::collections::BTreeMap;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::emit::{Operation, Row, Table, Value};
use crate::error::{MigrationError, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Inserted,
    Updated,
    Unchanged,
}

#[allow(async_fn_in_trait)]
pub trait Store {
    async fn insert(&mut self, table: Table, row: &Row) -> anyhow::Result<WriteOutcome>;

    async fn upsert(
        &mut self,
        table: Table,
        row: &Row,
        conflict_key: &[&'static str],
    ) -> anyhow::Result<WriteOutcome>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyStats {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
}

impl ApplyStats {
    fn record(&mut self, outcome: WriteOutcome) {
        match outcome {
            WriteOutcome::Inserted => self.inserted += 1,
            WriteOutcome::Updated => self.updated += 1,
            WriteOutcome::Unchanged => self.unchanged += 1,
        }
    }
}

pub async fn apply<S: Store>(store: &mut S, operations: &[Operation]) -> anyhow::Result<ApplyStats> {
    let mut stats = ApplyStats::default();
    for op in operations {
        let outcome = match op {
            Operation::Insert { table, row } => store.insert(*table, row).await?,
            Operation::Upsert {
                table,
                row,
                conflict_key,
            } => store.upsert(*table, row, conflict_key).await?,
        };
        stats.record(outcome);
    }
    Ok(stats)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredValue {
    Id(Uuid),
    Text(String),
    Int(i32),
    Date(Option<NaiveDate>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRow {
    pub id: Uuid,
    pub values: BTreeMap<&'static str, StoredValue>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: BTreeMap<Table, Vec<StoredRow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self, table: Table) -> usize {
        self.tables.get(&table).map_or(0, Vec::len)
    }

    pub fn rows(&self, table: Table) -> &[StoredRow] {
        self.tables.get(&table).map(Vec::as_slice).unwrap_or(&[])
    }

    fn resolve(&self, row: &Row) -> Result<BTreeMap<&'static str, StoredValue>, MigrationError> {
        row.columns
            .iter()
            .map(|(column, value)| -> Result<_, MigrationError> {
                let stored = match value {
                    Value::Text(text) => StoredValue::Text(text.clone()),
                    Value::Int(n) => StoredValue::Int(*n),
                    Value::Date(date) => StoredValue::Date(*date),
                    Value::Ref { table, key } => StoredValue::Id(self.lookup(*table, key)?),
                };
                Ok((*column, stored))
            })
            .collect()
    }

    fn lookup(&self, table: Table, key: &str) -> Result<Uuid, MigrationError> {
        let column = crate::sql::natural_key_column(table);
        self.rows(table)
            .iter()
            .find(|row| matches!(row.values.get(column), Some(StoredValue::Text(text)) if text == key))
            .map(|row| row.id)
            .ok_or_else(|| {
                MigrationError::consistency(
                    Stage::ApplyOperations,
                    format!("no {} row with {column} = {key:?}", table.name()),
                )
            })
    }

    fn position(
        &self,
        table: Table,
        values: &BTreeMap<&'static str, StoredValue>,
        key: &[&'static str],
    ) -> Option<usize> {
        self.rows(table)
            .iter()
            .position(|row| key.iter().all(|column| row.values.get(column) == values.get(column)))
    }

    fn push(&mut self, table: Table, values: BTreeMap<&'static str, StoredValue>) {
        self.tables.entry(table).or_default().push(StoredRow {
            id: Uuid::new_v4(),
            values,
        });
    }
}

impl Store for MemoryStore {
    async fn insert(&mut self, table: Table, row: &Row) -> anyhow::Result<WriteOutcome> {
        let values = self.resolve(row)?;
        if self.position(table, &values, table.unique_key()).is_some() {
            return Ok(WriteOutcome::Unchanged);
        }
        self.push(table, values);
        Ok(WriteOutcome::Inserted)
    }

    async fn upsert(
        &mut self,
        table: Table,
        row: &Row,
        conflict_key: &[&'static str],
    ) -> anyhow::Result<WriteOutcome> {
        let values = self.resolve(row)?;
        let Some(idx) = self.position(table, &values, conflict_key) else {
            self.push(table, values);
            return Ok(WriteOutcome::Inserted);
        };
        let existing = &mut self.tables.entry(table).or_default()[idx];
        if existing.values == values {
            return Ok(WriteOutcome::Unchanged);
        }
        existing.values = values;
        Ok(WriteOutcome::Updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coach(name: &str, remaining: i32) -> Operation {
        Operation::Insert {
            table: Table::Coaches,
            row: Row::default()
                .with("name", Value::Text(name.into()))
                .with("vacation_days_remaining", Value::Int(remaining)),
        }
    }

    fn period(name: &str) -> Operation {
        Operation::Insert {
            table: Table::Periods,
            row: Row::default().with("period_name", Value::Text(name.into())),
        }
    }

    fn metric(coach: &str, period: &str, audits: i32) -> Operation {
        Operation::Upsert {
            table: Table::Metrics,
            row: Row::default()
                .with(
                    "period_id",
                    Value::Ref {
                        table: Table::Periods,
                        key: period.into(),
                    },
                )
                .with(
                    "coach_id",
                    Value::Ref {
                        table: Table::Coaches,
                        key: coach.into(),
                    },
                )
                .with("office_audits", Value::Int(audits)),
            conflict_key: Table::Metrics.unique_key().to_vec(),
        }
    }

    #[tokio::test]
    async fn reapplying_is_idempotent() {
        let ops = vec![coach("Mike", 10), period("5-1-24"), metric("Mike", "5-1-24", 2)];
        let mut store = MemoryStore::new();

        let first = apply(&mut store, &ops).await.unwrap();
        assert_eq!(first.inserted, 3);
        let second = apply(&mut store, &ops).await.unwrap();
        assert_eq!(second.unchanged, 3);

        assert_eq!(store.row_count(Table::Coaches), 1);
        assert_eq!(store.row_count(Table::Periods), 1);
        assert_eq!(store.row_count(Table::Metrics), 1);
    }

    #[tokio::test]
    async fn upsert_updates_in_place_and_insert_keeps_first() {
        let mut store = MemoryStore::new();
        apply(&mut store, &[coach("Mike", 10), period("5-1-24"), metric("Mike", "5-1-24", 2)])
            .await
            .unwrap();
        let stats = apply(&mut store, &[coach("Mike", 4), metric("Mike", "5-1-24", 5)])
            .await
            .unwrap();
        assert_eq!(stats.unchanged, 1);
        assert_eq!(stats.updated, 1);

        let coach_row = &store.rows(Table::Coaches)[0];
        assert_eq!(
            coach_row.values.get("vacation_days_remaining"),
            Some(&StoredValue::Int(10))
        );
        let metric_row = &store.rows(Table::Metrics)[0];
        assert_eq!(metric_row.values.get("office_audits"), Some(&StoredValue::Int(5)));
        assert_eq!(
            metric_row.values.get("coach_id"),
            Some(&StoredValue::Id(coach_row.id))
        );
    }

    #[tokio::test]
    async fn dangling_reference_fails() {
        let mut store = MemoryStore::new();
        let err = apply(&mut store, &[period("5-1-24"), metric("Zed", "5-1-24", 1)])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no coaches row with name = \"Zed\""));
        assert_eq!(store.row_count(Table::Metrics), 0);
    }
}
