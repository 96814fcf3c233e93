use anyhow::Context;
use chrono::NaiveDate;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row as _, Transaction};
use uuid::Uuid;

use crate::emit::{Operation, Row, Table};
use crate::sql::{self, Param};
use crate::store::{self, ApplyStats, Store, WriteOutcome};

pub async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to the target Postgres instance")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn apply_migration(pool: &PgPool, operations: &[Operation]) -> anyhow::Result<ApplyStats> {
    let tx = pool
        .begin()
        .await
        .context("failed to begin migration transaction")?;
    let mut store = PgStore { tx };

    let stats = store::apply(&mut store, operations)
        .await
        .context("migration rolled back")?;

    store
        .tx
        .commit()
        .await
        .context("failed to commit migration transaction")?;
    Ok(stats)
}

enum Bind {
    Id(Uuid),
    Text(String),
    Int(i32),
    Date(Option<NaiveDate>),
}

impl From<Param<'_>> for Bind {
    fn from(param: Param<'_>) -> Self {
        match param {
            Param::NewId => Self::Id(Uuid::new_v4()),
            Param::Text(text) => Self::Text(text.to_owned()),
            Param::Int(n) => Self::Int(n),
            Param::Date(date) => Self::Date(date),
        }
    }
}

pub struct PgStore {
    tx: Transaction<'static, Postgres>,
}

impl PgStore {
    fn prepare(
        table: Table,
        row: &Row,
        conflict_key: Option<&[&'static str]>,
    ) -> (String, Vec<Bind>) {
        let mut binds = Vec::new();
        let mut statement = sql::statement(table, row, conflict_key, |param| {
            binds.push(Bind::from(param));
            format!("${}", binds.len())
        });
        // xmax is 0 only for freshly inserted tuples.
        statement.push_str(" RETURNING (xmax = 0) AS inserted");
        (statement, binds)
    }

    async fn write(
        &mut self,
        table: Table,
        row: &Row,
        conflict_key: Option<&[&'static str]>,
    ) -> anyhow::Result<WriteOutcome> {
        let (statement, binds) = Self::prepare(table, row, conflict_key);
        let returned = bind_all(sqlx::query(&statement), binds)
            .fetch_optional(&mut *self.tx)
            .await
            .with_context(|| format!("failed to write {} row", table.name()))?;

        Ok(match returned {
            None => WriteOutcome::Unchanged,
            Some(row) if row.get::<bool, _>("inserted") => WriteOutcome::Inserted,
            Some(_) => WriteOutcome::Updated,
        })
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    binds: Vec<Bind>,
) -> Query<'q, Postgres, PgArguments> {
    for bind in binds {
        query = match bind {
            Bind::Id(id) => query.bind(id),
            Bind::Text(text) => query.bind(text),
            Bind::Int(n) => query.bind(n),
            Bind::Date(date) => query.bind(date),
        };
    }
    query
}

impl Store for PgStore {
    async fn insert(&mut self, table: Table, row: &Row) -> anyhow::Result<WriteOutcome> {
        self.write(table, row, None).await
    }

    async fn upsert(
        &mut self,
        table: Table,
        row: &Row,
        conflict_key: &[&'static str],
    ) -> anyhow::Result<WriteOutcome> {
        self.write(table, row, Some(conflict_key)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::Value;

    #[test]
    fn insert_statement_returns_insert_flag() {
        let row = Row::default()
            .with("name", Value::Text("Mike".into()))
            .with("hire_date", Value::Date(None));
        let (statement, binds) = PgStore::prepare(Table::Coaches, &row, None);
        assert_eq!(
            statement,
            "INSERT INTO coach_safety.coaches (id, name, hire_date) VALUES ($1, $2, $3) \
             ON CONFLICT (name) DO NOTHING RETURNING (xmax = 0) AS inserted"
        );
        assert_eq!(binds.len(), 3);
        assert!(matches!(binds[0], Bind::Id(_)));
        assert!(matches!(&binds[1], Bind::Text(name) if name == "Mike"));
        assert!(matches!(binds[2], Bind::Date(None)));
    }

    #[test]
    fn upsert_statement_skips_identical_rows() {
        let row = Row::default()
            .with(
                "period_id",
                Value::Ref {
                    table: Table::Periods,
                    key: "5-1-24".into(),
                },
            )
            .with(
                "coach_id",
                Value::Ref {
                    table: Table::Coaches,
                    key: "Mike".into(),
                },
            )
            .with("office_audits", Value::Int(3))
            .with("notes", Value::Text(String::new()));
        let (statement, binds) =
            PgStore::prepare(Table::Metrics, &row, Some(Table::Metrics.unique_key()));
        assert!(statement.ends_with(
            "ON CONFLICT (period_id, coach_id) DO UPDATE SET office_audits = EXCLUDED.office_audits, \
             notes = EXCLUDED.notes \
             WHERE (metrics.office_audits, metrics.notes) IS DISTINCT FROM \
             (EXCLUDED.office_audits, EXCLUDED.notes) \
             RETURNING (xmax = 0) AS inserted"
        ));
        assert_eq!(binds.len(), 5);
    }
}
