use std::fmt::Write;

use chrono::NaiveDate;

use crate::emit::{Operation, Row, Table, Value};

pub const SCHEMA: &str = "coach_safety";

#[derive(Debug, Clone, PartialEq)]
pub enum Param<'a> {
    NewId,
    Text(&'a str),
    Int(i32),
    Date(Option<NaiveDate>),
}

pub fn build_statement<'a>(op: &'a Operation, param: impl FnMut(Param<'a>) -> String) -> String {
    match op {
        Operation::Insert { table, row } => statement(*table, row, None, param),
        Operation::Upsert {
            table,
            row,
            conflict_key,
        } => statement(*table, row, Some(conflict_key.as_slice()), param),
    }
}

pub fn statement<'a>(
    table: Table,
    row: &'a Row,
    conflict_key: Option<&[&'static str]>,
    mut param: impl FnMut(Param<'a>) -> String,
) -> String {
    let mut columns = vec!["id"];
    let mut values = vec![param(Param::NewId)];
    for (column, value) in &row.columns {
        columns.push(*column);
        values.push(render_value(value, &mut param));
    }

    let mut sql = format!(
        "INSERT INTO {SCHEMA}.{} ({}) VALUES ({})",
        table.name(),
        columns.join(", "),
        values.join(", ")
    );

    match conflict_key {
        None => {
            let _ = write!(sql, " ON CONFLICT ({}) DO NOTHING", table.unique_key().join(", "));
        }
        Some(key) => {
            let columns = update_columns(row, key).collect::<Vec<_>>();
            if columns.is_empty() {
                let _ = write!(sql, " ON CONFLICT ({}) DO NOTHING", key.join(", "));
            } else {
                let updates = columns
                    .iter()
                    .map(|column| format!("{column} = EXCLUDED.{column}"))
                    .collect::<Vec<_>>();
                let current = columns
                    .iter()
                    .map(|column| format!("{}.{column}", table.name()))
                    .collect::<Vec<_>>();
                let incoming = columns
                    .iter()
                    .map(|column| format!("EXCLUDED.{column}"))
                    .collect::<Vec<_>>();
                // Identical rows are left untouched so RETURNING yields nothing.
                let _ = write!(
                    sql,
                    " ON CONFLICT ({}) DO UPDATE SET {} WHERE ({}) IS DISTINCT FROM ({})",
                    key.join(", "),
                    updates.join(", "),
                    current.join(", "),
                    incoming.join(", ")
                );
            }
        }
    }
    sql
}

pub fn update_columns<'r>(row: &'r Row, key: &'r [&'static str]) -> impl Iterator<Item = &'static str> + 'r {
    row.columns
        .iter()
        .map(|(column, _)| *column)
        .filter(move |column| !key.contains(column))
}

fn render_value<'a>(value: &'a Value, param: &mut impl FnMut(Param<'a>) -> String) -> String {
    match value {
        Value::Text(text) => param(Param::Text(text)),
        Value::Int(n) => param(Param::Int(*n)),
        Value::Date(date) => param(Param::Date(*date)),
        Value::Ref { table, key } => format!(
            "(SELECT id FROM {SCHEMA}.{} WHERE {} = {})",
            table.name(),
            natural_key_column(*table),
            param(Param::Text(key))
        ),
    }
}

pub fn natural_key_column(table: Table) -> &'static str {
    match table {
        Table::Coaches => "name",
        Table::Periods => "period_name",
        Table::Metrics => "id",
    }
}

pub fn render_sql(operations: &[Operation]) -> String {
    let mut script = String::from("BEGIN;\n");
    for op in operations {
        script.push_str(&build_statement(op, literal));
        script.push_str(";\n");
    }
    script.push_str("COMMIT;\n");
    script
}

fn literal(param: Param<'_>) -> String {
    match param {
        Param::NewId => "gen_random_uuid()".to_string(),
        Param::Text(text) => format!("'{}'", text.replace('\'', "''")),
        Param::Int(n) => n.to_string(),
        Param::Date(Some(date)) => format!("DATE '{}'", date.format("%Y-%m-%d")),
        Param::Date(None) => "NULL".to_string(),
    }
}
