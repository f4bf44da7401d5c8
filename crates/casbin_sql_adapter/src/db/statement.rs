//! Structured statements over the rule table.
//!
//! # Responsibility
//! - Describe selects and mutations without committing to a SQL dialect.
//! - Write them into a [`SqlSink`], which owns placeholder syntax and binding.
//!
//! # Invariants
//! - Every value goes through [`SqlSink::push_value`]; only quoted table names
//!   and fixed column names are written as SQL text.
//! - [`Statement::split`] keeps every insert under the dialect's bind limit.

use crate::config::TableName;
use crate::db::dialect::Dialect;
use crate::model::rule::{CasbinRule, FIELD_COUNT};

const FIELD_COLUMNS: [&str; FIELD_COUNT] = ["v0", "v1", "v2", "v3", "v4", "v5", "v6", "v7"];
const INSERT_COLUMN_COUNT: usize = FIELD_COUNT + 1;
const MAX_ROWS_PER_INSERT: usize = 1_000;

/// Bound parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Integer(i64),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

/// Target a statement is written into: SQL text interleaved with bound values.
///
/// Driver query builders implement this, so placeholders are always the
/// driver's own.
pub trait SqlSink {
    fn push_sql(&mut self, sql: &str);
    fn push_value(&mut self, value: &Value);
}

/// Column of the rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Id,
    Ptype,
    /// Positional field `v0..v7`.
    Field(usize),
}

impl Column {
    pub fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Ptype => "ptype",
            Self::Field(position) => FIELD_COLUMNS[position],
        }
    }
}

/// One `WHERE` conjunct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Eq(Column, Value),
    /// Never written with an empty list; callers skip empty inclusion sets.
    In(Column, Vec<String>),
}

impl Predicate {
    fn bind_count(&self) -> usize {
        match self {
            Self::Eq(..) => 1,
            Self::In(_, values) => values.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    pub table: TableName,
    pub predicates: Vec<Predicate>,
    pub order_by_id: bool,
}

impl Select {
    pub fn new(table: &TableName) -> Self {
        Self {
            table: table.clone(),
            predicates: Vec::new(),
            order_by_id: false,
        }
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn filter_all(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.predicates.extend(predicates);
        self
    }

    pub fn order_by_id(mut self) -> Self {
        self.order_by_id = true;
        self
    }

    /// Number of values the select binds.
    pub fn bind_count(&self) -> usize {
        self.predicates.iter().map(Predicate::bind_count).sum()
    }

    pub fn write_to(&self, dialect: Dialect, sink: &mut impl SqlSink) {
        sink.push_sql(&format!(
            "SELECT id, ptype, {} FROM {}",
            FIELD_COLUMNS.join(", "),
            self.table.quoted(dialect)
        ));
        write_where(sink, &self.predicates);
        if self.order_by_id {
            sink.push_sql(" ORDER BY id ASC");
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insert {
    pub table: TableName,
    pub rows: Vec<CasbinRule>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub table: TableName,
    pub assignments: Vec<(Column, Value)>,
    pub predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delete {
    pub table: TableName,
    pub predicates: Vec<Predicate>,
}

/// Mutation or DDL statement against the rule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Insert(Insert),
    Update(Update),
    Delete(Delete),
    Truncate(TableName),
    CreateTable(TableName),
}

impl Statement {
    /// Splits into statements that each fit `dialect`'s bind limit.
    ///
    /// Only inserts are split; an insert without rows yields nothing.
    pub fn split(&self, dialect: Dialect) -> Vec<Statement> {
        let Self::Insert(insert) = self else {
            return vec![self.clone()];
        };
        let rows_per_batch = (dialect.max_bind_params() / INSERT_COLUMN_COUNT)
            .clamp(1, MAX_ROWS_PER_INSERT);
        insert
            .rows
            .chunks(rows_per_batch)
            .map(|batch| {
                Self::Insert(Insert {
                    table: insert.table.clone(),
                    rows: batch.to_vec(),
                })
            })
            .collect()
    }

    /// Writes the statement as one SQL command. Call [`Statement::split`]
    /// first for inserts of unknown size.
    pub fn write_to(&self, dialect: Dialect, sink: &mut impl SqlSink) {
        match self {
            Self::Insert(insert) => write_insert(insert, dialect, sink),
            Self::Update(update) => {
                sink.push_sql(&format!("UPDATE {} SET ", update.table.quoted(dialect)));
                for (index, (column, value)) in update.assignments.iter().enumerate() {
                    if index > 0 {
                        sink.push_sql(", ");
                    }
                    sink.push_sql(&format!("{} = ", column.name()));
                    sink.push_value(value);
                }
                write_where(sink, &update.predicates);
            }
            Self::Delete(delete) => {
                sink.push_sql(&format!("DELETE FROM {}", delete.table.quoted(dialect)));
                write_where(sink, &delete.predicates);
            }
            Self::Truncate(table) => sink.push_sql(&dialect.truncate_sql(&table.quoted(dialect))),
            Self::CreateTable(table) => write_create_table(table, dialect, sink),
        }
    }
}

fn write_where(sink: &mut impl SqlSink, predicates: &[Predicate]) {
    for (index, predicate) in predicates.iter().enumerate() {
        sink.push_sql(if index == 0 { " WHERE " } else { " AND " });
        match predicate {
            Predicate::Eq(column, value) => {
                sink.push_sql(&format!("{} = ", column.name()));
                sink.push_value(value);
            }
            Predicate::In(column, values) => {
                sink.push_sql(&format!("{} IN (", column.name()));
                for (position, value) in values.iter().enumerate() {
                    if position > 0 {
                        sink.push_sql(", ");
                    }
                    sink.push_value(&Value::Text(value.clone()));
                }
                sink.push_sql(")");
            }
        }
    }
}

fn write_insert(insert: &Insert, dialect: Dialect, sink: &mut impl SqlSink) {
    sink.push_sql(&format!(
        "INSERT INTO {} (ptype, {}) VALUES ",
        insert.table.quoted(dialect),
        FIELD_COLUMNS.join(", ")
    ));
    for (index, row) in insert.rows.iter().enumerate() {
        sink.push_sql(if index == 0 { "(" } else { ", (" });
        sink.push_value(&Value::from(row.ptype.as_str()));
        for value in row.stored_values() {
            sink.push_sql(", ");
            sink.push_value(&Value::from(value));
        }
        sink.push_sql(")");
    }
}

fn write_create_table(table: &TableName, dialect: Dialect, sink: &mut impl SqlSink) {
    let text = dialect.text_column();
    let mut columns = vec![
        format!("id {}", dialect.identity_column()),
        format!("ptype {text} NOT NULL DEFAULT ''"),
    ];
    columns.extend(
        FIELD_COLUMNS
            .iter()
            .map(|column| format!("{column} {text} NOT NULL DEFAULT ''")),
    );
    sink.push_sql(&dialect.create_table_if_missing(&table.quoted(dialect), &columns.join(", ")));
}
