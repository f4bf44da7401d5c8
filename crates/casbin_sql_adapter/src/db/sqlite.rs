//! Embedded SQLite client.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections for the rule table.
//! - Execute structured statements and scan rows into [`CasbinRule`].
//!
//! # Invariants
//! - Write transactions take the database lock up front (`IMMEDIATE`).
//! - `NULL` string columns are read as empty fields.

use super::dialect::Dialect;
use super::statement::{Select, SqlSink, Statement, Value};
use super::{Client, ClientTx, DbResult};
use crate::model::rule::{CasbinRule, FIELD_COUNT};
use log::{error, info};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// [`Client`] backed by a `rusqlite` connection.
#[derive(Debug)]
pub struct SqliteClient {
    conn: Connection,
}

impl SqliteClient {
    /// Opens (or creates) a SQLite database file.
    ///
    /// # Side effects
    /// - Emits `db_open` logging events with duration and status.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        open_with("file", || Connection::open(path))
    }

    /// Opens a private in-memory SQLite database.
    ///
    /// # Side effects
    /// - Emits `db_open` logging events with duration and status.
    pub fn open_in_memory() -> DbResult<Self> {
        open_with("memory", Connection::open_in_memory)
    }

    /// Borrows the underlying connection, e.g. for schema setup.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Client for SqliteClient {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn begin(&mut self) -> DbResult<Box<dyn ClientTx + '_>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(Box::new(SqliteTx { tx }))
    }

    fn query(&mut self, select: &Select) -> DbResult<Vec<CasbinRule>> {
        query_rules(&self.conn, select)
    }

    fn execute(&mut self, statement: &Statement) -> DbResult<u64> {
        execute_statement(&self.conn, statement)
    }
}

struct SqliteTx<'conn> {
    tx: Transaction<'conn>,
}

impl ClientTx for SqliteTx<'_> {
    fn query(&mut self, select: &Select) -> DbResult<Vec<CasbinRule>> {
        query_rules(&self.tx, select)
    }

    fn execute(&mut self, statement: &Statement) -> DbResult<u64> {
        execute_statement(&self.tx, statement)
    }

    fn commit(self: Box<Self>) -> DbResult<()> {
        let SqliteTx { tx } = *self;
        tx.commit()?;
        Ok(())
    }

    fn rollback(self: Box<Self>) -> DbResult<()> {
        let SqliteTx { tx } = *self;
        tx.rollback()?;
        Ok(())
    }
}

fn open_with(
    mode: &'static str,
    open: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<SqliteClient> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let conn = match open() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&conn) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={mode} duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(SqliteClient { conn })
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_bootstrap_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &Connection) -> DbResult<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(())
}

/// SQL text with positional `?` markers and the values they bind.
#[derive(Default)]
struct SqliteSql {
    sql: String,
    params: Vec<SqlValue>,
}

impl SqlSink for SqliteSql {
    fn push_sql(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    fn push_value(&mut self, value: &Value) {
        self.sql.push('?');
        self.params.push(match value {
            Value::Text(text) => SqlValue::Text(text.clone()),
            Value::Integer(number) => SqlValue::Integer(*number),
        });
    }
}

fn query_rules(conn: &Connection, select: &Select) -> DbResult<Vec<CasbinRule>> {
    let mut query = SqliteSql::default();
    select.write_to(Dialect::Sqlite, &mut query);
    let mut stmt = conn.prepare(&query.sql)?;
    let mut rows = stmt.query(params_from_iter(query.params))?;

    let mut rules = Vec::new();
    while let Some(row) = rows.next()? {
        rules.push(parse_rule_row(row)?);
    }
    Ok(rules)
}

fn execute_statement(conn: &Connection, statement: &Statement) -> DbResult<u64> {
    let mut affected = 0_u64;
    for part in statement.split(Dialect::Sqlite) {
        let mut command = SqliteSql::default();
        part.write_to(Dialect::Sqlite, &mut command);
        let changed = conn.execute(&command.sql, params_from_iter(command.params))?;
        affected += changed as u64;
    }
    Ok(affected)
}

// Column order is fixed by `Select::write_to`: id, ptype, v0..v7.
fn parse_rule_row(row: &Row<'_>) -> DbResult<CasbinRule> {
    let id: i64 = row.get(0)?;
    let ptype = row.get::<_, Option<String>>(1)?.unwrap_or_default();
    let mut values = Vec::with_capacity(FIELD_COUNT);
    for position in 0..FIELD_COUNT {
        values.push(row.get::<_, Option<String>>(position + 2)?.unwrap_or_default());
    }
    Ok(CasbinRule::from_stored(id, ptype, values))
}
