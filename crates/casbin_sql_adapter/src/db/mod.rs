//! Database-access seam used by the adapter.
//!
//! # Responsibility
//! - Define the capabilities the adapter consumes: open a client, begin a
//!   transaction, run structured selects and mutations.
//! - Provide the built-in clients: embedded SQLite, and Postgres/MySQL
//!   through `sqlx` when the matching cargo feature is on.
//!
//! # Invariants
//! - Dropping a [`ClientTx`] that was neither committed nor rolled back
//!   rolls it back.
//! - Clients write statements with their own [`Dialect`].

use crate::model::rule::CasbinRule;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

pub mod dialect;
#[cfg(feature = "mysql")]
mod mysql;
#[cfg(feature = "postgres")]
mod postgres;
mod sqlite;
#[cfg(any(feature = "postgres", feature = "mysql"))]
mod sqlx_runtime;
pub mod statement;

pub use dialect::Dialect;
#[cfg(feature = "mysql")]
pub use mysql::MySqlClient;
#[cfg(feature = "postgres")]
pub use postgres::PostgresClient;
pub use sqlite::SqliteClient;
pub use statement::{Select, SqlSink, Statement, Value};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    #[cfg(any(feature = "postgres", feature = "mysql"))]
    Sqlx(sqlx::Error),
    /// The dialect resolved, but this build carries no client for it.
    DriverUnavailable(Dialect),
    /// Failure reported by an external client implementation.
    Driver(Box<dyn Error + Send + Sync + 'static>),
}

impl DbError {
    pub fn driver(err: impl Into<Box<dyn Error + Send + Sync + 'static>>) -> Self {
        Self::Driver(err.into())
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            #[cfg(any(feature = "postgres", feature = "mysql"))]
            Self::Sqlx(err) => write!(f, "{err}"),
            Self::DriverUnavailable(dialect) => write!(
                f,
                "no built-in client for `{dialect}`; open the adapter with a connector"
            ),
            Self::Driver(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            #[cfg(any(feature = "postgres", feature = "mysql"))]
            Self::Sqlx(err) => Some(err),
            Self::DriverUnavailable(_) => None,
            Self::Driver(err) => Some(err.as_ref()),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

#[cfg(any(feature = "postgres", feature = "mysql"))]
impl From<sqlx::Error> for DbError {
    fn from(value: sqlx::Error) -> Self {
        Self::Sqlx(value)
    }
}

/// Open transaction on a [`Client`].
pub trait ClientTx {
    fn query(&mut self, select: &Select) -> DbResult<Vec<CasbinRule>>;
    /// Returns the number of affected rows.
    fn execute(&mut self, statement: &Statement) -> DbResult<u64>;
    fn commit(self: Box<Self>) -> DbResult<()>;
    fn rollback(self: Box<Self>) -> DbResult<()>;
}

/// Connection handle to the database holding the rule table.
pub trait Client: Debug {
    fn dialect(&self) -> Dialect;
    fn begin(&mut self) -> DbResult<Box<dyn ClientTx + '_>>;
    fn query(&mut self, select: &Select) -> DbResult<Vec<CasbinRule>>;
    fn execute(&mut self, statement: &Statement) -> DbResult<u64>;
}

impl<C: Client + ?Sized> Client for Box<C> {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn begin(&mut self) -> DbResult<Box<dyn ClientTx + '_>> {
        (**self).begin()
    }

    fn query(&mut self, select: &Select) -> DbResult<Vec<CasbinRule>> {
        (**self).query(select)
    }

    fn execute(&mut self, statement: &Statement) -> DbResult<u64> {
        (**self).execute(statement)
    }
}

/// Opens a [`Client`] for a resolved dialect and a data source string.
///
/// Any `Fn(Dialect, &str) -> DbResult<C>` is a connector.
pub trait Connector {
    type Client: Client;

    fn connect(&self, dialect: Dialect, data_source: &str) -> DbResult<Self::Client>;
}

impl<F, C> Connector for F
where
    F: Fn(Dialect, &str) -> DbResult<C>,
    C: Client,
{
    type Client = C;

    fn connect(&self, dialect: Dialect, data_source: &str) -> DbResult<C> {
        self(dialect, data_source)
    }
}

/// Connector backed by the clients compiled into this crate.
///
/// Postgres and MySQL connect through `sqlx` (features `postgres`, `mysql`).
/// Other dialects fail with [`DbError::DriverUnavailable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinConnector;

impl Connector for BuiltinConnector {
    type Client = Box<dyn Client>;

    fn connect(&self, dialect: Dialect, data_source: &str) -> DbResult<Box<dyn Client>> {
        match dialect {
            #[cfg(feature = "postgres")]
            Dialect::Postgres => Ok(Box::new(PostgresClient::connect(data_source)?)),
            #[cfg(feature = "mysql")]
            Dialect::MySql => Ok(Box::new(MySqlClient::connect(data_source)?)),
            other => {
                let _ = data_source;
                Err(DbError::DriverUnavailable(other))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BuiltinConnector, Connector, DbError, Dialect};

    #[test]
    fn builtin_connector_has_no_mssql_client() {
        let err = BuiltinConnector
            .connect(Dialect::MsSql, "sqlserver://localhost")
            .unwrap_err();
        assert!(matches!(err, DbError::DriverUnavailable(Dialect::MsSql)));
        assert!(err.to_string().contains("`mssql`"));
    }

    #[cfg(feature = "postgres")]
    #[test]
    fn builtin_connector_reports_malformed_postgres_url() {
        let err = BuiltinConnector
            .connect(Dialect::Postgres, "not a url")
            .unwrap_err();
        assert!(matches!(err, DbError::Sqlx(_)));
    }

    #[cfg(feature = "mysql")]
    #[test]
    fn builtin_connector_reports_malformed_mysql_url() {
        let err = BuiltinConnector
            .connect(Dialect::MySql, "not a url")
            .unwrap_err();
        assert!(matches!(err, DbError::Sqlx(_)));
    }
}
