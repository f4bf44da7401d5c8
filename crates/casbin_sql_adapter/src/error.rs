//! Adapter error type.

use crate::db::{DbError, Dialect};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type AdapterResult<T> = Result<T, AdapterError>;

#[derive(Debug)]
pub enum AdapterError {
    /// Driver identifier outside the supported set.
    UnknownDriver(String),
    /// Schema or table name that is empty or holds control characters.
    InvalidTableName(String),
    /// Filtered load received a value that is not a `Filter`.
    InvalidFilterType { expected: &'static str },
    /// A connector returned a client for another dialect than the driver
    /// name resolved to.
    DialectMismatch { expected: Dialect, actual: Dialect },
    /// A filter binds more values than the dialect accepts in one query.
    FilterTooLarge { params: usize, limit: usize },
    /// Connection, statement or commit failure from the database layer.
    Db(DbError),
    /// A unit of work failed and rolling its transaction back failed too.
    Rollback {
        cause: Box<AdapterError>,
        rollback: DbError,
    },
}

impl Display for AdapterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownDriver(name) => write!(f, "unknown driver: `{name}`"),
            Self::InvalidTableName(name) => write!(f, "invalid table identifier: `{name}`"),
            Self::InvalidFilterType { expected } => {
                write!(f, "invalid filter type: expected `{expected}`")
            }
            Self::DialectMismatch { expected, actual } => write!(
                f,
                "connector returned a `{actual}` client for driver dialect `{expected}`"
            ),
            Self::FilterTooLarge { params, limit } => write!(
                f,
                "filter binds {params} values, more than the {limit} allowed in one query"
            ),
            Self::Db(err) => write!(f, "{err}"),
            Self::Rollback { cause, rollback } => {
                write!(f, "{cause}: rolling back transaction: {rollback}")
            }
        }
    }
}

impl Error for AdapterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::UnknownDriver(_) => None,
            Self::InvalidTableName(_) => None,
            Self::InvalidFilterType { .. } => None,
            Self::DialectMismatch { .. } => None,
            Self::FilterTooLarge { .. } => None,
            Self::Db(err) => Some(err),
            Self::Rollback { cause, .. } => Some(cause.as_ref()),
        }
    }
}

impl From<DbError> for AdapterError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for AdapterError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
