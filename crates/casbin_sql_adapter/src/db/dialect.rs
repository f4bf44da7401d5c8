//! SQL dialect resolution and per-dialect syntax.

use std::fmt::{Display, Formatter};

/// SQL dialect a client speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Postgres,
    MySql,
    MsSql,
    /// Dialect of the embedded SQLite client. No driver name resolves to it.
    Sqlite,
}

impl Dialect {
    /// Resolves a driver identifier, ignoring ASCII case.
    ///
    /// Accepts `pg`, `postgre`, `postgres`, `postgresql`, `mysql` and `mssql`.
    pub fn from_driver_name(driver_name: &str) -> Option<Self> {
        match driver_name.to_ascii_lowercase().as_str() {
            "pg" | "postgre" | "postgres" | "postgresql" => Some(Self::Postgres),
            "mysql" => Some(Self::MySql),
            "mssql" => Some(Self::MsSql),
            _ => None,
        }
    }

    /// Quotes one identifier, doubling any closing quote it contains.
    pub fn quote_identifier(self, name: &str) -> String {
        match self {
            Self::Postgres | Self::Sqlite => format!("\"{}\"", name.replace('"', "\"\"")),
            Self::MySql => format!("`{}`", name.replace('`', "``")),
            Self::MsSql => format!("[{}]", name.replace(']', "]]")),
        }
    }

    /// Upper bound of bind parameters accepted by one statement.
    pub fn max_bind_params(self) -> usize {
        match self {
            Self::Postgres => 65_535,
            Self::MySql => 65_535,
            // SQL Server rejects 2100 and above.
            Self::MsSql => 2_099,
            Self::Sqlite => 32_766,
        }
    }

    /// Statement that removes every row of `table`.
    pub fn truncate_sql(self, table: &str) -> String {
        match self {
            Self::Sqlite => format!("DELETE FROM {table}"),
            Self::Postgres | Self::MySql | Self::MsSql => format!("TRUNCATE TABLE {table}"),
        }
    }

    /// Column type of the auto-increment identity column.
    pub(crate) fn identity_column(self) -> &'static str {
        match self {
            Self::Postgres => "BIGSERIAL PRIMARY KEY",
            Self::MySql => "BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY",
            Self::MsSql => "BIGINT IDENTITY(1,1) PRIMARY KEY",
            Self::Sqlite => "INTEGER PRIMARY KEY AUTOINCREMENT",
        }
    }

    /// Column type of the string columns.
    pub(crate) fn text_column(self) -> &'static str {
        match self {
            Self::Postgres | Self::MySql => "VARCHAR(255)",
            Self::MsSql => "NVARCHAR(255)",
            Self::Sqlite => "TEXT",
        }
    }

    /// Wraps a `CREATE TABLE` body so it is a no-op when `table` exists.
    pub(crate) fn create_table_if_missing(self, table: &str, columns: &str) -> String {
        match self {
            Self::MsSql => format!(
                "IF OBJECT_ID(N'{}', N'U') IS NULL CREATE TABLE {table} ({columns})",
                table.replace('\'', "''")
            ),
            Self::Postgres | Self::MySql | Self::Sqlite => {
                format!("CREATE TABLE IF NOT EXISTS {table} ({columns})")
            }
        }
    }
}

impl Display for Dialect {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::MsSql => "mssql",
            Self::Sqlite => "sqlite",
        };
        f.write_str(name)
    }
}
