//! SQL persistence adapter for Casbin-style policy engines.
//! Stores rule tuples as rows of one wide table and drives every mutation
//! through its own transaction.

pub mod adapter;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod model;
pub mod policy;

pub use adapter::Adapter;
pub use config::{
    with_table_name, AdapterConfig, AdapterOption, TableName, DEFAULT_SCHEMA_NAME,
    DEFAULT_TABLE_NAME,
};
#[cfg(feature = "mysql")]
pub use db::MySqlClient;
#[cfg(feature = "postgres")]
pub use db::PostgresClient;
pub use db::{
    BuiltinConnector, Client, ClientTx, Connector, DbError, DbResult, Dialect, SqlSink,
    SqliteClient,
};
pub use error::{AdapterError, AdapterResult};
pub use logging::{init_logging, logging_status, LogTarget};
pub use model::filter::{FieldFilter, Filter};
pub use model::rule::CasbinRule;
pub use policy::adapter::PolicyAdapter;
pub use policy::line::load_policy_line;
pub use policy::model::Model;

/// Returns the crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
