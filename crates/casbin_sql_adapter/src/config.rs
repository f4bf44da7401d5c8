//! Adapter configuration surface.
//!
//! # Responsibility
//! - Hold the driver identifier, data source and table override.
//! - Validate schema/table names before they reach SQL text.
//!
//! # Invariants
//! - A [`TableName`] has a non-empty table part and no control characters.
//!   It reaches SQL text only through [`TableName::quoted`].
//! - Options are applied in the order they are given.

use crate::db::Dialect;
use crate::error::{AdapterError, AdapterResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const DEFAULT_SCHEMA_NAME: &str = "public";
pub const DEFAULT_TABLE_NAME: &str = "casbin_rule";

static PRINTABLE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\x00-\x1F\x7F]+$").expect("valid table name regex"));

/// Schema-qualified name of the rule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    schema: String,
    table: String,
}

impl TableName {
    /// Validates and builds a table name. An empty `schema` leaves the table
    /// unqualified.
    ///
    /// Any printable text is accepted (`casbin-rules`, `Auth Rules`); names
    /// are quoted per dialect when rendered.
    pub fn new(schema: &str, table: &str) -> AdapterResult<Self> {
        if !schema.is_empty() && !PRINTABLE_NAME_RE.is_match(schema) {
            return Err(AdapterError::InvalidTableName(schema.to_string()));
        }
        if !PRINTABLE_NAME_RE.is_match(table) {
            return Err(AdapterError::InvalidTableName(table.to_string()));
        }
        Ok(Self {
            schema: schema.to_string(),
            table: table.to_string(),
        })
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Quoted `schema.table` for `dialect`, ready to splice into SQL.
    pub fn quoted(&self, dialect: Dialect) -> String {
        let table = dialect.quote_identifier(&self.table);
        if self.schema.is_empty() {
            table
        } else {
            format!("{}.{table}", dialect.quote_identifier(&self.schema))
        }
    }

    /// Returns `schema.table`, or just `table` when no schema is set.
    /// Unquoted; for display only.
    pub fn qualified(&self) -> String {
        if self.schema.is_empty() {
            self.table.clone()
        } else {
            format!("{}.{}", self.schema, self.table)
        }
    }
}

impl Default for TableName {
    fn default() -> Self {
        Self {
            schema: DEFAULT_SCHEMA_NAME.to_string(),
            table: DEFAULT_TABLE_NAME.to_string(),
        }
    }
}

impl Display for TableName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.qualified())
    }
}

/// Construction-time adapter option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterOption {
    /// Overrides schema and table for every later statement.
    TableName { schema: String, table: String },
}

/// Builds an [`AdapterOption::TableName`] override.
pub fn with_table_name(schema: impl Into<String>, table: impl Into<String>) -> AdapterOption {
    AdapterOption::TableName {
        schema: schema.into(),
        table: table.into(),
    }
}

/// Settings resolved from a sequence of options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct AdapterSettings {
    pub(crate) table: TableName,
}

impl AdapterSettings {
    pub(crate) fn from_options(
        options: impl IntoIterator<Item = AdapterOption>,
    ) -> AdapterResult<Self> {
        let mut settings = Self::default();
        for option in options {
            match option {
                AdapterOption::TableName { schema, table } => {
                    settings.table = TableName::new(&schema, &table)?;
                }
            }
        }
        Ok(settings)
    }
}

/// Serializable adapter configuration.
///
/// `schema` and `table` are optional; when either is given the other falls
/// back to its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterConfig {
    pub driver: String,
    pub data_source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
}

impl AdapterConfig {
    pub fn new(driver: impl Into<String>, data_source: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            data_source: data_source.into(),
            schema: None,
            table: None,
        }
    }

    /// Returns the options this configuration implies.
    pub fn options(&self) -> Vec<AdapterOption> {
        if self.schema.is_none() && self.table.is_none() {
            return Vec::new();
        }
        vec![with_table_name(
            self.schema.as_deref().unwrap_or(DEFAULT_SCHEMA_NAME),
            self.table.as_deref().unwrap_or(DEFAULT_TABLE_NAME),
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::{with_table_name, AdapterConfig, AdapterSettings, TableName};
    use crate::db::Dialect;
    use crate::error::AdapterError;

    #[test]
    fn default_table_is_public_casbin_rule() {
        assert_eq!(TableName::default().qualified(), "public.casbin_rule");
    }

    #[test]
    fn empty_schema_leaves_table_unqualified() {
        let name = TableName::new("", "rules").unwrap();
        assert_eq!(name.qualified(), "rules");
        assert_eq!(name.to_string(), "rules");
    }

    #[test]
    fn names_with_punctuation_are_accepted_and_quoted() {
        let name = TableName::new("auth-db", "casbin-rule").unwrap();
        assert_eq!(name.qualified(), "auth-db.casbin-rule");
        assert_eq!(name.quoted(Dialect::Postgres), "\"auth-db\".\"casbin-rule\"");
        assert_eq!(name.quoted(Dialect::MySql), "`auth-db`.`casbin-rule`");

        let hostile = TableName::new("", "rules\"; DROP TABLE users; --").unwrap();
        assert_eq!(
            hostile.quoted(Dialect::Sqlite),
            "\"rules\"\"; DROP TABLE users; --\""
        );
    }

    #[test]
    fn empty_or_control_character_names_are_rejected() {
        for (schema, table) in [("public", ""), ("pub\nlic", "rules"), ("public", "ru\0les")] {
            let err = TableName::new(schema, table).unwrap_err();
            assert!(matches!(err, AdapterError::InvalidTableName(_)), "{schema}.{table}");
        }
    }

    #[test]
    fn later_options_override_earlier_ones() {
        let settings = AdapterSettings::from_options([
            with_table_name("auth", "first"),
            with_table_name("auth", "second"),
        ])
        .unwrap();
        assert_eq!(settings.table.qualified(), "auth.second");
    }

    #[test]
    fn config_deserializes_and_fills_missing_table_parts() {
        let config: AdapterConfig = serde_json::from_str(
            r#"{"driver":"postgres","data_source":"postgres://localhost/auth","table":"rules"}"#,
        )
        .unwrap();
        assert_eq!(config.schema, None);

        let settings = AdapterSettings::from_options(config.options()).unwrap();
        assert_eq!(settings.table.qualified(), "public.rules");
    }

    #[test]
    fn config_without_override_yields_no_options() {
        let config = AdapterConfig::new("mysql", "user:pass@tcp(localhost)/auth");
        assert!(config.options().is_empty());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("schema"));
    }
}
