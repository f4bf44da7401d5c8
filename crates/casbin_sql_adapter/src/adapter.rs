//! SQL-backed policy adapter.
//!
//! # Responsibility
//! - Map engine rule tuples to rows of one wide table and back.
//! - Run every mutation inside its own database transaction.
//!
//! # Invariants
//! - Matching for remove/update compares `ptype` and `V0..V5` literally,
//!   empty fields included; `V6`/`V7` never take part.
//! - A failed or panicking unit of work is rolled back before the failure
//!   leaves the adapter.
//! - The filtered flag only turns on after a successful filtered load and
//!   never turns off.

use crate::config::{AdapterConfig, AdapterOption, AdapterSettings, TableName};
use crate::db::statement::{Column, Delete, Insert, Predicate, Select, Statement, Update, Value};
use crate::db::{BuiltinConnector, Client, ClientTx, Connector, Dialect};
use crate::error::{AdapterError, AdapterResult};
use crate::model::filter::{FieldFilter, Filter};
use crate::model::rule::{CasbinRule, MATCH_FIELD_COUNT};
use crate::policy::adapter::PolicyAdapter;
use crate::policy::line::load_policy_line;
use crate::policy::model::Model;
use log::{debug, error, info};
use std::any::{type_name, Any};
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

/// Sections written by a full save.
const SAVED_SECTIONS: [&str; 2] = ["p", "g"];

/// Policy adapter over a [`Client`].
#[derive(Debug)]
pub struct Adapter<C: Client> {
    client: C,
    table: TableName,
    filtered: bool,
}

impl Adapter<Box<dyn Client>> {
    /// Resolves `driver_name` to a dialect and connects with the client
    /// compiled into this crate for it (see [`BuiltinConnector`]).
    ///
    /// # Errors
    /// - `UnknownDriver` when the driver is not postgres, mysql or mssql.
    /// - `InvalidTableName` when a table override is empty or holds control
    ///   characters.
    /// - `Db(DriverUnavailable)` when this build has no client for the
    ///   dialect; use [`Adapter::open_with`] and a custom connector instead.
    pub fn open(
        driver_name: &str,
        data_source: &str,
        options: impl IntoIterator<Item = AdapterOption>,
    ) -> AdapterResult<Self> {
        Self::open_with(&BuiltinConnector, driver_name, data_source, options)
    }

    /// [`Adapter::open`] driven by a configuration record.
    pub fn from_config(config: &AdapterConfig) -> AdapterResult<Self> {
        Self::from_config_with(&BuiltinConnector, config)
    }
}

impl<C: Client> Adapter<C> {
    /// Resolves `driver_name` to a dialect, opens a client through
    /// `connector` and applies `options` in order.
    ///
    /// # Errors
    /// - `UnknownDriver` when the driver is not postgres, mysql or mssql.
    /// - `InvalidTableName` when a table override is empty or holds control
    ///   characters.
    /// - `DialectMismatch` when the client speaks another dialect than the
    ///   driver name resolved to.
    /// - Whatever the connector reports, unchanged.
    pub fn open_with<K>(
        connector: &K,
        driver_name: &str,
        data_source: &str,
        options: impl IntoIterator<Item = AdapterOption>,
    ) -> AdapterResult<Self>
    where
        K: Connector<Client = C>,
    {
        let dialect = Dialect::from_driver_name(driver_name)
            .ok_or_else(|| AdapterError::UnknownDriver(driver_name.to_string()))?;
        let settings = AdapterSettings::from_options(options)?;
        let client = connector.connect(dialect, data_source)?;
        let actual = client.dialect();
        if actual != dialect {
            error!(
                "event=adapter_open module=adapter status=error dialect={dialect} client_dialect={actual} error_code=dialect_mismatch"
            );
            return Err(AdapterError::DialectMismatch {
                expected: dialect,
                actual,
            });
        }
        info!(
            "event=adapter_open module=adapter status=ok dialect={dialect} table={}",
            settings.table
        );
        Ok(Self::from_settings(client, settings))
    }

    /// [`Adapter::open_with`] driven by a configuration record.
    pub fn from_config_with<K>(connector: &K, config: &AdapterConfig) -> AdapterResult<Self>
    where
        K: Connector<Client = C>,
    {
        Self::open_with(
            connector,
            &config.driver,
            &config.data_source,
            config.options(),
        )
    }

    /// Wraps an already connected client.
    ///
    /// The target table is neither checked nor created; see
    /// [`Adapter::ensure_table`].
    pub fn with_client(
        client: C,
        options: impl IntoIterator<Item = AdapterOption>,
    ) -> AdapterResult<Self> {
        let settings = AdapterSettings::from_options(options)?;
        Ok(Self::from_settings(client, settings))
    }

    fn from_settings(client: C, settings: AdapterSettings) -> Self {
        Self {
            client,
            table: settings.table,
            filtered: false,
        }
    }

    pub fn table_name(&self) -> &TableName {
        &self.table
    }

    pub fn dialect(&self) -> Dialect {
        self.client.dialect()
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Creates the rule table when it does not exist yet.
    pub fn ensure_table(&mut self) -> AdapterResult<()> {
        self.client
            .execute(&Statement::CreateTable(self.table.clone()))?;
        info!(
            "event=table_ensure module=adapter status=ok table={}",
            self.table
        );
        Ok(())
    }

    /// Runs `unit` inside one transaction.
    ///
    /// Commits when `unit` returns `Ok`; the commit error, if any, is returned
    /// as is. Rolls back when `unit` returns `Err`, reporting a rollback
    /// failure alongside the original error. Rolls back and resumes the
    /// unwind when `unit` panics.
    fn with_tx<T>(
        &mut self,
        operation: &'static str,
        unit: impl FnOnce(&mut dyn ClientTx, &TableName) -> AdapterResult<T>,
    ) -> AdapterResult<T> {
        let started_at = Instant::now();
        let table = &self.table;
        let mut tx = self.client.begin()?;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| unit(&mut *tx, table)));
        match outcome {
            Ok(Ok(value)) => {
                tx.commit()?;
                debug!(
                    "event=policy_tx module=adapter status=ok op={operation} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(value)
            }
            Ok(Err(err)) => {
                error!(
                    "event=policy_tx module=adapter status=error op={operation} duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                match tx.rollback() {
                    Ok(()) => Err(err),
                    Err(rollback) => Err(AdapterError::Rollback {
                        cause: Box::new(err),
                        rollback,
                    }),
                }
            }
            Err(payload) => {
                error!("event=policy_tx module=adapter status=panic op={operation}");
                let _ = tx.rollback();
                panic::resume_unwind(payload)
            }
        }
    }

    fn load_rows(&mut self, select: &Select, model: &mut Model) -> AdapterResult<usize> {
        let params = select.bind_count();
        let limit = self.dialect().max_bind_params();
        if params > limit {
            return Err(AdapterError::FilterTooLarge { params, limit });
        }
        let rows = self.client.query(select)?;
        let mut loaded = 0;
        for line in rows.iter().filter_map(CasbinRule::to_policy_line) {
            if load_policy_line(&line, model) {
                loaded += 1;
            }
        }
        Ok(loaded)
    }
}

impl<C: Client> PolicyAdapter for Adapter<C> {
    fn load_policy(&mut self, model: &mut Model) -> AdapterResult<()> {
        let started_at = Instant::now();
        let select = Select::new(&self.table).order_by_id();
        let loaded = self.load_rows(&select, model)?;
        info!(
            "event=policy_load module=adapter status=ok filtered=false rules={loaded} duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    fn load_filtered_policy(&mut self, model: &mut Model, filter: &dyn Any) -> AdapterResult<()> {
        let Some(filter) = filter.downcast_ref::<Filter>() else {
            return Err(AdapterError::InvalidFilterType {
                expected: type_name::<Filter>(),
            });
        };

        let started_at = Instant::now();
        let select = Select::new(&self.table)
            .filter_all(inclusion_predicates(filter))
            .order_by_id();
        let loaded = self.load_rows(&select, model)?;
        self.filtered = true;
        info!(
            "event=policy_load module=adapter status=ok filtered=true rules={loaded} duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    fn is_filtered(&self) -> bool {
        self.filtered
    }

    fn save_policy(&mut self, model: &Model) -> AdapterResult<()> {
        let rows = SAVED_SECTIONS
            .iter()
            .flat_map(|sec| model.section(sec))
            .flat_map(|(ptype, rules)| {
                rules
                    .iter()
                    .map(move |rule| CasbinRule::from_policy(ptype, rule.as_slice()))
            })
            .collect::<Vec<_>>();
        let count = rows.len();

        self.with_tx("save_policy", |tx, table| {
            tx.execute(&Statement::Truncate(table.clone()))?;
            insert_rows(tx, table, rows)?;
            Ok(())
        })?;
        info!("event=policy_save module=adapter status=ok rules={count}");
        Ok(())
    }

    fn add_policy(&mut self, _sec: &str, ptype: &str, rule: &[String]) -> AdapterResult<()> {
        let row = CasbinRule::from_policy(ptype, rule);
        self.with_tx("add_policy", |tx, table| {
            insert_rows(tx, table, vec![row])?;
            Ok(())
        })
    }

    fn add_policies(
        &mut self,
        _sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> AdapterResult<()> {
        let rows = rows_for(ptype, rules);
        self.with_tx("add_policies", |tx, table| {
            insert_rows(tx, table, rows)?;
            Ok(())
        })
    }

    fn remove_policy(&mut self, _sec: &str, ptype: &str, rule: &[String]) -> AdapterResult<()> {
        let row = CasbinRule::from_policy(ptype, rule);
        self.with_tx("remove_policy", |tx, table| {
            let removed = delete_exact(tx, table, &row)?;
            debug!("event=policy_remove module=adapter status=ok ptype={ptype} rows={removed}");
            Ok(())
        })
    }

    fn remove_policies(
        &mut self,
        _sec: &str,
        ptype: &str,
        rules: &[Vec<String>],
    ) -> AdapterResult<()> {
        let rows = rows_for(ptype, rules);
        self.with_tx("remove_policies", |tx, table| {
            for row in &rows {
                delete_exact(tx, table, row)?;
            }
            Ok(())
        })
    }

    fn remove_filtered_policy(
        &mut self,
        _sec: &str,
        ptype: &str,
        field_index: usize,
        field_values: &[String],
    ) -> AdapterResult<()> {
        let predicates = field_range_predicates(ptype, &FieldFilter::new(field_index, field_values));
        self.with_tx("remove_filtered_policy", |tx, table| {
            let removed = tx.execute(&Statement::Delete(Delete {
                table: table.clone(),
                predicates,
            }))?;
            debug!(
                "event=policy_remove module=adapter status=ok ptype={ptype} field_index={field_index} rows={removed}"
            );
            Ok(())
        })
    }

    fn update_policy(
        &mut self,
        _sec: &str,
        ptype: &str,
        old_rule: &[String],
        new_rule: &[String],
    ) -> AdapterResult<()> {
        let old_row = CasbinRule::from_policy(ptype, old_rule);
        let new_row = CasbinRule::from_policy(ptype, new_rule);
        self.with_tx("update_policy", |tx, table| {
            let assignments = (0..MATCH_FIELD_COUNT)
                .map(|position| {
                    (
                        Column::Field(position),
                        Value::from(new_row.field(position)),
                    )
                })
                .collect();
            tx.execute(&Statement::Update(Update {
                table: table.clone(),
                assignments,
                predicates: exact_predicates(&old_row),
            }))?;
            Ok(())
        })
    }

    fn update_policies(
        &mut self,
        _sec: &str,
        ptype: &str,
        old_rules: &[Vec<String>],
        new_rules: &[Vec<String>],
    ) -> AdapterResult<()> {
        let old_rows = rows_for(ptype, old_rules);
        let new_rows = rows_for(ptype, new_rules);
        self.with_tx("update_policies", |tx, table| {
            for row in &old_rows {
                delete_exact(tx, table, row)?;
            }
            insert_rows(tx, table, new_rows)?;
            Ok(())
        })
    }

    fn update_filtered_policies(
        &mut self,
        _sec: &str,
        ptype: &str,
        new_rules: &[Vec<String>],
        field_index: usize,
        field_values: &[String],
    ) -> AdapterResult<Vec<Vec<String>>> {
        let predicates = field_range_predicates(ptype, &FieldFilter::new(field_index, field_values));
        let new_rows = rows_for(ptype, new_rules);
        self.with_tx("update_filtered_policies", |tx, table| {
            let matched = tx.query(
                &Select::new(table)
                    .filter_all(predicates)
                    .order_by_id(),
            )?;
            for row in &matched {
                tx.execute(&Statement::Delete(Delete {
                    table: table.clone(),
                    predicates: vec![Predicate::Eq(Column::Id, Value::from(row.id))],
                }))?;
            }
            insert_rows(tx, table, new_rows)?;
            Ok(matched.iter().map(CasbinRule::to_policy).collect())
        })
    }
}

fn rows_for(ptype: &str, rules: &[Vec<String>]) -> Vec<CasbinRule> {
    rules
        .iter()
        .map(|rule| CasbinRule::from_policy(ptype, rule.as_slice()))
        .collect()
}

fn insert_rows(
    tx: &mut dyn ClientTx,
    table: &TableName,
    rows: Vec<CasbinRule>,
) -> AdapterResult<u64> {
    if rows.is_empty() {
        return Ok(0);
    }
    let inserted = tx.execute(&Statement::Insert(Insert {
        table: table.clone(),
        rows,
    }))?;
    Ok(inserted)
}

fn delete_exact(tx: &mut dyn ClientTx, table: &TableName, row: &CasbinRule) -> AdapterResult<u64> {
    let removed = tx.execute(&Statement::Delete(Delete {
        table: table.clone(),
        predicates: exact_predicates(row),
    }))?;
    Ok(removed)
}

/// `ptype = ? AND v0 = ? AND ... AND v5 = ?`.
fn exact_predicates(row: &CasbinRule) -> Vec<Predicate> {
    let mut predicates = vec![Predicate::Eq(Column::Ptype, Value::from(row.ptype.as_str()))];
    predicates.extend((0..MATCH_FIELD_COUNT).map(|position| {
        Predicate::Eq(Column::Field(position), Value::from(row.field(position)))
    }));
    predicates
}

fn field_range_predicates(ptype: &str, filter: &FieldFilter) -> Vec<Predicate> {
    let mut predicates = vec![Predicate::Eq(Column::Ptype, Value::from(ptype))];
    predicates.extend(
        filter
            .bindings()
            .into_iter()
            .map(|(position, value)| Predicate::Eq(Column::Field(position), Value::from(value))),
    );
    predicates
}

fn inclusion_predicates(filter: &Filter) -> Vec<Predicate> {
    let mut predicates = Vec::new();
    if !filter.ptype.is_empty() {
        predicates.push(Predicate::In(Column::Ptype, filter.ptype.clone()));
    }
    for position in 0..MATCH_FIELD_COUNT {
        let values = filter.field(position);
        if !values.is_empty() {
            predicates.push(Predicate::In(Column::Field(position), values.to_vec()));
        }
    }
    predicates
}
