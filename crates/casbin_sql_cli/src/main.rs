//! Maintenance entry point over a policy store.
//!
//! # Responsibility
//! - Print the adapter version.
//! - Dump stored rules as policy lines, or import a policy file.
//! - Keep output deterministic so it can be diffed against policy files.
//!
//! Without `--driver` the database argument is a SQLite file path; with it,
//! the argument is the driver's data source string.

use casbin_sql_adapter::{
    core_version, init_logging, load_policy_line, with_table_name, Adapter, CasbinRule, Client,
    Model, PolicyAdapter, SqliteClient, DEFAULT_TABLE_NAME,
};
use clap::{Parser, Subcommand};
use log::info;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "casbin_sql", version, about = "Inspect and seed a SQL policy store")]
struct Cli {
    /// Log level; logging stays off when unset
    #[arg(long, global = true, env = "CASBIN_SQL_LOG")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the adapter version
    Version,

    /// Print every stored rule as a policy line
    Dump {
        /// SQLite file, or data source when `--driver` is given
        db: String,

        #[arg(default_value = DEFAULT_TABLE_NAME)]
        table: String,

        /// postgres, mysql or mssql
        #[arg(long)]
        driver: Option<String>,
    },

    /// Replace stored rules with the lines of a policy file
    Import {
        /// SQLite file, or data source when `--driver` is given
        db: String,

        /// Policy file, one rule per line
        file: String,

        #[arg(default_value = DEFAULT_TABLE_NAME)]
        table: String,

        /// postgres, mysql or mssql
        #[arg(long)]
        driver: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(level) = &cli.log_level {
        if let Err(err) = init_logging(level, None) {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    }

    let outcome = match &cli.command {
        Commands::Version => {
            println!("casbin_sql_adapter version={}", core_version());
            Ok(())
        }
        Commands::Dump { db, table, driver } => dump(driver.as_deref(), db, table),
        Commands::Import {
            db,
            file,
            table,
            driver,
        } => import(driver.as_deref(), db, file, table),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn open_adapter(
    driver: Option<&str>,
    db: &str,
    table: &str,
) -> Result<Adapter<Box<dyn Client>>, String> {
    let options = [with_table_name("", table)];
    let opened = match driver {
        Some(driver) => Adapter::open(driver, db, options),
        None => {
            let client = SqliteClient::open(db).map_err(|err| err.to_string())?;
            Adapter::with_client(Box::new(client) as Box<dyn Client>, options)
        }
    };
    opened.map_err(|err| err.to_string())
}

fn dump(driver: Option<&str>, db: &str, table: &str) -> Result<(), String> {
    let mut adapter = open_adapter(driver, db, table)?;
    let mut model = Model::new();
    adapter
        .load_policy(&mut model)
        .map_err(|err| err.to_string())?;

    for sec in ["p", "g"] {
        for (ptype, rules) in model.section(sec) {
            for rule in rules {
                if let Some(line) = CasbinRule::from_policy(ptype, rule.as_slice()).to_policy_line()
                {
                    println!("{line}");
                }
            }
        }
    }
    Ok(())
}

fn import(driver: Option<&str>, db: &str, policy_path: &str, table: &str) -> Result<(), String> {
    let text = std::fs::read_to_string(policy_path)
        .map_err(|err| format!("failed to read `{policy_path}`: {err}"))?;

    let mut model = Model::new();
    let mut parsed = 0;
    for line in text.lines() {
        if load_policy_line(line, &mut model) {
            parsed += 1;
        }
    }

    let mut adapter = open_adapter(driver, db, table)?;
    adapter.ensure_table().map_err(|err| err.to_string())?;
    adapter
        .save_policy(&model)
        .map_err(|err| err.to_string())?;

    info!("event=policy_import module=cli status=ok rules={parsed}");
    println!("imported {parsed} rules into {}", adapter.table_name());
    Ok(())
}
