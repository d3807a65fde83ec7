// src/config.rs

use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::datasets::{self, Dataset};

/// Load NYC taxi trip data and the zone lookup table into PostgreSQL.
#[derive(Parser, Debug, Clone)]
#[command(name = "taxi-ingest")]
#[command(author, version, about)]
pub struct Cli {
    /// PostgreSQL user
    #[arg(long, env = "PG_USER", default_value = "root")]
    pub pg_user: String,

    /// PostgreSQL password
    #[arg(long, env = "PG_PASS", default_value = "root", hide_env_values = true)]
    pub pg_pass: String,

    /// PostgreSQL host
    #[arg(long, env = "PG_HOST", default_value = "pgdatabase")]
    pub pg_host: String,

    /// PostgreSQL port
    #[arg(long, env = "PG_PORT", default_value_t = 5432)]
    pub pg_port: u16,

    /// PostgreSQL database name
    #[arg(long, env = "PG_DB", default_value = "ny_taxi")]
    pub pg_db: String,

    /// Target table name for the trip dataset (empty keeps the default)
    #[arg(long, env = "TARGET_TABLE", default_value = "")]
    pub target_table: String,

    /// Which built-in trip source to load
    #[arg(long, value_enum, default_value_t = Variant::Chunked)]
    pub variant: Variant,

    /// YAML file with dataset descriptors, replacing the built-in ones
    #[arg(long, value_name = "FILE")]
    pub datasets: Option<PathBuf>,
}

/// Built-in trip source.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Green trips as one parquet file, replaced wholesale
    WholeFile,
    /// Yellow trips as gzipped CSV, streamed in chunks
    Chunked,
}

impl Cli {
    pub fn connection(&self) -> ConnectionConfig {
        ConnectionConfig {
            user: self.pg_user.clone(),
            password: self.pg_pass.clone(),
            host: self.pg_host.clone(),
            port: self.pg_port,
            database: self.pg_db.clone(),
            target_table: Some(self.target_table.trim())
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        }
    }

    /// Datasets to load, in order, with `--target-table` applied.
    pub fn resolve_datasets(&self) -> Result<Vec<Dataset>> {
        let mut list = match &self.datasets {
            Some(path) => datasets::load_file(path)?,
            None => datasets::builtin(self.variant),
        };
        if let Some(table) = self.connection().target_table {
            datasets::apply_target_table(&mut list, &table);
        }
        Ok(list)
    }
}

/// Connection settings for the destination database. Immutable for the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub target_table: Option<String>,
}

impl ConnectionConfig {
    /// `postgresql://` URL of the database with the password masked, for logs.
    pub fn redacted_url(&self) -> String {
        format!(
            "postgresql://{}:***@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }

    pub fn pg_config(&self) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .user(&self.user)
            .password(&self.password)
            .host(&self.host)
            .port(self.port)
            .dbname(&self.database)
            .application_name("taxi-ingest");
        config
    }
}
