// src/db/mod.rs
pub mod copy;
pub mod ddl;

use anyhow::{Context, Result};
use arrow::{datatypes::Schema, record_batch::RecordBatch};
use async_trait::async_trait;
use futures::pin_mut;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_postgres::{binary_copy::BinaryCopyInWriter, types::ToSql, Client, NoTls};
use tracing::{debug, error, info};

use crate::config::ConnectionConfig;

/// Destination of tabular batches.
#[async_trait]
pub trait TableSink {
    /// Drop `table` if it exists and recreate it with `schema`, no rows.
    async fn replace(&mut self, table: &str, schema: &Schema) -> Result<()>;

    /// Append every row of `batch` to `table`; returns the rows written.
    async fn append(&mut self, table: &str, batch: &RecordBatch) -> Result<u64>;
}

/// The database could not be reached; the job stops before touching any data.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("could not connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tokio_postgres::Error,
    },
    #[error("probe query failed on {url}: {source}")]
    Query {
        url: String,
        #[source]
        source: tokio_postgres::Error,
    },
}

/// Handle on the destination database: one client plus its connection task.
pub struct Database {
    client: Client,
    connection: JoinHandle<()>,
}

impl Database {
    /// Connect and run `SELECT 1`. No retries.
    #[tracing::instrument(level = "info", skip(config), fields(url = %config.redacted_url()))]
    pub async fn verify(config: &ConnectionConfig) -> Result<Self, ProbeError> {
        let url = config.redacted_url();
        let (client, conn) = config
            .pg_config()
            .connect(NoTls)
            .await
            .map_err(|source| ProbeError::Connect {
                url: url.clone(),
                source,
            })?;
        let connection = tokio::spawn(async move {
            if let Err(err) = conn.await {
                error!(%err, "Postgres connection error");
            }
        });

        let db = Database { client, connection };
        db.probe()
            .await
            .map_err(|source| ProbeError::Query { url, source })?;
        info!("database reachable");
        Ok(db)
    }

    async fn probe(&self) -> Result<(), tokio_postgres::Error> {
        self.client.simple_query("SELECT 1").await.map(|_| ())
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        self.connection.abort();
    }
}

#[async_trait]
impl TableSink for Database {
    async fn replace(&mut self, table: &str, schema: &Schema) -> Result<()> {
        let sql = ddl::replace_table_sql(table, schema);
        debug!(table, sql = %sql, "replacing table");
        self.client
            .batch_execute(&sql)
            .await
            .with_context(|| format!("replacing table {}", table))
    }

    async fn append(&mut self, table: &str, batch: &RecordBatch) -> Result<u64> {
        let (columns, types) = copy::normalize_for_copy(batch)?;
        let sql = ddl::copy_in_sql(table, &batch.schema());

        let sink = self
            .client
            .copy_in(sql.as_str())
            .await
            .with_context(|| format!("starting COPY into {}", table))?;
        let writer = BinaryCopyInWriter::new(sink, &types);
        pin_mut!(writer);

        let mut cells = Vec::with_capacity(columns.len());
        for row in 0..batch.num_rows() {
            cells.clear();
            for col in &columns {
                cells.push(copy::cell_at(col, row)?);
            }
            let refs: Vec<&(dyn ToSql + Sync)> =
                cells.iter().map(|c| c as &(dyn ToSql + Sync)).collect();
            writer
                .as_mut()
                .write(&refs)
                .await
                .with_context(|| format!("writing row {} into {}", row, table))?;
        }

        let written = writer
            .finish()
            .await
            .with_context(|| format!("finishing COPY into {}", table))?;
        Ok(written)
    }
}
