// src/load.rs

use anyhow::{bail, Context, Result};
use arrow::{
    array::{ArrayRef, Int64Array},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use reqwest::Client;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::datasets::{Dataset, LoadMode};
use crate::db::TableSink;
use crate::fetch;
use crate::process::{self, BatchReader};

/// Outcome of loading one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub dataset: String,
    pub table: String,
    pub batches: usize,
    pub rows: u64,
}

/// Fetch `dataset`, parse it and write it to its table according to its mode.
#[tracing::instrument(level = "info", skip_all, fields(dataset = %dataset.name, table = %dataset.table))]
pub async fn load_dataset<S>(client: &Client, sink: &mut S, dataset: &Dataset) -> Result<LoadReport>
where
    S: TableSink + ?Sized,
{
    info!(url = %dataset.url, mode = ?dataset.mode, "ingesting dataset");
    let start = Instant::now();

    let fetched = fetch::fetch(client, &dataset.url)
        .await
        .with_context(|| format!("fetching {}", dataset.url))?;
    let reader = process::open_batches(
        fetched.path(),
        dataset.format,
        dataset.is_gzip(),
        &dataset.columns,
        dataset.batch_size,
    )?;

    let report = match dataset.mode {
        LoadMode::Replace => load_replace(sink, dataset, reader).await?,
        LoadMode::Chunked => load_chunked(sink, dataset, reader).await?,
    };
    drop(fetched);

    info!(rows = report.rows, batches = report.batches, elapsed = ?start.elapsed(), "dataset imported");
    Ok(report)
}

/// Read everything into one batch, recreate the table from its schema and
/// insert all rows.
pub async fn load_replace<S>(sink: &mut S, dataset: &Dataset, reader: BatchReader) -> Result<LoadReport>
where
    S: TableSink + ?Sized,
{
    let batch = reader
        .read_all()
        .with_context(|| format!("reading {}", dataset.name))?;
    let batch = with_index(&batch, dataset.index_label.as_deref(), 0)?;

    sink.replace(&dataset.table, &batch.schema()).await?;
    let rows = if batch.num_rows() > 0 {
        sink.append(&dataset.table, &batch).await?
    } else {
        0
    };

    Ok(LoadReport {
        dataset: dataset.name.clone(),
        table: dataset.table.clone(),
        batches: 1,
        rows,
    })
}

/// Stream batches in order. The first batch recreates the table empty with its
/// schema; every batch, the first included, is then appended.
pub async fn load_chunked<S>(sink: &mut S, dataset: &Dataset, reader: BatchReader) -> Result<LoadReport>
where
    S: TableSink + ?Sized,
{
    let label = dataset.index_label.as_deref();
    let mut offset: u64 = 0;
    let mut batches = 0;
    let mut rows: u64 = 0;

    for (idx, res) in reader.enumerate() {
        let batch = res.with_context(|| format!("reading batch {} of {}", idx, dataset.name))?;
        let batch = with_index(&batch, label, offset)?;

        if idx == 0 {
            sink.replace(&dataset.table, &batch.slice(0, 0).schema())
                .await?;
            info!("table created");
        }

        let inserted = sink
            .append(&dataset.table, &batch)
            .await
            .with_context(|| format!("appending batch {} to {}", idx, dataset.table))?;
        info!(batch = idx, inserted, "inserted");

        offset += batch.num_rows() as u64;
        rows += inserted;
        batches += 1;
    }

    if batches == 0 {
        warn!("source produced no rows; destination left untouched");
    }

    Ok(LoadReport {
        dataset: dataset.name.clone(),
        table: dataset.table.clone(),
        batches,
        rows,
    })
}

/// Prepend a BIGINT row-number column named `label`, counting from `offset`.
pub fn with_index(batch: &RecordBatch, label: Option<&str>, offset: u64) -> Result<RecordBatch> {
    let Some(label) = label else {
        return Ok(batch.clone());
    };
    let schema = batch.schema();
    if schema.column_with_name(label).is_some() {
        bail!("source already has a column named `{}`", label);
    }

    let start = offset as i64;
    let index: ArrayRef = Arc::new(Int64Array::from_iter_values(
        start..start + batch.num_rows() as i64,
    ));

    let mut fields = Vec::with_capacity(schema.fields().len() + 1);
    fields.push(Arc::new(Field::new(label, DataType::Int64, true)));
    fields.extend(schema.fields().iter().cloned());

    let mut columns = Vec::with_capacity(batch.num_columns() + 1);
    columns.push(index);
    columns.extend(batch.columns().iter().cloned());

    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns).context("adding index column")
}
