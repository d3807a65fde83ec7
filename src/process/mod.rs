// src/process/mod.rs
pub mod convert;
pub mod date_parser;

use anyhow::{Context, Result};
use arrow::{
    compute::concat_batches,
    csv::{reader::Format, ReaderBuilder},
    datatypes::SchemaRef,
    record_batch::RecordBatch,
};
use flate2::read::MultiGzDecoder;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};
use tracing::debug;

use crate::datasets::SourceFormat;
use crate::schema::{build_csv_schemas, overlay_schema, SchemaDescriptor};
use convert::convert_to_final_types;

/// Lazy sequence of converted batches read from one local file.
///
/// The schema is known before the first batch is pulled, so an empty source
/// still has a shape.
pub struct BatchReader {
    schema: SchemaRef,
    inner: Box<dyn Iterator<Item = Result<RecordBatch>>>,
}

impl BatchReader {
    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    /// Drain every batch and concatenate them into one.
    pub fn read_all(self) -> Result<RecordBatch> {
        let schema = self.schema.clone();
        let batches = self.collect::<Result<Vec<_>>>()?;
        concat_batches(&schema, &batches).context("concatenating batches")
    }
}

impl Iterator for BatchReader {
    type Item = Result<RecordBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

/// Open `path` as a stream of batches of at most `batch_size` rows, typed per
/// `desc`.
#[tracing::instrument(level = "debug", skip(path, desc), fields(path = %path.as_ref().display()))]
pub fn open_batches<P: AsRef<Path>>(
    path: P,
    format: SourceFormat,
    gzip: bool,
    desc: &SchemaDescriptor,
    batch_size: usize,
) -> Result<BatchReader> {
    match format {
        SourceFormat::Csv => open_csv(path.as_ref(), gzip, desc, batch_size),
        SourceFormat::Parquet => open_parquet(path.as_ref(), desc, batch_size),
    }
}

fn open_raw(path: &Path, gzip: bool) -> Result<Box<dyn Read>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let reader: Box<dyn Read> = if gzip {
        Box::new(MultiGzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(file)
    };
    Ok(reader)
}

/// Read only the header row.
fn read_csv_headers(path: &Path, gzip: bool) -> Result<Vec<String>> {
    let (schema, _) = Format::default()
        .with_header(true)
        .infer_schema(open_raw(path, gzip)?, Some(0))
        .with_context(|| format!("reading CSV header of {}", path.display()))?;
    Ok(schema
        .fields()
        .iter()
        .map(|f| f.name().trim_start_matches('\u{feff}').to_string())
        .collect())
}

fn open_csv(
    path: &Path,
    gzip: bool,
    desc: &SchemaDescriptor,
    batch_size: usize,
) -> Result<BatchReader> {
    let headers = read_csv_headers(path, gzip)?;
    let schemas = build_csv_schemas(&headers, desc);
    debug!(
        columns = headers.len(),
        timestamps = ?desc.timestamp_columns().collect::<Vec<_>>(),
        batch_size,
        "opening CSV reader"
    );

    let csv_reader = ReaderBuilder::new(schemas.read.clone())
        .with_header(true)
        .with_batch_size(batch_size)
        .build(open_raw(path, gzip)?)
        .context("creating CSV reader")?;

    let target = schemas.target.clone();
    let inner = csv_reader.map(move |res| {
        let batch = res.context("CSV parse error")?;
        convert_to_final_types(&batch, &target)
    });

    Ok(BatchReader {
        schema: schemas.target,
        inner: Box::new(inner),
    })
}

fn open_parquet(path: &Path, desc: &SchemaDescriptor, batch_size: usize) -> Result<BatchReader> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("reading parquet metadata of {}", path.display()))?;
    let target = overlay_schema(builder.schema(), desc);
    debug!(
        rows = builder.metadata().file_metadata().num_rows(),
        batch_size, "opening parquet reader"
    );
    let reader = builder.with_batch_size(batch_size).build()?;

    let schema = target.clone();
    let inner = reader.map(move |res| {
        let batch = res.context("parquet decode error")?;
        convert_to_final_types(&batch, &target)
    });

    Ok(BatchReader {
        schema,
        inner: Box::new(inner),
    })
}
