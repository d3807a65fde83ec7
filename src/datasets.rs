// src/datasets.rs

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::config::Variant;
use crate::schema::{ColumnKind, SchemaDescriptor};

pub const TRIP_TABLE: &str = "taxi_trips";
pub const ZONE_TABLE: &str = "zones";
pub const DEFAULT_BATCH_SIZE: usize = 100_000;
pub const DEFAULT_INDEX_LABEL: &str = "index";

static GREEN_TRIPS_URL: &str =
    "https://d37ci6vzurychx.cloudfront.net/trip-data/green_tripdata_2025-11.parquet";
static YELLOW_TRIPS_URL: &str = "https://github.com/DataTalksClub/nyc-tlc-data/releases/download/yellow/yellow_tripdata_2021-01.csv.gz";
static ZONE_LOOKUP_URL: &str = "https://d37ci6vzurychx.cloudfront.net/misc/taxi_zone_lookup.csv";

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Parquet,
    Csv,
}

/// How the destination table is written.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Read the whole file, drop and recreate the table, insert everything.
    #[default]
    Replace,
    /// Recreate the table empty from the first batch, then append every batch.
    Chunked,
}

/// Everything needed to load one dataset into one table.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Dataset {
    pub name: String,
    /// `http(s)://` URL, `file://` URL or a local path.
    pub url: String,
    pub format: SourceFormat,
    #[serde(default)]
    pub mode: LoadMode,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    pub table: String,
    /// Leading BIGINT column holding the 0-based source row number.
    #[serde(default)]
    pub index_label: Option<String>,
    #[serde(default)]
    pub columns: SchemaDescriptor,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Dataset {
    /// Gzip is detected from a `.gz` suffix on the URL path.
    pub fn is_gzip(&self) -> bool {
        let path = self.url.split(['?', '#']).next().unwrap_or_default();
        path.to_ascii_lowercase().ends_with(".gz")
    }

    fn validate(&self) -> Result<()> {
        if self.table.trim().is_empty() {
            bail!("dataset `{}` has an empty table name", self.name);
        }
        if self.batch_size == 0 {
            bail!("dataset `{}` has batch_size 0", self.name);
        }
        Ok(())
    }
}

/// Green taxi trips as one parquet file, replaced wholesale.
pub fn whole_file_trips() -> Dataset {
    Dataset {
        name: "trips".into(),
        url: GREEN_TRIPS_URL.into(),
        format: SourceFormat::Parquet,
        mode: LoadMode::Replace,
        batch_size: DEFAULT_BATCH_SIZE,
        table: TRIP_TABLE.into(),
        index_label: Some(DEFAULT_INDEX_LABEL.into()),
        columns: SchemaDescriptor::new()
            .with("VendorID", ColumnKind::Integer)
            .with("lpep_pickup_datetime", ColumnKind::Timestamp)
            .with("lpep_dropoff_datetime", ColumnKind::Timestamp)
            .with("RatecodeID", ColumnKind::Integer)
            .with("PULocationID", ColumnKind::Integer)
            .with("DOLocationID", ColumnKind::Integer)
            .with("passenger_count", ColumnKind::Integer)
            .with("payment_type", ColumnKind::Integer)
            .with("trip_type", ColumnKind::Integer),
    }
}

/// Yellow taxi trips as gzipped CSV, loaded in 100k-row chunks.
pub fn chunked_trips() -> Dataset {
    use ColumnKind::*;
    let columns = [
        ("VendorID", Integer),
        ("tpep_pickup_datetime", Timestamp),
        ("tpep_dropoff_datetime", Timestamp),
        ("passenger_count", Integer),
        ("trip_distance", Float),
        ("RatecodeID", Integer),
        ("store_and_fwd_flag", Text),
        ("PULocationID", Integer),
        ("DOLocationID", Integer),
        ("payment_type", Integer),
        ("fare_amount", Float),
        ("extra", Float),
        ("mta_tax", Float),
        ("tip_amount", Float),
        ("tolls_amount", Float),
        ("improvement_surcharge", Float),
        ("total_amount", Float),
        ("congestion_surcharge", Float),
    ]
    .into_iter()
    .collect();

    Dataset {
        name: "trips".into(),
        url: YELLOW_TRIPS_URL.into(),
        format: SourceFormat::Csv,
        mode: LoadMode::Chunked,
        batch_size: DEFAULT_BATCH_SIZE,
        table: TRIP_TABLE.into(),
        index_label: Some(DEFAULT_INDEX_LABEL.into()),
        columns,
    }
}

pub fn zone_lookup() -> Dataset {
    Dataset {
        name: "zones".into(),
        url: ZONE_LOOKUP_URL.into(),
        format: SourceFormat::Csv,
        mode: LoadMode::Replace,
        batch_size: DEFAULT_BATCH_SIZE,
        table: ZONE_TABLE.into(),
        index_label: Some(DEFAULT_INDEX_LABEL.into()),
        columns: SchemaDescriptor::new()
            .with("LocationID", ColumnKind::Integer)
            .with("Borough", ColumnKind::Text)
            .with("Zone", ColumnKind::Text)
            .with("service_zone", ColumnKind::Text),
    }
}

/// Trips first, then zones.
pub fn builtin(variant: Variant) -> Vec<Dataset> {
    let trips = match variant {
        Variant::WholeFile => whole_file_trips(),
        Variant::Chunked => chunked_trips(),
    };
    vec![trips, zone_lookup()]
}

/// Load a YAML list of dataset descriptors.
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Vec<Dataset>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading dataset file {}", path.display()))?;
    parse_datasets(&text).with_context(|| format!("parsing dataset file {}", path.display()))
}

pub fn parse_datasets(text: &str) -> Result<Vec<Dataset>> {
    let list: Vec<Dataset> = serde_yaml::from_str(text)?;
    if list.is_empty() {
        bail!("no datasets defined");
    }
    for d in &list {
        d.validate()?;
    }
    Ok(list)
}

/// The trip dataset is the first in the run list; `--target-table` renames it.
pub fn apply_target_table(datasets: &mut [Dataset], table: &str) {
    if let Some(first) = datasets.first_mut() {
        first.table = table.to_string();
    }
}
