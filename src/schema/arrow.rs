// src/schema/arrow.rs

use arrow::datatypes::{DataType, Field as ArrowField, Schema as ArrowSchema, SchemaRef, TimeUnit};
use std::sync::Arc;
use tracing::warn;

use super::types::{ColumnKind, SchemaDescriptor};

/// Map a declared column kind to the Arrow type it ends up as.
///
/// - integer   → Int64 (nullable)
/// - float     → Float64
/// - text      → Utf8
/// - boolean   → Boolean
/// - timestamp → Timestamp(µs, no tz)
pub fn map_to_arrow_type(kind: ColumnKind) -> DataType {
    match kind {
        ColumnKind::Integer => DataType::Int64,
        ColumnKind::Float => DataType::Float64,
        ColumnKind::Text => DataType::Utf8,
        ColumnKind::Boolean => DataType::Boolean,
        ColumnKind::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, None),
    }
}

/// Type used while parsing delimited text. Timestamps are read as Utf8 and
/// converted afterwards.
fn map_to_read_type(kind: ColumnKind) -> DataType {
    match kind {
        ColumnKind::Timestamp => DataType::Utf8,
        other => map_to_arrow_type(other),
    }
}

/// A pair of schemas for a delimited source: what the CSV reader parses, and
/// what the batches look like after conversion.
#[derive(Debug, Clone)]
pub struct CsvSchemas {
    pub read: SchemaRef,
    pub target: SchemaRef,
}

/// Build the read/target schemas for a CSV with the given header row.
/// Undeclared columns are text.
pub fn build_csv_schemas(headers: &[String], desc: &SchemaDescriptor) -> CsvSchemas {
    warn_missing(headers, desc);

    let mut read = Vec::with_capacity(headers.len());
    let mut target = Vec::with_capacity(headers.len());
    for name in headers {
        let kind = desc.kind_of(name).unwrap_or(ColumnKind::Text);
        read.push(ArrowField::new(name, map_to_read_type(kind), true));
        target.push(ArrowField::new(name, map_to_arrow_type(kind), true));
    }

    CsvSchemas {
        read: Arc::new(ArrowSchema::new(read)),
        target: Arc::new(ArrowSchema::new(target)),
    }
}

/// Overlay declared kinds onto a self-describing schema (e.g. Parquet).
/// Undeclared columns keep their embedded type.
pub fn overlay_schema(source: &ArrowSchema, desc: &SchemaDescriptor) -> SchemaRef {
    let headers: Vec<String> = source.fields().iter().map(|f| f.name().clone()).collect();
    warn_missing(&headers, desc);

    let fields: Vec<ArrowField> = source
        .fields()
        .iter()
        .map(|f| match desc.kind_of(f.name()) {
            Some(kind) => ArrowField::new(f.name(), map_to_arrow_type(kind), true),
            None => f.as_ref().clone().with_nullable(true),
        })
        .collect();

    Arc::new(ArrowSchema::new(fields))
}

fn warn_missing(headers: &[String], desc: &SchemaDescriptor) {
    for name in desc.missing_from(headers) {
        warn!(column = name, "declared column not present in source");
    }
}
