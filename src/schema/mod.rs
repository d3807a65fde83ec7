pub mod arrow;
pub mod types;

pub use arrow::{build_csv_schemas, map_to_arrow_type, overlay_schema, CsvSchemas};
pub use types::{ColumnKind, SchemaDescriptor};
