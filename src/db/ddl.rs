use arrow::datatypes::{DataType, Schema, TimeUnit};
use tokio_postgres::types::Type;

/// How one Arrow type is stored: the Arrow type the column is normalized to
/// before encoding, the wire type for binary COPY, and the DDL spelling.
#[derive(Debug, Clone, PartialEq)]
pub struct PgColumn {
    pub arrow: DataType,
    pub pg_type: Type,
    pub sql: &'static str,
}

/// Map an Arrow type onto a PostgreSQL column.
///
/// Anything without a natural counterpart (decimals, lists, binary, ...) is
/// stored as text.
pub fn pg_column(dt: &DataType) -> PgColumn {
    let (arrow, pg_type, sql) = match dt {
        DataType::Int8 | DataType::Int16 | DataType::UInt8 => {
            (DataType::Int16, Type::INT2, "SMALLINT")
        }
        DataType::Int32 | DataType::UInt16 => (DataType::Int32, Type::INT4, "INTEGER"),
        DataType::Int64 | DataType::UInt32 | DataType::UInt64 => {
            (DataType::Int64, Type::INT8, "BIGINT")
        }
        DataType::Float16 | DataType::Float32 => (DataType::Float32, Type::FLOAT4, "REAL"),
        DataType::Float64 => (DataType::Float64, Type::FLOAT8, "DOUBLE PRECISION"),
        DataType::Boolean => (DataType::Boolean, Type::BOOL, "BOOLEAN"),
        DataType::Date32 | DataType::Date64 => (DataType::Date32, Type::DATE, "DATE"),
        DataType::Timestamp(_, None) => (
            DataType::Timestamp(TimeUnit::Microsecond, None),
            Type::TIMESTAMP,
            "TIMESTAMP",
        ),
        DataType::Timestamp(_, Some(tz)) => (
            DataType::Timestamp(TimeUnit::Microsecond, Some(tz.clone())),
            Type::TIMESTAMPTZ,
            "TIMESTAMPTZ",
        ),
        _ => (DataType::Utf8, Type::TEXT, "TEXT"),
    };
    PgColumn { arrow, pg_type, sql }
}

/// Double-quote an identifier; a dotted name is quoted per part so
/// `public.zones` keeps its schema.
pub fn quote_ident(name: &str) -> String {
    name.split('.')
        .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(".")
}

fn column_list(schema: &Schema) -> String {
    schema
        .fields()
        .iter()
        .map(|f| quote_ident(f.name()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Drop and recreate `table` with one nullable column per field.
pub fn replace_table_sql(table: &str, schema: &Schema) -> String {
    let t = quote_ident(table);
    let cols = schema
        .fields()
        .iter()
        .map(|f| format!("{} {}", quote_ident(f.name()), pg_column(f.data_type()).sql))
        .collect::<Vec<_>>()
        .join(",\n    ");
    format!("DROP TABLE IF EXISTS {t};\nCREATE TABLE {t} (\n    {cols}\n);")
}

pub fn copy_in_sql(table: &str, schema: &Schema) -> String {
    format!(
        "COPY {} ({}) FROM STDIN (FORMAT binary)",
        quote_ident(table),
        column_list(schema)
    )
}
