use anyhow::{anyhow, Context, Result};
use arrow::{
    array::{Array, ArrayRef, AsArray, StringBuilder},
    compute::can_cast_types,
    datatypes::{
        DataType, Date32Type, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type,
        TimestampMicrosecondType,
    },
    record_batch::RecordBatch,
    util::display::{ArrayFormatter, FormatOptions},
};
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::error::Error;
use tokio_postgres::types::{IsNull, ToSql, Type};

use super::ddl::pg_column;
use crate::process::convert::cast_strict;

/// One value headed for binary COPY.
#[derive(Debug)]
pub enum Cell<'a> {
    Null,
    Bool(bool),
    Int2(i16),
    Int4(i32),
    Int8(i64),
    Float4(f32),
    Float8(f64),
    Text(&'a str),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
}

impl ToSql for Cell<'_> {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Cell::Null => Ok(IsNull::Yes),
            Cell::Bool(v) => v.to_sql(ty, out),
            Cell::Int2(v) => v.to_sql(ty, out),
            Cell::Int4(v) => v.to_sql(ty, out),
            Cell::Int8(v) => v.to_sql(ty, out),
            Cell::Float4(v) => v.to_sql(ty, out),
            Cell::Float8(v) => v.to_sql(ty, out),
            Cell::Text(v) => v.to_sql(ty, out),
            Cell::Date(v) => v.to_sql(ty, out),
            Cell::Timestamp(v) => v.to_sql(ty, out),
            Cell::TimestampTz(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(ty: &Type) -> bool {
        <bool as ToSql>::accepts(ty)
            || <i16 as ToSql>::accepts(ty)
            || <i32 as ToSql>::accepts(ty)
            || <i64 as ToSql>::accepts(ty)
            || <f32 as ToSql>::accepts(ty)
            || <f64 as ToSql>::accepts(ty)
            || <&str as ToSql>::accepts(ty)
            || <NaiveDate as ToSql>::accepts(ty)
            || <NaiveDateTime as ToSql>::accepts(ty)
            || <DateTime<Utc> as ToSql>::accepts(ty)
    }

    fn to_sql_checked(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Cell::Null => Ok(IsNull::Yes),
            Cell::Bool(v) => v.to_sql_checked(ty, out),
            Cell::Int2(v) => v.to_sql_checked(ty, out),
            Cell::Int4(v) => v.to_sql_checked(ty, out),
            Cell::Int8(v) => v.to_sql_checked(ty, out),
            Cell::Float4(v) => v.to_sql_checked(ty, out),
            Cell::Float8(v) => v.to_sql_checked(ty, out),
            Cell::Text(v) => v.to_sql_checked(ty, out),
            Cell::Date(v) => v.to_sql_checked(ty, out),
            Cell::Timestamp(v) => v.to_sql_checked(ty, out),
            Cell::TimestampTz(v) => v.to_sql_checked(ty, out),
        }
    }
}

/// Cast every column to the Arrow type its PostgreSQL column expects.
/// Returns the normalized columns and their wire types.
pub fn normalize_for_copy(batch: &RecordBatch) -> Result<(Vec<ArrayRef>, Vec<Type>)> {
    let mut columns = Vec::with_capacity(batch.num_columns());
    let mut types = Vec::with_capacity(batch.num_columns());

    for (arr, field) in batch.columns().iter().zip(batch.schema().fields()) {
        let pg = pg_column(field.data_type());
        let col = if arr.data_type() == &pg.arrow {
            arr.clone()
        } else if can_cast_types(arr.data_type(), &pg.arrow) {
            cast_strict(arr, &pg.arrow)
                .with_context(|| format!("casting column `{}` for COPY", field.name()))?
        } else if pg.arrow == DataType::Utf8 {
            format_as_text(arr)?
        } else {
            return Err(anyhow!(
                "column `{}`: cannot convert {} to {}",
                field.name(),
                arr.data_type(),
                pg.arrow
            ));
        };
        columns.push(col);
        types.push(pg.pg_type);
    }

    Ok((columns, types))
}

fn format_as_text(arr: &ArrayRef) -> Result<ArrayRef> {
    let options = FormatOptions::default();
    let fmt = ArrayFormatter::try_new(arr.as_ref(), &options)?;
    let mut b = StringBuilder::with_capacity(arr.len(), arr.len() * 8);
    for row in 0..arr.len() {
        if arr.is_null(row) {
            b.append_null();
        } else {
            b.append_value(fmt.value(row).to_string());
        }
    }
    Ok(std::sync::Arc::new(b.finish()))
}

/// Value at `row` of a normalized column.
pub fn cell_at(col: &ArrayRef, row: usize) -> Result<Cell<'_>> {
    if col.is_null(row) {
        return Ok(Cell::Null);
    }
    let cell = match col.data_type() {
        DataType::Boolean => Cell::Bool(col.as_boolean().value(row)),
        DataType::Int16 => Cell::Int2(col.as_primitive::<Int16Type>().value(row)),
        DataType::Int32 => Cell::Int4(col.as_primitive::<Int32Type>().value(row)),
        DataType::Int64 => Cell::Int8(col.as_primitive::<Int64Type>().value(row)),
        DataType::Float32 => Cell::Float4(col.as_primitive::<Float32Type>().value(row)),
        DataType::Float64 => Cell::Float8(col.as_primitive::<Float64Type>().value(row)),
        DataType::Utf8 => Cell::Text(col.as_string::<i32>().value(row)),
        DataType::Date32 => col
            .as_primitive::<Date32Type>()
            .value_as_date(row)
            .map(Cell::Date)
            .ok_or_else(|| anyhow!("date out of range at row {}", row))?,
        DataType::Timestamp(_, tz) => {
            let naive = col
                .as_primitive::<TimestampMicrosecondType>()
                .value_as_datetime(row)
                .ok_or_else(|| anyhow!("timestamp out of range at row {}", row))?;
            match tz {
                None => Cell::Timestamp(naive),
                Some(_) => Cell::TimestampTz(naive.and_utc()),
            }
        }
        other => return Err(anyhow!("unsupported column type {} for COPY", other)),
    };
    Ok(cell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{
        Date64Array, Int8Array, ListArray, StringArray, TimestampNanosecondArray, UInt64Array,
    };
    use arrow::datatypes::Int32Type as I32;
    use std::sync::Arc;

    fn batch(cols: Vec<(&str, ArrayRef)>) -> RecordBatch {
        RecordBatch::try_from_iter(cols).unwrap()
    }

    #[test]
    fn normalizes_to_wire_types() -> Result<()> {
        let b = batch(vec![
            ("small", Arc::new(Int8Array::from(vec![Some(3), None])) as ArrayRef),
            ("big", Arc::new(UInt64Array::from(vec![7, 8])) as ArrayRef),
            ("day", Arc::new(Date64Array::from(vec![0, 86_400_000])) as ArrayRef),
            (
                "ts",
                Arc::new(TimestampNanosecondArray::from(vec![1_000_000_000, 0])) as ArrayRef,
            ),
            ("name", Arc::new(StringArray::from(vec!["a", "b"])) as ArrayRef),
        ]);

        let (cols, types) = normalize_for_copy(&b)?;
        assert_eq!(
            types,
            vec![Type::INT2, Type::INT8, Type::DATE, Type::TIMESTAMP, Type::TEXT]
        );
        assert!(matches!(cell_at(&cols[0], 0)?, Cell::Int2(3)));
        assert!(matches!(cell_at(&cols[0], 1)?, Cell::Null));
        assert!(matches!(cell_at(&cols[1], 1)?, Cell::Int8(8)));
        match cell_at(&cols[2], 1)? {
            Cell::Date(d) => assert_eq!(d.to_string(), "1970-01-02"),
            other => panic!("unexpected {:?}", other),
        }
        match cell_at(&cols[3], 0)? {
            Cell::Timestamp(t) => assert_eq!(t.to_string(), "1970-01-01 00:00:01"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(cell_at(&cols[4], 1)?, Cell::Text("b")));
        Ok(())
    }

    #[test]
    fn unsigned_overflow_fails_instead_of_writing_null() {
        let b = batch(vec![(
            "big",
            Arc::new(UInt64Array::from(vec![1, u64::MAX])) as ArrayRef,
        )]);
        let err = normalize_for_copy(&b).unwrap_err();
        assert!(format!("{:#}", err).contains("big"), "{:#}", err);
    }

    #[test]
    fn nested_values_fall_back_to_text() -> Result<()> {
        let list = ListArray::from_iter_primitive::<I32, _, _>(vec![
            Some(vec![Some(1), Some(2)]),
            None,
        ]);
        let b = batch(vec![("l", Arc::new(list) as ArrayRef)]);

        let (cols, types) = normalize_for_copy(&b)?;
        assert_eq!(types, vec![Type::TEXT]);
        assert!(matches!(cell_at(&cols[0], 0)?, Cell::Text("[1, 2]")));
        assert!(matches!(cell_at(&cols[0], 1)?, Cell::Null));
        Ok(())
    }

    #[test]
    fn cells_encode_to_postgres_binary() {
        let mut buf = BytesMut::new();
        assert!(matches!(
            Cell::Int8(42).to_sql_checked(&Type::INT8, &mut buf),
            Ok(IsNull::No)
        ));
        assert_eq!(buf.len(), 8);
        assert!(matches!(
            Cell::Null.to_sql_checked(&Type::INT8, &mut buf),
            Ok(IsNull::Yes)
        ));
        assert!(Cell::Int8(1).to_sql_checked(&Type::TEXT, &mut buf).is_err());
    }
}
