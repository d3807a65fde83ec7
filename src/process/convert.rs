use crate::process::date_parser;
use anyhow::{anyhow, bail, Context, Result};
use arrow::{
    array::{Array, ArrayRef, AsArray, StringArray, TimestampMicrosecondBuilder},
    compute::{cast, cast_with_options, CastOptions},
    datatypes::{DataType, Float64Type, SchemaRef, TimeUnit},
    record_batch::RecordBatch,
};
use std::sync::Arc;

/// Convert the columns of `batch` into the types of `target`, column by column.
///
/// Utf8 → Timestamp(µs) goes through the fast date parser; every other
/// mismatch is a strict Arrow cast (see [`cast_strict`]). Columns whose types already match are passed
/// through untouched.
pub fn convert_to_final_types(batch: &RecordBatch, target: &SchemaRef) -> Result<RecordBatch> {
    if batch.num_columns() != target.fields().len() {
        return Err(anyhow!(
            "batch has {} columns, target schema has {}",
            batch.num_columns(),
            target.fields().len()
        ));
    }

    let mut out = Vec::with_capacity(batch.num_columns());
    for (arr, fld) in batch.columns().iter().zip(target.fields()) {
        if arr.data_type() == fld.data_type() {
            out.push(arr.clone());
            continue;
        }
        let col = match (arr.data_type(), fld.data_type()) {
            // Date → timestamp
            (DataType::Utf8, DataType::Timestamp(TimeUnit::Microsecond, tz)) => {
                let parsed = parse_timestamp_column(arr, fld.name())?;
                Arc::new(parsed.with_timezone_opt(tz.clone())) as ArrayRef
            }
            (_, to) => cast_strict(arr, to)
                .with_context(|| format!("casting column `{}` to {}", fld.name(), to))?,
        };
        out.push(col);
    }

    RecordBatch::try_new(target.clone(), out).context("building converted RecordBatch")
}

/// Arrow cast that errors on values it cannot represent instead of nulling
/// them. Blank strings count as missing, and floats only become integers when
/// they are whole.
pub fn cast_strict(arr: &ArrayRef, to: &DataType) -> Result<ArrayRef> {
    let arr = if arr.data_type() == &DataType::Utf8 && to != &DataType::Utf8 {
        blank_to_null(arr)
    } else {
        arr.clone()
    };

    let options = CastOptions {
        safe: false,
        ..Default::default()
    };
    let out = cast_with_options(&arr, to, &options)?;

    if arr.data_type().is_floating() && to.is_integer() {
        ensure_whole(&arr, &out)?;
    }
    Ok(out)
}

fn blank_to_null(arr: &ArrayRef) -> ArrayRef {
    let values: StringArray = arr
        .as_string::<i32>()
        .iter()
        .map(|v| v.map(str::trim).filter(|v| !v.is_empty()))
        .collect();
    Arc::new(values)
}

fn ensure_whole(src: &ArrayRef, out: &ArrayRef) -> Result<()> {
    let src = cast(src, &DataType::Float64)?;
    let back = cast(out, &DataType::Float64)?;
    let (src, back) = (
        src.as_primitive::<Float64Type>(),
        back.as_primitive::<Float64Type>(),
    );
    for row in 0..src.len() {
        if src.is_valid(row) && src.value(row) != back.value(row) {
            bail!("{} at row {} is not a whole number", src.value(row), row);
        }
    }
    Ok(())
}

fn parse_timestamp_column(
    arr: &ArrayRef,
    name: &str,
) -> Result<arrow::array::TimestampMicrosecondArray> {
    let sarr = arr.as_string::<i32>();
    let mut b = TimestampMicrosecondBuilder::with_capacity(sarr.len());
    for (row, opt) in sarr.iter().enumerate() {
        match opt.map(str::trim) {
            None | Some("") => b.append_null(),
            Some(s) => {
                let ts = date_parser::parse_timestamp_micros(s).ok_or_else(|| {
                    anyhow!("invalid timestamp {:?} in column `{}` at row {}", s, name, row)
                })?;
                b.append_value(ts);
            }
        }
    }
    Ok(b.finish())
}
