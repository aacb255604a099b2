//! Numeric column decoding tolerant of the stores' representations.
//!
//! Stored values may be floats, integers, or decimals returned as text
//! (MySQL `DECIMAL`). NULL decodes to `None`.

use std::fmt::Display;

use sqlx::{ColumnIndex, Decode, Row, Type};

use winddb_common::{WindDbError, WindDbResult};

/// Decode a numeric column as `f64`.
pub fn coerce_f64<R, I>(row: &R, index: I) -> WindDbResult<Option<f64>>
where
    R: Row,
    I: ColumnIndex<R> + Copy + Display,
    for<'r> f64: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> i64: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> String: Decode<'r, R::Database> + Type<R::Database>,
{
    if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
        return Ok(value);
    }
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return Ok(value.map(|v| v as f64));
    }
    match row.try_get::<Option<String>, _>(index) {
        Ok(None) => Ok(None),
        Ok(Some(text)) => text.trim().parse::<f64>().map(Some).map_err(|_| {
            WindDbError::Database(format!("Column {} is not numeric: {:?}", index, text))
        }),
        Err(e) => Err(WindDbError::Database(format!(
            "Column {} could not be decoded: {}",
            index, e
        ))),
    }
}

/// Decode a numeric column as `i64`, truncating fractional values.
pub fn coerce_i64<R, I>(row: &R, index: I) -> WindDbResult<Option<i64>>
where
    R: Row,
    I: ColumnIndex<R> + Copy + Display,
    for<'r> f64: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> i64: Decode<'r, R::Database> + Type<R::Database>,
    for<'r> String: Decode<'r, R::Database> + Type<R::Database>,
{
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return Ok(value);
    }
    coerce_f64(row, index).map(|value| value.map(|v| v as i64))
}
