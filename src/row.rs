//! Store-neutral result rows.
//!
//! Executors hand back [`QueryRow`]s: column names paired with `sea_query::Value`s.
//! Selections decode them with [`TryGetable`] (one value) and [`FromQueryRow`]
//! (a whole row), so a projection never depends on a particular driver's row type.

use crate::executor::ProjectionError;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use may_postgres::types::Type;
use may_postgres::Row;
use rust_decimal::Decimal;
use sea_query::{Value, ValueType};
use uuid::Uuid;

/// Error type for value extraction failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueExtractionError {
    /// The value is null (None variant)
    NullValue,
    /// The value type doesn't match the expected type
    TypeMismatch { expected: String, actual: String },
    /// Value conversion failed (e.g., overflow, invalid format)
    ConversionError(String),
}

impl std::fmt::Display for ValueExtractionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueExtractionError::NullValue => write!(f, "Value is null"),
            ValueExtractionError::TypeMismatch { expected, actual } => {
                write!(f, "Type mismatch: expected {expected}, got {actual}")
            }
            ValueExtractionError::ConversionError(msg) => write!(f, "Conversion error: {msg}"),
        }
    }
}

impl std::error::Error for ValueExtractionError {}

/// Safe extraction of a Rust value from a `sea_query::Value`.
///
/// Integer targets accept any narrower signed integer variant, since
/// PostgreSQL `COUNT(*)` is `BIGINT` while most id columns are `INTEGER`.
pub trait TryGetable: Sized {
    fn try_get(value: &Value) -> Result<Self, ValueExtractionError>;
}

fn mismatch(expected: &str, value: &Value) -> ValueExtractionError {
    ValueExtractionError::TypeMismatch {
        expected: expected.to_string(),
        actual: format!("{value:?}"),
    }
}

macro_rules! impl_try_getable {
    ($type:ty, $variant:ident) => {
        impl TryGetable for $type {
            fn try_get(value: &Value) -> Result<Self, ValueExtractionError> {
                match value {
                    Value::$variant(Some(v)) => Ok(v.clone()),
                    Value::$variant(None) => Err(ValueExtractionError::NullValue),
                    _ => Err(mismatch(stringify!($variant), value)),
                }
            }
        }
    };
}

impl_try_getable!(bool, Bool);
impl_try_getable!(i16, SmallInt);
impl_try_getable!(f32, Float);
impl_try_getable!(String, String);
impl_try_getable!(Vec<u8>, Bytes);

// Goes through `ValueType` so the variant's payload layout does not matter here.
macro_rules! impl_try_getable_value_type {
    ($type:ty, $variant:ident) => {
        impl TryGetable for $type {
            fn try_get(value: &Value) -> Result<Self, ValueExtractionError> {
                match value {
                    Value::$variant(_) => <Option<$type> as ValueType>::try_from(value.clone())
                        .map_err(|_| mismatch(stringify!($variant), value))?
                        .ok_or(ValueExtractionError::NullValue),
                    _ => Err(mismatch(stringify!($variant), value)),
                }
            }
        }
    };
}

impl_try_getable_value_type!(NaiveDate, ChronoDate);
impl_try_getable_value_type!(NaiveTime, ChronoTime);
impl_try_getable_value_type!(NaiveDateTime, ChronoDateTime);
impl_try_getable_value_type!(DateTime<Utc>, ChronoDateTimeUtc);
impl_try_getable_value_type!(DateTime<FixedOffset>, ChronoDateTimeWithTimeZone);
impl_try_getable_value_type!(Uuid, Uuid);
impl_try_getable_value_type!(Decimal, Decimal);

impl TryGetable for i32 {
    fn try_get(value: &Value) -> Result<Self, ValueExtractionError> {
        match value {
            Value::Int(Some(v)) => Ok(*v),
            Value::SmallInt(Some(v)) => Ok(i32::from(*v)),
            Value::Int(None) | Value::SmallInt(None) => Err(ValueExtractionError::NullValue),
            Value::BigInt(Some(v)) => i32::try_from(*v)
                .map_err(|e| ValueExtractionError::ConversionError(format!("{v} does not fit i32: {e}"))),
            Value::BigInt(None) => Err(ValueExtractionError::NullValue),
            _ => Err(mismatch("Int", value)),
        }
    }
}

impl TryGetable for i64 {
    fn try_get(value: &Value) -> Result<Self, ValueExtractionError> {
        match value {
            Value::BigInt(Some(v)) => Ok(*v),
            Value::Int(Some(v)) => Ok(i64::from(*v)),
            Value::SmallInt(Some(v)) => Ok(i64::from(*v)),
            Value::BigInt(None) | Value::Int(None) | Value::SmallInt(None) => {
                Err(ValueExtractionError::NullValue)
            }
            _ => Err(mismatch("BigInt", value)),
        }
    }
}

impl TryGetable for u64 {
    fn try_get(value: &Value) -> Result<Self, ValueExtractionError> {
        let signed = i64::try_get(value)?;
        u64::try_from(signed)
            .map_err(|_| ValueExtractionError::ConversionError(format!("{signed} is negative")))
    }
}

impl TryGetable for f64 {
    fn try_get(value: &Value) -> Result<Self, ValueExtractionError> {
        match value {
            Value::Double(Some(v)) => Ok(*v),
            Value::Float(Some(v)) => Ok(f64::from(*v)),
            Value::Double(None) | Value::Float(None) => Err(ValueExtractionError::NullValue),
            _ => Err(mismatch("Double", value)),
        }
    }
}

impl TryGetable for serde_json::Value {
    fn try_get(value: &Value) -> Result<Self, ValueExtractionError> {
        match value {
            Value::Json(Some(v)) => Ok((**v).clone()),
            Value::Json(None) => Err(ValueExtractionError::NullValue),
            _ => Err(mismatch("Json", value)),
        }
    }
}

impl<T: TryGetable> TryGetable for Option<T> {
    fn try_get(value: &Value) -> Result<Self, ValueExtractionError> {
        match T::try_get(value) {
            Ok(v) => Ok(Some(v)),
            Err(ValueExtractionError::NullValue) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// One result row: column names and their values, in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRow {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl QueryRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column; used by executors and by test fixtures.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(column, value);
        self
    }

    pub fn push(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.columns.push(column.into());
        self.values.push(value.into());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Raw value at `idx`
    pub fn value(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// Read the value at `idx` as `T`
    ///
    /// # Errors
    ///
    /// Returns `ProjectionError::Extraction` if the column is missing or cannot
    /// be converted.
    pub fn get<T: TryGetable>(&self, idx: usize) -> Result<T, ProjectionError> {
        let column = self
            .columns
            .get(idx)
            .cloned()
            .unwrap_or_else(|| format!("#{idx}"));
        let value = self.values.get(idx).ok_or_else(|| ProjectionError::Extraction {
            column: column.clone(),
            source: ValueExtractionError::ConversionError(format!(
                "row has {} columns",
                self.values.len()
            )),
        })?;
        T::try_get(value).map_err(|source| ProjectionError::Extraction { column, source })
    }

    /// Read the first column called `name` as `T`
    ///
    /// # Errors
    ///
    /// Returns `ProjectionError::Extraction` if no such column exists or it
    /// cannot be converted.
    pub fn get_by_name<T: TryGetable>(&self, name: &str) -> Result<T, ProjectionError> {
        match self.columns.iter().position(|c| c == name) {
            Some(idx) => self.get(idx),
            None => Err(ProjectionError::Extraction {
                column: name.to_string(),
                source: ValueExtractionError::ConversionError("no such column".to_string()),
            }),
        }
    }

    /// Decode a `may_postgres` row into a `QueryRow`.
    ///
    /// # Errors
    ///
    /// Returns `ProjectionError::ParseError` for column types this crate does
    /// not map, or the driver error if decoding fails.
    pub fn from_postgres(row: &Row) -> Result<Self, ProjectionError> {
        let mut out = QueryRow::new();
        for (idx, column) in row.columns().iter().enumerate() {
            let ty = column.type_();
            let value = if *ty == Type::BOOL {
                Value::Bool(row.try_get::<_, Option<bool>>(idx)?)
            } else if *ty == Type::INT2 {
                Value::SmallInt(row.try_get::<_, Option<i16>>(idx)?)
            } else if *ty == Type::INT4 {
                Value::Int(row.try_get::<_, Option<i32>>(idx)?)
            } else if *ty == Type::INT8 {
                Value::BigInt(row.try_get::<_, Option<i64>>(idx)?)
            } else if *ty == Type::FLOAT4 {
                Value::Float(row.try_get::<_, Option<f32>>(idx)?)
            } else if *ty == Type::FLOAT8 {
                Value::Double(row.try_get::<_, Option<f64>>(idx)?)
            } else if *ty == Type::TEXT
                || *ty == Type::VARCHAR
                || *ty == Type::BPCHAR
                || *ty == Type::NAME
            {
                Value::String(row.try_get::<_, Option<String>>(idx)?)
            } else if *ty == Type::BYTEA {
                Value::Bytes(row.try_get::<_, Option<Vec<u8>>>(idx)?)
            } else if *ty == Type::JSON || *ty == Type::JSONB {
                Value::Json(row.try_get::<_, Option<serde_json::Value>>(idx)?.map(Box::new))
            } else if *ty == Type::DATE {
                Value::from(row.try_get::<_, Option<NaiveDate>>(idx)?)
            } else if *ty == Type::TIME {
                Value::from(row.try_get::<_, Option<NaiveTime>>(idx)?)
            } else if *ty == Type::TIMESTAMP {
                Value::from(row.try_get::<_, Option<NaiveDateTime>>(idx)?)
            } else if *ty == Type::TIMESTAMPTZ {
                Value::from(row.try_get::<_, Option<DateTime<Utc>>>(idx)?)
            } else if *ty == Type::UUID {
                Value::from(row.try_get::<_, Option<Uuid>>(idx)?)
            } else if *ty == Type::NUMERIC {
                Value::from(row.try_get::<_, Option<Decimal>>(idx)?)
            } else {
                return Err(ProjectionError::ParseError(format!(
                    "Unsupported column type {} for column '{}'",
                    ty,
                    column.name()
                )));
            };
            out.push(column.name(), value);
        }
        Ok(out)
    }
}

/// Trait for types that can be built from a whole [`QueryRow`]
pub trait FromQueryRow: Sized {
    fn from_query_row(row: &QueryRow) -> Result<Self, ProjectionError>;
}

macro_rules! impl_from_query_row_tuple {
    ($($name:ident => $idx:tt),+) => {
        impl<$($name: TryGetable),+> FromQueryRow for ($($name,)+) {
            fn from_query_row(row: &QueryRow) -> Result<Self, ProjectionError> {
                Ok(($(row.get::<$name>($idx)?,)+))
            }
        }
    };
}

impl_from_query_row_tuple!(A => 0);
impl_from_query_row_tuple!(A => 0, B => 1);
impl_from_query_row_tuple!(A => 0, B => 1, C => 2);
impl_from_query_row_tuple!(A => 0, B => 1, C => 2, D => 3);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_by_index_and_name() {
        let row = QueryRow::new().with("foo", "bar").with("id", 3i64);
        assert_eq!(row.get::<String>(0).unwrap(), "bar");
        assert_eq!(row.get_by_name::<i64>("id").unwrap(), 3);
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn test_integer_widening() {
        let row = QueryRow::new().with("a", 7i32).with("b", 9i64);
        assert_eq!(row.get::<i64>(0).unwrap(), 7);
        assert_eq!(row.get::<i32>(1).unwrap(), 9);
        assert_eq!(row.get::<u64>(1).unwrap(), 9);
    }

    #[test]
    fn test_null_into_option() {
        let row = QueryRow::new().with("count", Value::BigInt(None));
        assert_eq!(row.get::<Option<i64>>(0).unwrap(), None);
        assert!(matches!(
            row.get::<i64>(0),
            Err(ProjectionError::Extraction { source: ValueExtractionError::NullValue, .. })
        ));
    }

    #[test]
    fn test_type_mismatch_names_column() {
        let row = QueryRow::new().with("foo", "text");
        match row.get::<i32>(0) {
            Err(ProjectionError::Extraction { column, source }) => {
                assert_eq!(column, "foo");
                assert!(matches!(source, ValueExtractionError::TypeMismatch { .. }));
            }
            other => panic!("expected extraction error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_column() {
        let row = QueryRow::new().with("foo", "x");
        assert!(row.get::<String>(3).is_err());
        assert!(row.get_by_name::<String>("bar").is_err());
    }

    #[test]
    fn test_negative_into_u64_fails() {
        let row = QueryRow::new().with("n", -1i64);
        assert!(row.get::<u64>(0).is_err());
    }

    #[test]
    fn test_temporal_values() {
        let day = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let at = day.and_hms_opt(13, 45, 0).unwrap();
        let row = QueryRow::new()
            .with("booked_on", day)
            .with("booked_at", at)
            .with("created_at", at.and_utc())
            .with("closed_at", Option::<DateTime<Utc>>::None);

        assert_eq!(row.get::<NaiveDate>(0).unwrap(), day);
        assert_eq!(row.get::<NaiveDateTime>(1).unwrap(), at);
        assert_eq!(row.get::<DateTime<Utc>>(2).unwrap(), at.and_utc());
        assert_eq!(row.get::<Option<DateTime<Utc>>>(3).unwrap(), None);
        assert!(matches!(
            row.get::<DateTime<Utc>>(3),
            Err(ProjectionError::Extraction { source: ValueExtractionError::NullValue, .. })
        ));
    }

    #[test]
    fn test_uuid_and_decimal_values() {
        let id = Uuid::new_v4();
        let amount = Decimal::new(12_345, 2);
        let row = QueryRow::new().with("id", id).with("amount", amount);

        let (got_id, got_amount): (Uuid, Decimal) = FromQueryRow::from_query_row(&row).unwrap();
        assert_eq!(got_id, id);
        assert_eq!(got_amount.to_string(), "123.45");

        assert!(matches!(
            row.get::<Uuid>(1),
            Err(ProjectionError::Extraction { source: ValueExtractionError::TypeMismatch { .. }, .. })
        ));
        assert!(row.get::<NaiveDate>(0).is_err());
    }

    #[test]
    fn test_tuple_from_query_row() {
        let row = QueryRow::new().with("foo", "bar").with("id", 2i32);
        let (foo, id): (String, i32) = FromQueryRow::from_query_row(&row).unwrap();
        assert_eq!(foo, "bar");
        assert_eq!(id, 2);
    }
}
