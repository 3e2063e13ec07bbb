//! Binding of sea-query values as `may_postgres` parameters.
//!
//! Each `Value` becomes an owned, boxed `ToSql` whose Rust type matches the
//! PostgreSQL parameter type the server infers, NULLs included: a NULL text
//! parameter is bound as `Option<String>`, not as some placeholder integer.

use crate::executor::ProjectionError;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use may_postgres::types::ToSql;
use rust_decimal::Decimal;
use sea_query::{Value, ValueType, Values};
use uuid::Uuid;

fn unsupported(value: &Value) -> ProjectionError {
    ProjectionError::QueryError(format!("Unsupported value type in query: {value:?}"))
}

/// Bind `value` as `Option<T>`, whatever the variant's payload layout.
fn typed<T>(value: &Value) -> Result<Box<dyn ToSql>, ProjectionError>
where
    T: ToSql + 'static,
    Option<T>: ValueType,
{
    let v = <Option<T> as ValueType>::try_from(value.clone()).map_err(|_| unsupported(value))?;
    Ok(Box::new(v))
}

fn to_param(value: &Value) -> Result<Box<dyn ToSql>, ProjectionError> {
    let param: Box<dyn ToSql> = match value {
        Value::Bool(v) => Box::new(*v),
        Value::TinyInt(v) => Box::new(v.map(i16::from)),
        Value::SmallInt(v) => Box::new(*v),
        Value::Int(v) => Box::new(*v),
        Value::BigInt(v) => Box::new(*v),
        Value::TinyUnsigned(v) => Box::new(v.map(i16::from)),
        Value::SmallUnsigned(v) => Box::new(v.map(i32::from)),
        Value::Unsigned(v) => Box::new(v.map(i64::from)),
        Value::BigUnsigned(v) => {
            let converted = match v {
                Some(u) => Some(i64::try_from(*u).map_err(|_| {
                    ProjectionError::QueryError(format!(
                        "BigUnsigned value {u} exceeds i64::MAX and cannot be bound"
                    ))
                })?),
                None => None,
            };
            Box::new(converted)
        }
        Value::Float(v) => Box::new(*v),
        Value::Double(v) => Box::new(*v),
        Value::String(v) => Box::new(v.clone()),
        Value::Bytes(v) => Box::new(v.clone()),
        Value::Json(v) => Box::new(v.as_deref().cloned()),
        Value::ChronoDate(_) => typed::<NaiveDate>(value)?,
        Value::ChronoTime(_) => typed::<NaiveTime>(value)?,
        Value::ChronoDateTime(_) => typed::<NaiveDateTime>(value)?,
        Value::ChronoDateTimeUtc(_) => typed::<DateTime<Utc>>(value)?,
        Value::ChronoDateTimeWithTimeZone(_) => typed::<DateTime<FixedOffset>>(value)?,
        Value::Uuid(_) => typed::<Uuid>(value)?,
        Value::Decimal(_) => typed::<Decimal>(value)?,
        _ => return Err(unsupported(value)),
    };
    Ok(param)
}

/// Convert `values` to `ToSql` parameters and run `f` with them.
///
/// The parameters borrow storage owned by this call, so they are only valid
/// inside `f`.
///
/// # Errors
///
/// Returns `ProjectionError::QueryError` for value types without a binding
/// (or an unsigned value above `i64::MAX`), otherwise whatever `f` returns.
pub fn with_converted_params<F, R>(values: &Values, f: F) -> Result<R, ProjectionError>
where
    F: FnOnce(&[&dyn ToSql]) -> Result<R, ProjectionError>,
{
    let owned = values
        .iter()
        .map(to_param)
        .collect::<Result<Vec<_>, _>>()?;
    let params: Vec<&dyn ToSql> = owned.iter().map(|p| p.as_ref()).collect();
    f(&params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_value_becomes_a_param() {
        let values = Values(vec![
            Value::Bool(Some(true)),
            Value::Int(None),
            Value::BigUnsigned(Some(10)),
            Value::String(None),
            Value::Json(Some(Box::new(serde_json::json!({"a": 1})))),
        ]);
        let count = with_converted_params(&values, |params| Ok(params.len())).unwrap();
        assert_eq!(count, 5);
    }

    #[test]
    fn test_temporal_uuid_and_decimal_bind() {
        let day = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let values = Values(vec![
            day.into(),
            day.and_hms_opt(8, 0, 0).unwrap().into(),
            day.and_hms_opt(8, 0, 0).unwrap().and_utc().into(),
            Option::<NaiveTime>::None.into(),
            Uuid::new_v4().into(),
            Option::<Uuid>::None.into(),
            Decimal::new(995, 2).into(),
        ]);
        let count = with_converted_params(&values, |params| Ok(params.len())).unwrap();
        assert_eq!(count, 7);
    }

    #[test]
    fn test_big_unsigned_overflow_is_rejected() {
        let values = Values(vec![Value::BigUnsigned(Some(u64::MAX))]);
        let result = with_converted_params(&values, |_| Ok(()));
        assert!(matches!(result, Err(ProjectionError::QueryError(_))));
    }

    #[test]
    fn test_closure_error_propagates() {
        let result: Result<(), _> = with_converted_params(&Values(vec![]), |params| {
            assert!(params.is_empty());
            Err(ProjectionError::EmptySelection)
        });
        assert!(matches!(result, Err(ProjectionError::EmptySelection)));
    }
}
