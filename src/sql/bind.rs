//! Parameter binding and row decoding
//!
//! Typed `ScalarValue`s are bound as typed parameters (never interpolated),
//! and rows are decoded back into typed values per the descriptor's field
//! kinds.

use std::collections::HashMap;
use std::sync::Arc;

use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Postgres, Row};

use crate::error::{Result, StoreError};
use crate::record::DataRecord;
use crate::typeinfo::{FieldKind, ObjectTypeInfo};
use crate::value::ScalarValue;

pub(crate) type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Bind a filter parameter.
///
/// NULL comparisons are rendered as `IS [NOT] NULL` and never reach this
/// point; a NULL here is a builder bug surfaced as an error.
pub(crate) fn bind_param<'q>(query: PgQuery<'q>, value: &ScalarValue) -> Result<PgQuery<'q>> {
    match value {
        ScalarValue::Null => Err(StoreError::invalid_query(
            "NULL cannot be bound as a comparison parameter",
        )),
        ScalarValue::Text(s) => Ok(query.bind(s.clone())),
        ScalarValue::Integer(i) => Ok(query.bind(*i)),
        ScalarValue::Decimal(d) => Ok(query.bind(*d)),
        ScalarValue::Bool(b) => Ok(query.bind(*b)),
        ScalarValue::Timestamp(t) => Ok(query.bind(*t)),
        ScalarValue::Json(v) => Ok(query.bind(v.clone())),
    }
}

/// Bind a column value for INSERT/UPDATE, typing NULLs by the field kind
pub(crate) fn bind_field<'q>(
    query: PgQuery<'q>,
    kind: &FieldKind,
    value: &ScalarValue,
) -> PgQuery<'q> {
    match value {
        ScalarValue::Null => match kind {
            FieldKind::Text => query.bind(None::<String>),
            FieldKind::Integer => query.bind(None::<i64>),
            FieldKind::Decimal { .. } => query.bind(None::<rust_decimal::Decimal>),
            FieldKind::Bool => query.bind(None::<bool>),
            FieldKind::Timestamp => query.bind(None::<chrono::DateTime<chrono::Utc>>),
            FieldKind::Json => query.bind(None::<serde_json::Value>),
        },
        ScalarValue::Integer(i) if matches!(kind, FieldKind::Decimal { .. }) => {
            query.bind(rust_decimal::Decimal::from(*i))
        }
        ScalarValue::Text(s) => query.bind(s.clone()),
        ScalarValue::Integer(i) => query.bind(*i),
        ScalarValue::Decimal(d) => query.bind(*d),
        ScalarValue::Bool(b) => query.bind(*b),
        ScalarValue::Timestamp(t) => query.bind(*t),
        ScalarValue::Json(v) => query.bind(v.clone()),
    }
}

/// Decode one column from a row; unreadable or missing values become NULL
pub(crate) fn decode_column(row: &PgRow, column: &str, kind: &FieldKind) -> ScalarValue {
    match kind {
        FieldKind::Text => row
            .try_get::<Option<String>, _>(column)
            .ok()
            .flatten()
            .map(ScalarValue::Text)
            .unwrap_or(ScalarValue::Null),
        FieldKind::Integer => row
            .try_get::<Option<i64>, _>(column)
            .ok()
            .flatten()
            .map(ScalarValue::Integer)
            .unwrap_or(ScalarValue::Null),
        FieldKind::Decimal { .. } => row
            .try_get::<Option<rust_decimal::Decimal>, _>(column)
            .ok()
            .flatten()
            .map(ScalarValue::Decimal)
            .unwrap_or(ScalarValue::Null),
        FieldKind::Bool => row
            .try_get::<Option<bool>, _>(column)
            .ok()
            .flatten()
            .map(ScalarValue::Bool)
            .unwrap_or(ScalarValue::Null),
        FieldKind::Timestamp => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(column)
            .ok()
            .flatten()
            .map(ScalarValue::Timestamp)
            .unwrap_or(ScalarValue::Null),
        FieldKind::Json => row
            .try_get::<Option<serde_json::Value>, _>(column)
            .ok()
            .flatten()
            .map(ScalarValue::Json)
            .unwrap_or(ScalarValue::Null),
    }
}

/// Decode a fetched row into a clean, persisted record
pub(crate) fn decode_record(
    row: &PgRow,
    type_info: &Arc<ObjectTypeInfo>,
    include_coupled: bool,
) -> DataRecord {
    let mut values = HashMap::new();

    for column in type_info.base_columns() {
        if let Some(kind) = type_info.column_kind(column) {
            let value = decode_column(row, column, &kind);
            if !value.is_null() {
                values.insert(column.to_string(), value);
            }
        }
    }

    if include_coupled {
        if let Some(coupled) = &type_info.coupled {
            for field in &coupled.fields {
                let value = decode_column(row, &field.name, &field.kind);
                if !value.is_null() {
                    values.insert(field.name.clone(), value);
                }
            }
        }
    }

    DataRecord::from_values(type_info.clone(), values)
}
