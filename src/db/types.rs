//! Decoding of driver rows into driver-neutral [`Row`]s.
//!
//! # Architecture
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies column types into logical categories
//! 2. Database-specific decoders handle the actual value extraction
//!
//! NULL is checked on the raw value before any typed decode. A value that
//! cannot be decoded is a mapping error; it is never replaced with NULL.

use crate::db::DatabaseType;
use crate::db::row::Row;
use crate::error::{RepoError, RepoResult};
use crate::models::SqlValue;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Decode, Row as _, Type, TypeInfo, ValueRef};

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Temporal,
    Binary,
    Json,
    Unknown,
}

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str, db: DatabaseType) -> TypeCategory {
    let lower = type_name.to_lowercase();

    // Decimal/Numeric - check first as it overlaps with "numeric" in float checks
    if lower.contains("decimal") || lower.contains("numeric") {
        // SQLite's NUMERIC is actually a float
        if db == DatabaseType::SQLite && lower == "numeric" {
            return TypeCategory::Float;
        }
        return TypeCategory::Decimal;
    }

    // Integer types, matched by name: `point` and `interval` also contain "int"
    if matches!(
        lower.trim_end_matches(" unsigned"),
        "int"
            | "integer"
            | "tinyint"
            | "smallint"
            | "mediumint"
            | "bigint"
            | "int2"
            | "int4"
            | "int8"
            | "serial"
            | "smallserial"
            | "bigserial"
    ) {
        return TypeCategory::Integer;
    }

    // Boolean
    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }

    // Float types
    if lower.contains("float")
        || lower.contains("double")
        || lower == "real"
        || lower == "float4"
        || lower == "float8"
    {
        return TypeCategory::Float;
    }

    // Date/Time types (SQLite stores these as TEXT)
    if db != DatabaseType::SQLite
        && matches!(
            lower.as_str(),
            "timestamp" | "timestamptz" | "datetime" | "date" | "time"
        )
    {
        return TypeCategory::Temporal;
    }

    // JSON types
    if lower == "json" || lower == "jsonb" {
        return TypeCategory::Json;
    }

    // Binary types
    if lower.contains("blob") || lower.contains("binary") || lower == "bytea" {
        return TypeCategory::Binary;
    }

    // Default to text for everything else (varchar, text, char, etc.)
    TypeCategory::Unknown
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Wrapper type for raw MySQL DECIMAL values as strings.
/// This preserves the exact database representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

// =============================================================================
// Row Decoding Trait
// =============================================================================

/// Trait for converting database rows to driver-neutral rows.
pub trait DecodeRow {
    fn decode_row(&self) -> RepoResult<Row>;
}

fn decode_failure(column: &str, type_name: &str, err: sqlx::Error) -> RepoError {
    RepoError::mapping(
        column,
        format!("cannot decode {} value: {}", type_name, err),
    )
}

impl DecodeRow for MySqlRow {
    fn decode_row(&self) -> RepoResult<Row> {
        let mut row = Row::new();
        for (idx, col) in self.columns().iter().enumerate() {
            let type_name = col.type_info().name();
            let value = if self.try_get_raw(idx)?.is_null() {
                SqlValue::Null
            } else {
                let category = categorize_type(type_name, DatabaseType::MySQL);
                mysql::decode_column(self, idx, type_name, category)
                    .map_err(|e| decode_failure(col.name(), type_name, e))?
            };
            row.push(col.name(), value);
        }
        Ok(row)
    }
}

impl DecodeRow for PgRow {
    fn decode_row(&self) -> RepoResult<Row> {
        let mut row = Row::new();
        for (idx, col) in self.columns().iter().enumerate() {
            let type_name = col.type_info().name();
            let value = if self.try_get_raw(idx)?.is_null() {
                SqlValue::Null
            } else {
                let category = categorize_type(type_name, DatabaseType::PostgreSQL);
                postgres::decode_column(self, idx, type_name, category)
                    .map_err(|e| decode_failure(col.name(), type_name, e))?
            };
            row.push(col.name(), value);
        }
        Ok(row)
    }
}

impl DecodeRow for SqliteRow {
    fn decode_row(&self) -> RepoResult<Row> {
        let mut row = Row::new();
        for (idx, col) in self.columns().iter().enumerate() {
            let raw = self.try_get_raw(idx)?;
            let value = if raw.is_null() {
                SqlValue::Null
            } else {
                // SQLite is dynamically typed: classify by the stored value,
                // not the declared column affinity.
                let type_name = raw.type_info().name().to_string();
                let category = categorize_type(&type_name, DatabaseType::SQLite);
                sqlite::decode_column(self, idx, category)
                    .map_err(|e| decode_failure(col.name(), &type_name, e))?
            };
            row.push(col.name(), value);
        }
        Ok(row)
    }
}

// =============================================================================
// Database-Specific Decoders
// =============================================================================

mod mysql {
    use super::*;

    pub fn decode_column(
        row: &MySqlRow,
        idx: usize,
        type_name: &str,
        category: TypeCategory,
    ) -> Result<SqlValue, sqlx::Error> {
        match category {
            TypeCategory::Decimal => row.try_get::<RawDecimal, _>(idx).map(|v| SqlValue::Text(v.0)),
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => row.try_get::<bool, _>(idx).map(SqlValue::Bool),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Temporal => decode_temporal(row, idx, type_name),
            TypeCategory::Binary => row.try_get::<Vec<u8>, _>(idx).map(SqlValue::Bytes),
            TypeCategory::Json => row
                .try_get::<serde_json::Value, _>(idx)
                .map(|v| SqlValue::Text(v.to_string())),
            TypeCategory::Unknown => row.try_get::<String, _>(idx).map(SqlValue::Text),
        }
    }

    fn decode_integer(row: &MySqlRow, idx: usize) -> Result<SqlValue, sqlx::Error> {
        // Signed types first, then unsigned (which may exceed i64)
        match row.try_get::<i64, _>(idx) {
            Ok(v) => Ok(SqlValue::Int(v)),
            Err(_) => {
                let v = row.try_get::<u64, _>(idx)?;
                Ok(i64::try_from(v)
                    .map(SqlValue::Int)
                    .unwrap_or_else(|_| SqlValue::Text(v.to_string())))
            }
        }
    }

    fn decode_float(row: &MySqlRow, idx: usize) -> Result<SqlValue, sqlx::Error> {
        match row.try_get::<f64, _>(idx) {
            Ok(v) => Ok(SqlValue::Float(v)),
            Err(_) => row
                .try_get::<f32, _>(idx)
                .map(|v| SqlValue::Float(f64::from(v))),
        }
    }

    fn decode_temporal(
        row: &MySqlRow,
        idx: usize,
        type_name: &str,
    ) -> Result<SqlValue, sqlx::Error> {
        use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

        let text = match type_name.to_lowercase().as_str() {
            "timestamp" => row.try_get::<DateTime<Utc>, _>(idx)?.to_rfc3339(),
            "date" => row.try_get::<NaiveDate, _>(idx)?.to_string(),
            "time" => row.try_get::<NaiveTime, _>(idx)?.to_string(),
            _ => row.try_get::<NaiveDateTime, _>(idx)?.to_string(),
        };
        Ok(SqlValue::Text(text))
    }
}

mod postgres {
    use super::*;

    pub fn decode_column(
        row: &PgRow,
        idx: usize,
        type_name: &str,
        category: TypeCategory,
    ) -> Result<SqlValue, sqlx::Error> {
        match category {
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => row.try_get::<bool, _>(idx).map(SqlValue::Bool),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Temporal => decode_temporal(row, idx, type_name),
            TypeCategory::Binary => row.try_get::<Vec<u8>, _>(idx).map(SqlValue::Bytes),
            TypeCategory::Json => row
                .try_get::<serde_json::Value, _>(idx)
                .map(|v| SqlValue::Text(v.to_string())),
            // NUMERIC arrives in binary form; read it through a ::text or
            // ::float8 cast in a view if the table needs it.
            TypeCategory::Decimal | TypeCategory::Unknown => {
                row.try_get::<String, _>(idx).map(SqlValue::Text)
            }
        }
    }

    fn decode_integer(row: &PgRow, idx: usize) -> Result<SqlValue, sqlx::Error> {
        if let Ok(v) = row.try_get::<i16, _>(idx) {
            return Ok(SqlValue::Int(v.into()));
        }
        if let Ok(v) = row.try_get::<i32, _>(idx) {
            return Ok(SqlValue::Int(v.into()));
        }
        row.try_get::<i64, _>(idx).map(SqlValue::Int)
    }

    fn decode_float(row: &PgRow, idx: usize) -> Result<SqlValue, sqlx::Error> {
        match row.try_get::<f64, _>(idx) {
            Ok(v) => Ok(SqlValue::Float(v)),
            Err(_) => row
                .try_get::<f32, _>(idx)
                .map(|v| SqlValue::Float(f64::from(v))),
        }
    }

    fn decode_temporal(row: &PgRow, idx: usize, type_name: &str) -> Result<SqlValue, sqlx::Error> {
        use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

        let text = match type_name.to_lowercase().as_str() {
            "timestamptz" => row.try_get::<DateTime<Utc>, _>(idx)?.to_rfc3339(),
            "date" => row.try_get::<NaiveDate, _>(idx)?.to_string(),
            "time" => row.try_get::<NaiveTime, _>(idx)?.to_string(),
            _ => row.try_get::<NaiveDateTime, _>(idx)?.to_string(),
        };
        Ok(SqlValue::Text(text))
    }
}

mod sqlite {
    use super::*;

    pub fn decode_column(
        row: &SqliteRow,
        idx: usize,
        category: TypeCategory,
    ) -> Result<SqlValue, sqlx::Error> {
        match category {
            TypeCategory::Integer => row.try_get::<i64, _>(idx).map(SqlValue::Int),
            TypeCategory::Boolean => row.try_get::<bool, _>(idx).map(SqlValue::Bool),
            TypeCategory::Float | TypeCategory::Decimal => {
                row.try_get::<f64, _>(idx).map(SqlValue::Float)
            }
            TypeCategory::Binary => row.try_get::<Vec<u8>, _>(idx).map(SqlValue::Bytes),
            _ => row.try_get::<String, _>(idx).map(SqlValue::Text),
        }
    }
}
