//! Column decoding helpers shared by the `row_to_*` mappers.
//!
//! UUIDs, timestamps, and enums are stored as TEXT; these wrap the parse
//! failures in [`rusqlite::Error::FromSqlConversionFailure`] so a corrupt
//! column surfaces with its index instead of panicking.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Row;
use uuid::Uuid;

fn conv_err(idx: usize, err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}

/// Decode a TEXT column holding a UUID.
pub(crate) fn uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| conv_err(idx, e))
}

/// Decode a nullable TEXT column holding a UUID.
pub(crate) fn opt_uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        Some(s) => Uuid::parse_str(&s).map(Some).map_err(|e| conv_err(idx, e)),
        None => Ok(None),
    }
}

/// Decode a TEXT column holding an RFC 3339 timestamp.
pub(crate) fn ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conv_err(idx, e))
}

/// Decode a nullable TEXT column holding an RFC 3339 timestamp.
pub(crate) fn opt_ts_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        Some(s) => DateTime::parse_from_rfc3339(&s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| conv_err(idx, e)),
        None => Ok(None),
    }
}

/// Decode a TEXT column through the type's `FromStr`.
pub(crate) fn parsed_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|e| conv_err(idx, e))
}

/// Decode a nullable TEXT column holding a JSON document.
pub(crate) fn opt_json_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<serde_json::Value>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        Some(s) => serde_json::from_str(&s).map(Some).map_err(|e| conv_err(idx, e)),
        None => Ok(None),
    }
}

/// Decode a nullable TEXT column holding a JSON array, NULL meaning empty.
pub(crate) fn json_vec_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<T>>
where
    T: serde::de::DeserializeOwned,
{
    let raw: Option<String> = row.get(idx)?;
    match raw {
        Some(s) => serde_json::from_str(&s).map_err(|e| conv_err(idx, e)),
        None => Ok(Vec::new()),
    }
}
