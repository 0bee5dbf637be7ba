//! JSON text encoding for list-valued columns.
//!
//! SQLite has no array type, so per-round lists are stored as JSON arrays.
//! Decoding is exact: a list read back equals the list written.

use crate::error::Result;
use rusqlite::types::Type;
use rusqlite::Row;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub fn encode_list<T: Serialize>(items: &[T]) -> Result<String> {
    Ok(serde_json::to_string(items)?)
}

pub fn decode_list<T: DeserializeOwned>(text: &str) -> Result<Vec<T>> {
    Ok(serde_json::from_str(text)?)
}

/// Read and decode a list column inside a row mapper.
pub(crate) fn list_column<T: DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<Vec<T>> {
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
