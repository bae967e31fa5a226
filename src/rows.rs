//! Tabular result sets and their JSON form.
//!
//! A [`RowSet`] is what every read query returns: ordered column names plus rows of
//! [`Cell`]s aligned with them. [`serialize_rows`] turns it into a sequence of
//! `{column -> value}` objects, decoding raw byte cells as UTF-8 text. A row that cannot
//! be decoded (wrong width, bytes that are not UTF-8) is skipped with a warning; the rest
//! of the result is still returned.

use serde_json::{Map, Number, Value};
use thiserror::Error;

/// One column value as read from the store.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Int(n)
    }
}

impl From<i32> for Cell {
    fn from(n: i32) -> Self {
        Cell::Int(n.into())
    }
}

impl From<bool> for Cell {
    fn from(b: bool) -> Self {
        Cell::Bool(b)
    }
}

impl From<Vec<u8>> for Cell {
    fn from(b: Vec<u8>) -> Self {
        Cell::Bytes(b)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Cell::Null)
    }
}

/// Result of a read query.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RowSet {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RowSet {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub type JsonRow = Map<String, Value>;

#[derive(Error, Debug, PartialEq)]
pub enum RowError {
    #[error("row has {found} values for {expected} columns")]
    Width { expected: usize, found: usize },
    #[error("column {column}: value is not valid UTF-8")]
    Utf8 { column: String },
}

/// Convert a single cell to JSON. Non-finite floats become null.
pub fn cell_to_value(column: &str, cell: Cell) -> Result<Value, RowError> {
    Ok(match cell {
        Cell::Null => Value::Null,
        Cell::Bool(b) => Value::Bool(b),
        Cell::Int(n) => Value::Number(n.into()),
        Cell::Float(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        Cell::Text(s) => Value::String(s),
        Cell::Bytes(b) => Value::String(
            String::from_utf8(b).map_err(|_| RowError::Utf8 { column: column.to_string() })?,
        ),
    })
}

/// Convert one row aligned with `columns` into a JSON object.
pub fn serialize_row(columns: &[String], row: Vec<Cell>) -> Result<JsonRow, RowError> {
    if row.len() != columns.len() {
        return Err(RowError::Width { expected: columns.len(), found: row.len() });
    }
    let mut map = Map::with_capacity(columns.len());
    for (name, cell) in columns.iter().zip(row) {
        map.insert(name.clone(), cell_to_value(name, cell)?);
    }
    Ok(map)
}

/// Serialize every decodable row, preserving order. Never returns `null`: an empty
/// result set is an empty vector.
pub fn serialize_rows(set: RowSet) -> Vec<JsonRow> {
    let RowSet { columns, rows } = set;
    let mut out = Vec::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
        match serialize_row(&columns, row) {
            Ok(map) => out.push(map),
            Err(e) => tracing::warn!(row = index, error = %e, "skipping undecodable row"),
        }
    }
    out
}
