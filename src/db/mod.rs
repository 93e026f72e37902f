//! Persistence collaborator
//!
//! The reconciliation engine only talks to storage through [`Store::execute`]:
//! one SQL statement plus positional parameters in, rows and an affected-row
//! count out. Values are always bound, never interpolated into SQL text.
//!
//! ## Tables
//!
//! - `education_categories` - category code and display name
//! - `test_sets` - buckets, numbered within their category
//! - `questions` - generated items, position encoded as the `"<n>. "` prefix
//!   of `question_text`

pub mod questions;
pub mod schema;
pub mod test_sets;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::StoreError;

/// A bound parameter or returned column value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    pub fn text(value: impl Into<String>) -> Self {
        SqlValue::Text(value.into())
    }

    pub fn opt_text(value: Option<impl Into<String>>) -> Self {
        value.map(|v| SqlValue::Text(v.into())).unwrap_or(SqlValue::Null)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            SqlValue::Real(f) => ToSqlOutput::Owned(Value::Real(*f)),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

/// One result row with named columns
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<SqlValue>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    pub fn get(&self, column: &str) -> Result<&SqlValue, StoreError> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
            .ok_or_else(|| StoreError::MissingColumn(column.to_string()))
    }

    pub fn get_i64(&self, column: &str) -> Result<i64, StoreError> {
        match self.get(column)? {
            SqlValue::Integer(i) => Ok(*i),
            SqlValue::Text(s) => s.trim().parse().map_err(|_| decode(column, "expected integer text")),
            other => Err(decode(column, &format!("expected integer, got {:?}", other))),
        }
    }

    pub fn get_str(&self, column: &str) -> Result<&str, StoreError> {
        match self.get(column)? {
            SqlValue::Text(s) => Ok(s),
            other => Err(decode(column, &format!("expected text, got {:?}", other))),
        }
    }

    pub fn get_opt_str(&self, column: &str) -> Result<Option<&str>, StoreError> {
        match self.get(column)? {
            SqlValue::Null => Ok(None),
            SqlValue::Text(s) => Ok(Some(s)),
            other => Err(decode(column, &format!("expected text or null, got {:?}", other))),
        }
    }
}

fn decode(column: &str, detail: &str) -> StoreError {
    StoreError::Decode {
        column: column.to_string(),
        detail: detail.to_string(),
    }
}

/// Result of one statement
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    /// Rows returned for reads, rows changed for writes
    pub row_count: usize,
}

impl QueryResult {
    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// First row, or an error naming what was expected
    pub fn one(&self, what: &str) -> Result<&Row, StoreError> {
        self.rows
            .first()
            .ok_or_else(|| StoreError::Query(format!("{} returned no rows", what)))
    }
}

/// Parameterized SQL execution
pub trait Store {
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<QueryResult, StoreError>;
}

impl<S: Store + ?Sized> Store for &mut S {
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<QueryResult, StoreError> {
        (**self).execute(sql, params)
    }
}

/// SQLite-backed store
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open or create a database file
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self, StoreError> {
        info!("Opening SQLite database at {:?}", path);

        let conn = Connection::open(path)
            .map_err(|e| StoreError::Connection(format!("Failed to open {}: {}", path.display(), e)))?;

        conn.busy_timeout(busy_timeout)?;
        // WAL for concurrent readers while a run is writing
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;")?;

        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        debug!("Opening in-memory SQLite database");

        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Connection(format!("Failed to open in-memory SQLite: {}", e)))?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        Ok(Self { conn })
    }

    /// Run a batch of statements without parameters (schema setup)
    pub fn execute_batch(&self, sql: &str) -> Result<(), StoreError> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Release the connection, reporting any close error
    pub fn close(self) -> Result<(), StoreError> {
        self.conn
            .close()
            .map_err(|(_, e)| StoreError::Connection(format!("Failed to close SQLite: {}", e)))
    }
}

impl Store for SqliteStore {
    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<QueryResult, StoreError> {
        debug!(sql = sql.trim(), params = params.len(), "Executing statement");

        let mut stmt = self.conn.prepare_cached(sql)?;
        let columns: Arc<[String]> = stmt.column_names().into_iter().map(String::from).collect();
        let readonly = stmt.readonly();

        let mut rows = Vec::new();
        {
            let mut cursor = stmt.query(params_from_iter(params.iter()))?;
            while let Some(row) = cursor.next()? {
                let mut values = Vec::with_capacity(columns.len());
                for i in 0..columns.len() {
                    values.push(read_value(row.get_ref(i)?, &columns[i])?);
                }
                rows.push(Row::new(columns.clone(), values));
            }
        }
        drop(stmt);

        let row_count = if readonly {
            rows.len()
        } else {
            self.conn.changes() as usize
        };

        Ok(QueryResult { rows, row_count })
    }
}

fn read_value(value: ValueRef<'_>, column: &str) -> Result<SqlValue, StoreError> {
    Ok(match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(i) => SqlValue::Integer(i),
        ValueRef::Real(f) => SqlValue::Real(f),
        ValueRef::Text(bytes) => SqlValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(_) => return Err(decode(column, "blob columns are not supported")),
    })
}
