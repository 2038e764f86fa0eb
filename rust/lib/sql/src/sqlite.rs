use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, ErrorCode, ffi};

use crate::error::SQLError;
use crate::traits::{Row, SQLStore, Value};

/// SqliteStore is a SQLStore implementation backed by rusqlite (bundled SQLite).
///
/// Every connection runs with foreign keys enforced and a `casefold(text)`
/// scalar function that lowercases with full Unicode rules (SQLite's own
/// `lower()` only folds ASCII).
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path.
    pub fn open(path: &Path) -> Result<Self, SQLError> {
        let conn = Connection::open(path)
            .map_err(|e| SQLError::Connection(e.to_string()))?;

        // Enable WAL mode for better concurrent read performance.
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| SQLError::Connection(e.to_string()))?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| SQLError::Connection(e.to_string()))?;

        Self::prepare(conn)
    }

    /// Create an in-memory SQLite database (useful for tests).
    pub fn open_in_memory() -> Result<Self, SQLError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| SQLError::Connection(e.to_string()))?;
        Self::prepare(conn)
    }

    fn prepare(conn: Connection) -> Result<Self, SQLError> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| SQLError::Connection(e.to_string()))?;

        conn.create_scalar_function(
            "casefold",
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| {
                let s: Option<String> = ctx.get(0)?;
                Ok(s.map(|s| s.to_lowercase()))
            },
        )
        .map_err(|e| SQLError::Connection(e.to_string()))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

/// Convert our Value enum to rusqlite's ToSql.
fn bind_params(params: &[Value]) -> Vec<Box<dyn rusqlite::types::ToSql + '_>> {
    params
        .iter()
        .map(|v| -> Box<dyn rusqlite::types::ToSql + '_> {
            match v {
                Value::Null => Box::new(rusqlite::types::Null),
                Value::Integer(i) => Box::new(*i),
                Value::Real(f) => Box::new(*f),
                Value::Text(s) => Box::new(s.as_str()),
                Value::Blob(b) => Box::new(b.as_slice()),
            }
        })
        .collect()
}

/// Map a rusqlite error onto our taxonomy. Constraint failures and
/// unreachable-database failures get their own variants; everything else
/// goes through `fallback`.
fn classify(e: rusqlite::Error, fallback: fn(String) -> SQLError) -> SQLError {
    if let rusqlite::Error::SqliteFailure(ref err, ref msg) = e {
        let message = msg.clone().unwrap_or_else(|| e.to_string());
        match err.code {
            ErrorCode::ConstraintViolation => {
                return match err.extended_code {
                    ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                        SQLError::UniqueViolation(message)
                    }
                    _ => SQLError::Constraint(message),
                };
            }
            ErrorCode::CannotOpen
            | ErrorCode::DatabaseBusy
            | ErrorCode::DatabaseLocked
            | ErrorCode::SystemIoFailure => return SQLError::Connection(message),
            _ => {}
        }
    }
    fallback(e.to_string())
}

impl SQLStore for SqliteStore {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SQLError::Connection(e.to_string()))?;

        let bound = bind_params(params);
        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            bound.iter().map(|b| b.as_ref()).collect();

        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| classify(e, SQLError::Query))?;

        let column_names: Vec<String> = stmt
            .column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), |row| {
                let mut columns = Vec::with_capacity(column_names.len());
                for (i, name) in column_names.iter().enumerate() {
                    columns.push((name.clone(), row_value_at(row, i)));
                }
                Ok(Row { columns })
            })
            .map_err(|e| classify(e, SQLError::Query))?;

        let mut result = Vec::new();
        for row in rows {
            // INSERT ... RETURNING reports constraint failures while stepping.
            result.push(row.map_err(|e| classify(e, SQLError::Query))?);
        }
        Ok(result)
    }

    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SQLError::Connection(e.to_string()))?;

        let bound = bind_params(params);
        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            bound.iter().map(|b| b.as_ref()).collect();

        let affected = conn
            .execute(sql, param_refs.as_slice())
            .map_err(|e| classify(e, SQLError::Execution))?;

        Ok(affected as u64)
    }

    fn exec_batch(&self, sql: &str) -> Result<(), SQLError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| SQLError::Connection(e.to_string()))?;
        conn.execute_batch(sql)
            .map_err(|e| classify(e, SQLError::Execution))
    }
}

/// Extract a Value from a rusqlite row at a given column index.
fn row_value_at(row: &rusqlite::Row, idx: usize) -> Value {
    match row.get_ref(idx) {
        Ok(ValueRef::Integer(i)) => Value::Integer(i),
        Ok(ValueRef::Real(f)) => Value::Real(f),
        Ok(ValueRef::Text(t)) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        Ok(ValueRef::Blob(b)) => Value::Blob(b.to_vec()),
        Ok(ValueRef::Null) | Err(_) => Value::Null,
    }
}
