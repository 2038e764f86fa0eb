use crate::error::SQLError;

/// A dynamically-typed SQL parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// `Text` for `Some`, `Null` for `None`.
    pub fn opt_text(s: Option<&str>) -> Self {
        match s {
            Some(s) => Value::Text(s.to_string()),
            None => Value::Null,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

/// A row returned from a SQL query: column name to value.
#[derive(Debug, Clone, Default)]
pub struct Row {
    pub columns: Vec<(String, Value)>,
}

impl Row {
    /// Get a column value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Get a text column value by name.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(Value::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Get an integer column value by name.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(Value::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    /// Get a real column value by name.
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        match self.get(name) {
            Some(Value::Real(f)) => Some(*f),
            _ => None,
        }
    }
}

/// SQLStore provides a SQL execution interface backed by an embedded database.
pub trait SQLStore: Send + Sync {
    /// Execute a query and return rows. Also used for `INSERT ... RETURNING`.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, SQLError>;

    /// Execute a statement (INSERT/UPDATE/DELETE) and return affected row count.
    fn exec(&self, sql: &str, params: &[Value]) -> Result<u64, SQLError>;

    /// Execute several parameterless statements (schema setup).
    fn exec_batch(&self, sql: &str) -> Result<(), SQLError>;
}
