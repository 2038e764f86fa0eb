//! Relation store adapter.
//!
//! The aggregator and the search merger talk to the store only through
//! [`RelationStore`]: filtered reads, count-only reads, insert-returning
//! and filtered deletes. [`SqlRelation`] runs them on a [`SQLStore`];
//! tests wrap it to inject failures and races.

use std::sync::Arc;

use async_trait::async_trait;
use gallery_sql::{Row, SQLError, SQLStore, Select, Value, quote_ident};

/// Table-oriented store consumed by the favorites and search components.
#[async_trait]
pub trait RelationStore: Send + Sync {
    /// Rows matching the query, ordered and windowed as requested.
    async fn select(&self, query: &Select) -> Result<Vec<Row>, SQLError>;

    /// Number of rows matching the query's predicates.
    async fn count(&self, query: &Select) -> Result<u64, SQLError>;

    /// Insert one row and return it as stored.
    ///
    /// A duplicate key surfaces as [`SQLError::UniqueViolation`].
    async fn insert(&self, table: &str, values: Vec<(String, Value)>) -> Result<Row, SQLError>;

    /// Delete the rows matching the query's predicates. Returns the number
    /// of rows removed.
    async fn delete(&self, query: &Select) -> Result<u64, SQLError>;
}

/// [`RelationStore`] over an embedded SQL store.
///
/// The store is synchronous, so every call runs on tokio's blocking pool
/// and the async caller only awaits the result.
pub struct SqlRelation {
    db: Arc<dyn SQLStore>,
}

impl SqlRelation {
    pub fn new(db: Arc<dyn SQLStore>) -> Self {
        Self { db }
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, SQLError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn SQLStore) -> Result<T, SQLError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || op(db.as_ref()))
            .await
            .map_err(|e| SQLError::Execution(format!("store task failed: {e}")))?
    }
}

#[async_trait]
impl RelationStore for SqlRelation {
    async fn select(&self, query: &Select) -> Result<Vec<Row>, SQLError> {
        let (sql, params) = query.to_sql();
        self.blocking(move |db| db.query(&sql, &params)).await
    }

    async fn count(&self, query: &Select) -> Result<u64, SQLError> {
        let (sql, params) = query.to_count_sql();
        let rows = self.blocking(move |db| db.query(&sql, &params)).await?;
        Ok(rows
            .first()
            .and_then(|r| r.get_i64("cnt"))
            .unwrap_or(0)
            .max(0) as u64)
    }

    async fn insert(&self, table: &str, values: Vec<(String, Value)>) -> Result<Row, SQLError> {
        if values.is_empty() {
            return Err(SQLError::Execution(format!("insert into {table} without columns")));
        }
        let columns: Vec<String> = values.iter().map(|(c, _)| quote_ident(c)).collect();
        let slots: Vec<String> = (1..=values.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            quote_ident(table),
            columns.join(", "),
            slots.join(", ")
        );
        let params: Vec<Value> = values.into_iter().map(|(_, v)| v).collect();

        self.blocking(move |db| db.query(&sql, &params))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SQLError::Execution(format!("insert into {table} returned no row")))
    }

    async fn delete(&self, query: &Select) -> Result<u64, SQLError> {
        let (sql, params) = query.to_delete_sql().ok_or_else(|| {
            SQLError::Execution(format!("refusing unfiltered delete on {}", query.table()))
        })?;
        self.blocking(move |db| db.exec(&sql, &params)).await
    }
}
