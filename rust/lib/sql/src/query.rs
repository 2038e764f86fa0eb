//! Filtered SELECT builder.
//!
//! Covers the predicate set the gallery needs from a table-oriented
//! store: equality, membership, array containment / overlap over JSON
//! array text columns, case-insensitive substring match, and OR groups.
//! Every value is bound as a parameter; column and table names come
//! from code and are quoted.

use crate::traits::Value;

/// A single WHERE predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column = value`
    Eq(String, Value),
    /// `column IN (values)`. An empty list matches nothing.
    In(String, Vec<Value>),
    /// JSON array column holds every one of `values`.
    Contains(String, Vec<String>),
    /// JSON array column holds at least one of `values`. An empty list
    /// matches nothing.
    Overlaps(String, Vec<String>),
    /// Case-insensitive substring match. The needle is literal: `%`, `_`
    /// and `\` are escaped before it is embedded in the LIKE pattern.
    ILike(String, String),
    /// Any of the nested filters. An empty group matches nothing.
    Or(Vec<Filter>),
}

impl Filter {
    /// Short name of the predicate kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Filter::Eq(..) => "eq",
            Filter::In(..) => "in",
            Filter::Contains(..) => "contains",
            Filter::Overlaps(..) => "overlaps",
            Filter::ILike(..) => "ilike",
            Filter::Or(..) => "or",
        }
    }

    fn render(&self, params: &mut Vec<Value>) -> String {
        match self {
            Filter::Eq(col, v) => {
                params.push(v.clone());
                format!("{} = ?{}", quote_ident(col), params.len())
            }
            Filter::In(col, values) => {
                if values.is_empty() {
                    return "0".to_string();
                }
                let slots: Vec<String> = values
                    .iter()
                    .map(|v| {
                        params.push(v.clone());
                        format!("?{}", params.len())
                    })
                    .collect();
                format!("{} IN ({})", quote_ident(col), slots.join(", "))
            }
            Filter::Contains(col, values) => {
                if values.is_empty() {
                    return "1".to_string();
                }
                let parts: Vec<String> = values
                    .iter()
                    .map(|v| {
                        params.push(Value::Text(v.clone()));
                        format!(
                            "EXISTS (SELECT 1 FROM json_each({}) WHERE json_each.value = ?{})",
                            quote_ident(col),
                            params.len()
                        )
                    })
                    .collect();
                format!("({})", parts.join(" AND "))
            }
            Filter::Overlaps(col, values) => {
                if values.is_empty() {
                    return "0".to_string();
                }
                let slots: Vec<String> = values
                    .iter()
                    .map(|v| {
                        params.push(Value::Text(v.clone()));
                        format!("?{}", params.len())
                    })
                    .collect();
                format!(
                    "EXISTS (SELECT 1 FROM json_each({}) WHERE json_each.value IN ({}))",
                    quote_ident(col),
                    slots.join(", ")
                )
            }
            Filter::ILike(col, needle) => {
                params.push(Value::Text(like_pattern(needle)));
                format!(
                    "casefold({}) LIKE casefold(?{}) ESCAPE '\\'",
                    quote_ident(col),
                    params.len()
                )
            }
            Filter::Or(filters) => {
                if filters.is_empty() {
                    return "0".to_string();
                }
                let parts: Vec<String> = filters.iter().map(|f| f.render(params)).collect();
                format!("({})", parts.join(" OR "))
            }
        }
    }
}

/// A SELECT over one table or view.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    table: String,
    columns: Vec<String>,
    filters: Vec<Filter>,
    order: Vec<(String, bool)>,
    limit: Option<usize>,
    offset: usize,
}

impl Select {
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: 0,
        }
    }

    /// Restrict the returned columns (default: all).
    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// AND another predicate onto the query.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter(Filter::Eq(column.to_string(), value.into()))
    }

    pub fn is_in(self, column: &str, values: Vec<Value>) -> Self {
        self.filter(Filter::In(column.to_string(), values))
    }

    pub fn contains(self, column: &str, values: Vec<String>) -> Self {
        self.filter(Filter::Contains(column.to_string(), values))
    }

    pub fn overlaps(self, column: &str, values: Vec<String>) -> Self {
        self.filter(Filter::Overlaps(column.to_string(), values))
    }

    pub fn ilike(self, column: &str, needle: &str) -> Self {
        self.filter(Filter::ILike(column.to_string(), needle.to_string()))
    }

    pub fn or(self, filters: Vec<Filter>) -> Self {
        self.filter(Filter::Or(filters))
    }

    pub fn order_by(mut self, column: &str, ascending: bool) -> Self {
        self.order.push((column.to_string(), ascending));
        self
    }

    /// Window the result: skip `offset` rows, return at most `limit`.
    pub fn range(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Render to SQL and bound parameters.
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let cols = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let mut sql = format!("SELECT {cols} FROM {}", quote_ident(&self.table));
        sql.push_str(&self.where_clause(&mut params));

        if !self.order.is_empty() {
            let order: Vec<String> = self
                .order
                .iter()
                .map(|(c, asc)| format!("{} {}", quote_ident(c), if *asc { "ASC" } else { "DESC" }))
                .collect();
            sql.push_str(&format!(" ORDER BY {}", order.join(", ")));
        }

        match self.limit {
            Some(limit) => {
                params.push(Value::Integer(limit as i64));
                params.push(Value::Integer(self.offset as i64));
                sql.push_str(&format!(" LIMIT ?{} OFFSET ?{}", params.len() - 1, params.len()));
            }
            None if self.offset > 0 => {
                params.push(Value::Integer(self.offset as i64));
                sql.push_str(&format!(" LIMIT -1 OFFSET ?{}", params.len()));
            }
            None => {}
        }

        (sql, params)
    }

    /// Render a `DELETE` over the same predicates. Ordering and windowing
    /// are ignored; a query without predicates is refused.
    pub fn to_delete_sql(&self) -> Option<(String, Vec<Value>)> {
        if self.filters.is_empty() {
            return None;
        }
        let mut params = Vec::new();
        let mut sql = format!("DELETE FROM {}", quote_ident(&self.table));
        sql.push_str(&self.where_clause(&mut params));
        Some((sql, params))
    }

    /// Render a `COUNT(*) AS cnt` query over the same predicates.
    /// Ordering and windowing are ignored.
    pub fn to_count_sql(&self) -> (String, Vec<Value>) {
        let mut params = Vec::new();
        let mut sql = format!("SELECT COUNT(*) AS cnt FROM {}", quote_ident(&self.table));
        sql.push_str(&self.where_clause(&mut params));
        (sql, params)
    }

    fn where_clause(&self, params: &mut Vec<Value>) -> String {
        if self.filters.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = self.filters.iter().map(|f| f.render(params)).collect();
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// Build a `%needle%` LIKE pattern, escaping LIKE metacharacters.
pub fn like_pattern(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len() + 2);
    out.push('%');
    for ch in needle.trim().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}

/// Quote a table or column name.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SQLStore, SqliteStore};

    fn seeded() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .exec_batch(
                r#"CREATE TABLE items (id TEXT PRIMARY KEY, title TEXT, tags TEXT, n INTEGER);
                   INSERT INTO items VALUES ('a', 'Sea at dawn', '["sea","morning"]', 1);
                   INSERT INTO items VALUES ('b', 'Forest 100% green', '["forest"]', 2);
                   INSERT INTO items VALUES ('c', 'Закат над морем', '["sea","закат"]', 3);
                   INSERT INTO items VALUES ('d', 'Untagged', NULL, 4);"#,
            )
            .unwrap();
        store
    }

    fn ids(store: &SqliteStore, select: &Select) -> Vec<String> {
        let (sql, params) = select.to_sql();
        store
            .query(&sql, &params)
            .unwrap()
            .iter()
            .filter_map(|r| r.get_str("id").map(String::from))
            .collect()
    }

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern(" 100% "), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
    }

    #[test]
    fn renders_numbered_params_in_order() {
        let (sql, params) = Select::from("items")
            .eq("id", "a")
            .is_in("n", vec![Value::Integer(1), Value::Integer(2)])
            .order_by("n", false)
            .range(10, 5)
            .to_sql();
        assert_eq!(
            sql,
            "SELECT * FROM \"items\" WHERE \"id\" = ?1 AND \"n\" IN (?2, ?3) \
             ORDER BY \"n\" DESC LIMIT ?4 OFFSET ?5"
        );
        assert_eq!(params.len(), 5);
        assert_eq!(params[3], Value::Integer(5));
        assert_eq!(params[4], Value::Integer(10));
    }

    #[test]
    fn contains_requires_every_value() {
        let store = seeded();
        let select = Select::from("items")
            .contains("tags", vec!["sea".into(), "закат".into()])
            .order_by("id", true);
        assert_eq!(ids(&store, &select), vec!["c"]);
    }

    #[test]
    fn overlaps_matches_any_value() {
        let store = seeded();
        let select = Select::from("items")
            .overlaps("tags", vec!["forest".into(), "morning".into()])
            .order_by("id", true);
        assert_eq!(ids(&store, &select), vec!["a", "b"]);

        let empty = Select::from("items").overlaps("tags", vec![]);
        assert!(ids(&store, &empty).is_empty());
    }

    #[test]
    fn ilike_is_case_insensitive_and_literal() {
        let store = seeded();
        let select = Select::from("items").ilike("title", "ЗАКАТ");
        assert_eq!(ids(&store, &select), vec!["c"]);

        // "100%" must not act as a wildcard.
        let select = Select::from("items").ilike("title", "0% g");
        assert_eq!(ids(&store, &select), vec!["b"]);
        let select = Select::from("items").ilike("title", "%");
        assert_eq!(ids(&store, &select), vec!["b"]);
    }

    #[test]
    fn or_group_and_window() {
        let store = seeded();
        let select = Select::from("items")
            .or(vec![
                Filter::ILike("title".into(), "untagged".into()),
                Filter::Contains("tags".into(), vec!["forest".into()]),
            ])
            .order_by("n", false);
        assert_eq!(ids(&store, &select), vec!["d", "b"]);

        let page = Select::from("items").order_by("n", true).range(1, 2);
        assert_eq!(ids(&store, &page), vec!["b", "c"]);
    }

    #[test]
    fn delete_requires_a_predicate() {
        let store = seeded();
        assert!(Select::from("items").to_delete_sql().is_none());

        let (sql, params) = Select::from("items").eq("id", "b").to_delete_sql().unwrap();
        assert_eq!(store.exec(&sql, &params).unwrap(), 1);
        assert_eq!(store.exec(&sql, &params).unwrap(), 0);
    }

    #[test]
    fn count_ignores_window() {
        let store = seeded();
        let (sql, params) = Select::from("items")
            .overlaps("tags", vec!["sea".into()])
            .range(0, 1)
            .to_count_sql();
        let rows = store.query(&sql, &params).unwrap();
        assert_eq!(rows[0].get_i64("cnt"), Some(2));
    }
}
