pub mod error;
pub mod query;
pub mod sqlite;
pub mod traits;

pub use error::SQLError;
pub use query::{Filter, Select, like_pattern, quote_ident};
pub use sqlite::SqliteStore;
pub use traits::{Row, SQLStore, Value};
