//! Incremental extraction from relational sources
//!
//! Both sources return rows as JSON objects keyed by column name and read
//! from an ever-increasing integer id column:
//!
//! ```rust,ignore
//! let mut source = MySqlSource::connect(&url, RetryConfig::connection()).await?;
//! let table = TableRef::new("shop", "orders");
//! let last = source.get_last_row_id(&table, "id").await?;
//! let rows = source.get_new_rows(&table, &["id", "total"], "id", 0, Some(1000)).await?;
//! ```

pub mod mssql;
pub mod mysql;
pub mod query;

pub use mssql::MsSqlSource;
pub use mysql::MySqlSource;
pub use query::{SqlDialect, TableRef};
