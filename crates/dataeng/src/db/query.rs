//! SQL builders for incremental extraction.
//!
//! Every identifier that reaches the generated SQL is quoted for the target
//! dialect; values are integers only, so no literal escaping is needed.

use crate::error::DatabaseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    MySql,
    MsSql,
}

impl SqlDialect {
    /// Quote a single identifier, doubling embedded closing quotes
    pub fn quote(&self, identifier: &str) -> String {
        match self {
            SqlDialect::MySql => format!("`{}`", identifier.replace('`', "``")),
            SqlDialect::MsSql => format!("[{}]", identifier.replace(']', "]]")),
        }
    }
}

/// Fully qualified source table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub database: String,
    /// Only used by SQL Server
    pub schema: Option<String>,
    pub table: String,
}

impl TableRef {
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            schema: None,
            table: table.into(),
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// `database.table` for MySQL, `database.schema.table` for SQL Server
    /// (schema defaults to `dbo`)
    pub fn qualified(&self, dialect: SqlDialect) -> String {
        match dialect {
            SqlDialect::MySql => format!(
                "{}.{}",
                dialect.quote(&self.database),
                dialect.quote(&self.table)
            ),
            SqlDialect::MsSql => format!(
                "{}.{}.{}",
                dialect.quote(&self.database),
                dialect.quote(self.schema.as_deref().unwrap_or("dbo")),
                dialect.quote(&self.table)
            ),
        }
    }

    /// Unquoted name for log lines and errors
    pub fn display_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}.{}", self.database, schema, self.table),
            None => format!("{}.{}", self.database, self.table),
        }
    }
}

fn column_list(dialect: SqlDialect, columns: &[&str]) -> String {
    if columns.is_empty() {
        return "*".to_string();
    }
    columns
        .iter()
        .map(|c| dialect.quote(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Rows whose `id_field` is greater than `last_known_value`, in id order
pub fn new_rows_sql(
    dialect: SqlDialect,
    table: &TableRef,
    columns: &[&str],
    id_field: &str,
    last_known_value: i64,
    limit: Option<u64>,
) -> String {
    let id = dialect.quote(id_field);
    let select = match (dialect, limit) {
        (SqlDialect::MsSql, Some(n)) => format!("SELECT TOP {} ", n),
        _ => "SELECT ".to_string(),
    };

    let mut sql = format!(
        "{}{} FROM {} WHERE {} > {} ORDER BY {}",
        select,
        column_list(dialect, columns),
        table.qualified(dialect),
        id,
        last_known_value,
        id
    );

    if let (SqlDialect::MySql, Some(n)) = (dialect, limit) {
        sql.push_str(&format!(" LIMIT {}", n));
    }

    sql
}

/// Rows whose `id_field` is one of `ids`
pub fn rows_with_ids_sql(
    dialect: SqlDialect,
    table: &TableRef,
    columns: &[&str],
    id_field: &str,
    ids: &[i64],
) -> Result<String, DatabaseError> {
    if ids.is_empty() {
        return Err(DatabaseError::InvalidQuery(format!(
            "no ids given for {}",
            table.display_name()
        )));
    }

    let ids = ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!(
        "SELECT {} FROM {} WHERE {} IN ({})",
        column_list(dialect, columns),
        table.qualified(dialect),
        dialect.quote(id_field),
        ids
    ))
}

/// Highest `id_field` value in the table
pub fn last_row_id_sql(dialect: SqlDialect, table: &TableRef, id_field: &str) -> String {
    format!(
        "SELECT MAX({}) FROM {}",
        dialect.quote(id_field),
        table.qualified(dialect)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifiers() {
        assert_eq!(SqlDialect::MySql.quote("id"), "`id`");
        assert_eq!(SqlDialect::MySql.quote("we`ird"), "`we``ird`");
        assert_eq!(SqlDialect::MsSql.quote("id"), "[id]");
        assert_eq!(SqlDialect::MsSql.quote("we]ird"), "[we]]ird]");
    }

    #[test]
    fn test_qualified_table() {
        let table = TableRef::new("shop", "orders");
        assert_eq!(table.qualified(SqlDialect::MySql), "`shop`.`orders`");
        assert_eq!(table.qualified(SqlDialect::MsSql), "[shop].[dbo].[orders]");

        let table = table.with_schema("sales");
        assert_eq!(
            table.qualified(SqlDialect::MsSql),
            "[shop].[sales].[orders]"
        );
        assert_eq!(table.display_name(), "shop.sales.orders");
    }

    #[test]
    fn test_new_rows_mysql() {
        let table = TableRef::new("shop", "orders");
        let sql = new_rows_sql(SqlDialect::MySql, &table, &["id", "total"], "id", 42, None);
        assert_eq!(
            sql,
            "SELECT `id`, `total` FROM `shop`.`orders` WHERE `id` > 42 ORDER BY `id`"
        );

        let sql = new_rows_sql(SqlDialect::MySql, &table, &["id"], "id", 0, Some(100));
        assert!(sql.ends_with("ORDER BY `id` LIMIT 100"));
    }

    #[test]
    fn test_new_rows_mssql_uses_top() {
        let table = TableRef::new("shop", "orders").with_schema("sales");
        let sql = new_rows_sql(SqlDialect::MsSql, &table, &["id"], "id", 7, Some(5));
        assert_eq!(
            sql,
            "SELECT TOP 5 [id] FROM [shop].[sales].[orders] WHERE [id] > 7 ORDER BY [id]"
        );
        assert!(!sql.contains("LIMIT"));
    }

    #[test]
    fn test_empty_columns_select_everything() {
        let table = TableRef::new("shop", "orders");
        let sql = last_row_id_sql(SqlDialect::MySql, &table, "id");
        assert_eq!(sql, "SELECT MAX(`id`) FROM `shop`.`orders`");

        let sql = new_rows_sql(SqlDialect::MySql, &table, &[], "id", 1, None);
        assert!(sql.starts_with("SELECT * FROM"));
    }

    #[test]
    fn test_rows_with_ids() {
        let table = TableRef::new("shop", "orders");
        let sql = rows_with_ids_sql(SqlDialect::MySql, &table, &["id"], "id", &[1, 2, 3]).unwrap();
        assert_eq!(
            sql,
            "SELECT `id` FROM `shop`.`orders` WHERE `id` IN (1, 2, 3)"
        );

        let result = rows_with_ids_sql(SqlDialect::MsSql, &table, &["id"], "id", &[]);
        assert!(matches!(result, Err(DatabaseError::InvalidQuery(_))));
    }
}
