//! SQL Server source over the native TDS protocol (tiberius)

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use tiberius::{Client, ColumnData, Config, FromSql, Row};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use super::query::{SqlDialect, TableRef, last_row_id_sql, new_rows_sql, rows_with_ids_sql};
use crate::error::DatabaseError;
use crate::utils::retry::{RetryConfig, RetryExecutor};

const DIALECT: SqlDialect = SqlDialect::MsSql;

pub struct MsSqlSource {
    client: Client<Compat<TcpStream>>,
}

impl MsSqlSource {
    /// Connect with an ADO.NET connection string
    /// (`server=tcp:host,1433;user=sa;password=...;TrustServerCertificate=true`)
    pub async fn connect(connection_string: &str, retry: RetryConfig) -> crate::Result<Self> {
        let config = Config::from_ado_string(connection_string).map_err(|e| {
            DatabaseError::Connection {
                attempts: 0,
                message: e.to_string(),
            }
        })?;

        let attempts = AtomicU32::new(0);
        let executor = RetryExecutor::new(retry);

        let client = executor
            .execute_when(
                || {
                    let config = config.clone();
                    let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if attempt > 0 {
                            log::warn!("Retrying to connect to server attempt {}", attempt);
                        }
                        open_client(config).await
                    }
                },
                |_: &tiberius::error::Error| true,
            )
            .await
            .map_err(|e| {
                log::error!("{}", e);
                DatabaseError::Connection {
                    attempts: attempts.load(Ordering::SeqCst),
                    message: e.to_string(),
                }
            })?;

        log::debug!("Connected to SQL Server");
        Ok(Self { client })
    }

    pub async fn close(self) -> crate::Result<()> {
        self.client.close().await.map_err(|e| DatabaseError::Query {
            table: "<connection>".to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Rows newer than `last_known_value`, ordered by `id_field`
    pub async fn get_new_rows(
        &mut self,
        table: &TableRef,
        columns: &[&str],
        id_field: &str,
        last_known_value: i64,
        limit: Option<u64>,
    ) -> crate::Result<Vec<Value>> {
        let sql = new_rows_sql(DIALECT, table, columns, id_field, last_known_value, limit);
        self.fetch_all(table, &sql).await.inspect_err(|e| {
            log::error!(
                "Unable to get new rows from {} - {}",
                table.display_name(),
                e
            )
        })
    }

    pub async fn get_rows_with_ids(
        &mut self,
        table: &TableRef,
        columns: &[&str],
        id_field: &str,
        ids: &[i64],
    ) -> crate::Result<Vec<Value>> {
        let sql = rows_with_ids_sql(DIALECT, table, columns, id_field, ids)?;
        self.fetch_all(table, &sql).await.inspect_err(|e| {
            log::error!(
                "Unable to get rows with IDs from {} - {}",
                table.display_name(),
                e
            )
        })
    }

    /// `MAX(id_field)`, `None` for an empty table
    pub async fn get_last_row_id(
        &mut self,
        table: &TableRef,
        id_field: &str,
    ) -> crate::Result<Option<i64>> {
        let sql = last_row_id_sql(DIALECT, table, id_field);
        log::debug!("{}", sql);

        let row = self
            .client
            .simple_query(sql)
            .await
            .map_err(|e| query_error(table, e))?
            .into_row()
            .await
            .map_err(|e| query_error(table, e))?;

        let cell = row.as_ref().and_then(|row| row.cells().next()).map(|(_, data)| data);
        Ok(last_row_id(table, id_field, cell)?)
    }

    async fn fetch_all(&mut self, table: &TableRef, sql: &str) -> crate::Result<Vec<Value>> {
        log::debug!("{}", sql);
        let rows = self
            .client
            .simple_query(sql)
            .await
            .map_err(|e| query_error(table, e))?
            .into_first_result()
            .await
            .map_err(|e| query_error(table, e))?;

        Ok(rows.iter().map(row_to_json).collect())
    }
}

async fn open_client(config: Config) -> tiberius::Result<Client<Compat<TcpStream>>> {
    let tcp = TcpStream::connect(config.get_addr()).await?;
    tcp.set_nodelay(true)?;
    Client::connect(config, tcp.compat_write()).await
}

fn query_error(table: &TableRef, error: tiberius::error::Error) -> DatabaseError {
    DatabaseError::Query {
        table: table.display_name(),
        message: error.to_string(),
    }
}

/// Integer id from the first cell; NULL or no row means an empty table
fn last_row_id(
    table: &TableRef,
    id_field: &str,
    cell: Option<&ColumnData<'static>>,
) -> Result<Option<i64>, DatabaseError> {
    match cell.map(cell_to_json) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_i64().map(Some).ok_or_else(|| DatabaseError::Query {
            table: table.display_name(),
            message: format!("{} value {} is not a 64-bit integer", id_field, value),
        }),
    }
}

/// Column name to value object
pub fn row_to_json(row: &Row) -> Value {
    let object: Map<String, Value> = row
        .cells()
        .map(|(column, data)| (column.name().to_string(), cell_to_json(data)))
        .collect();
    Value::Object(object)
}

fn from_sql<'a, T: FromSql<'a>>(data: &'a ColumnData<'static>) -> Option<T> {
    T::from_sql(data).ok().flatten()
}

/// Render a single TDS value as JSON; temporal values become ISO 8601 strings
pub fn cell_to_json(data: &ColumnData<'static>) -> Value {
    match data {
        ColumnData::U8(v) => v.map(Value::from).unwrap_or(Value::Null),
        ColumnData::I16(v) => v.map(Value::from).unwrap_or(Value::Null),
        ColumnData::I32(v) => v.map(Value::from).unwrap_or(Value::Null),
        ColumnData::I64(v) => v.map(Value::from).unwrap_or(Value::Null),
        ColumnData::F32(v) => v.map(Value::from).unwrap_or(Value::Null),
        ColumnData::F64(v) => v.map(Value::from).unwrap_or(Value::Null),
        ColumnData::Bit(v) => v.map(Value::from).unwrap_or(Value::Null),
        ColumnData::String(v) => v
            .as_ref()
            .map(|s| Value::from(s.as_ref()))
            .unwrap_or(Value::Null),
        ColumnData::Guid(v) => v
            .map(|g| Value::from(g.to_string()))
            .unwrap_or(Value::Null),
        ColumnData::Binary(v) => v
            .as_ref()
            .map(|b| Value::from(b.to_vec()))
            .unwrap_or(Value::Null),
        ColumnData::Numeric(v) => match v {
            Some(n) if n.scale() == 0 => i64::try_from(n.value())
                .map(Value::from)
                .unwrap_or_else(|_| Value::from(n.to_string())),
            Some(n) => Value::from(n.to_string()),
            None => Value::Null,
        },
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            from_sql::<NaiveDateTime>(data)
                .map(|v| Value::from(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string()))
                .unwrap_or(Value::Null)
        }
        ColumnData::Date(_) => from_sql::<NaiveDate>(data)
            .map(|v| Value::from(v.to_string()))
            .unwrap_or(Value::Null),
        ColumnData::Time(_) => from_sql::<NaiveTime>(data)
            .map(|v| Value::from(v.to_string()))
            .unwrap_or(Value::Null),
        ColumnData::DateTimeOffset(_) => from_sql::<DateTime<FixedOffset>>(data)
            .map(|v| Value::from(v.to_rfc3339()))
            .unwrap_or(Value::Null),
        ColumnData::Xml(v) => v
            .as_ref()
            .map(|xml| Value::from(xml.clone().into_owned().into_string()))
            .unwrap_or(Value::Null),
    }
}
