//! SQLite backend for the connection layer.

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqliteRow};
use sqlx::{Column, Connection as _, Executor as _, Row as _, Sqlite, TypeInfo, ValueRef};

use crate::db::value::SQLITE_TIMESTAMP_FORMAT;
use crate::db::{Connection, Dialect, ExecResult, Row, Value};
use crate::error::DatabaseError;

type Query<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// A single connection to the embedded SQLite file.
pub struct SqliteConnection {
    conn: Option<sqlx::SqliteConnection>,
    in_transaction: bool,
}

impl SqliteConnection {
    /// Open (creating if missing) the database file at `path`.
    pub async fn open(path: &Path) -> Result<Self, DatabaseError> {
        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let conn = sqlx::SqliteConnection::connect_with(&opts)
            .await
            .map_err(|e| DatabaseError::Connection(format!("{}: {}", path.display(), e)))?;

        Ok(Self {
            conn: Some(conn),
            in_transaction: false,
        })
    }

    fn raw(&mut self) -> Result<&mut sqlx::SqliteConnection, DatabaseError> {
        self.conn
            .as_mut()
            .ok_or_else(|| DatabaseError::Connection("connection already closed".to_string()))
    }

    async fn begin_if_needed(&mut self) -> Result<(), DatabaseError> {
        if !self.in_transaction {
            self.raw()?.execute(sqlx::raw_sql("BEGIN")).await?;
            self.in_transaction = true;
        }
        Ok(())
    }
}

fn bind_all<'q>(sql: &'q str, params: &'q [Value]) -> Query<'q> {
    let mut query = sqlx::query(sql);
    for param in params {
        query = match param {
            Value::Null => query.bind(None::<String>),
            Value::Integer(v) => query.bind(*v),
            Value::Real(v) => query.bind(*v),
            Value::Text(s) => query.bind(s.as_str()),
            Value::Timestamp(ts) => query.bind(ts.format(SQLITE_TIMESTAMP_FORMAT).to_string()),
        };
    }
    query
}

fn decode_row(row: &SqliteRow) -> Result<Row, DatabaseError> {
    let mut out = Row::new();
    for (idx, column) in row.columns().iter().enumerate() {
        // Storage class of this particular value; SQLite is dynamically typed.
        let storage = {
            let raw = row.try_get_raw(idx)?;
            if raw.is_null() {
                None
            } else {
                Some(raw.type_info().name().to_string())
            }
        };

        let value = match storage.as_deref() {
            None => Value::Null,
            Some("INTEGER") | Some("BOOLEAN") => Value::Integer(row.try_get::<i64, _>(idx)?),
            Some("REAL") | Some("NUMERIC") => Value::Real(row.try_get::<f64, _>(idx)?),
            Some("TEXT") | Some("DATETIME") | Some("DATE") | Some("TIME") => {
                Value::Text(row.try_get::<String, _>(idx)?)
            }
            Some(other) => {
                return Err(DatabaseError::Serialization(format!(
                    "column '{}': unsupported SQLite storage class {}",
                    column.name(),
                    other
                )));
            }
        };
        out.push(column.name(), value);
    }
    Ok(out)
}

fn log_failure(sql: &str, e: &sqlx::Error) {
    tracing::error!(backend = "sqlite", sql = %sql, error = %e, "Statement failed");
}

#[async_trait]
impl Connection for SqliteConnection {
    fn dialect(&self) -> &'static Dialect {
        &Dialect::SQLITE
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<ExecResult, DatabaseError> {
        self.begin_if_needed().await?;
        tracing::debug!(backend = "sqlite", sql = %sql, params = params.len(), "execute");

        let result = self
            .raw()?
            .execute(bind_all(sql, params))
            .await
            .inspect_err(|e| log_failure(sql, e))?;

        Ok(ExecResult {
            rows_affected: result.rows_affected(),
            last_insert_id: Some(result.last_insert_rowid()),
        })
    }

    async fn fetch_optional(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> Result<Option<Row>, DatabaseError> {
        self.begin_if_needed().await?;
        tracing::debug!(backend = "sqlite", sql = %sql, params = params.len(), "fetch_optional");

        let row = self
            .raw()?
            .fetch_optional(bind_all(sql, params))
            .await
            .inspect_err(|e| log_failure(sql, e))?;

        row.as_ref().map(decode_row).transpose()
    }

    async fn fetch_all(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DatabaseError> {
        self.begin_if_needed().await?;
        tracing::debug!(backend = "sqlite", sql = %sql, params = params.len(), "fetch_all");

        let rows = self
            .raw()?
            .fetch_all(bind_all(sql, params))
            .await
            .inspect_err(|e| log_failure(sql, e))?;

        rows.iter().map(decode_row).collect()
    }

    async fn commit(&mut self) -> Result<(), DatabaseError> {
        if self.in_transaction {
            self.raw()?.execute(sqlx::raw_sql("COMMIT")).await?;
            self.in_transaction = false;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DatabaseError> {
        let Some(mut conn) = self.conn.take() else {
            return Ok(());
        };
        if self.in_transaction {
            self.in_transaction = false;
            if let Err(e) = conn.execute(sqlx::raw_sql("ROLLBACK")).await {
                tracing::warn!(error = %e, "Rollback on close failed");
            }
        }
        conn.close().await?;
        Ok(())
    }
}
