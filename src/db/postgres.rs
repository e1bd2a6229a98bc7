//! PostgreSQL backend for the connection layer.

use std::error::Error as StdError;

use async_trait::async_trait;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use tokio::task::JoinHandle;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};
use tokio_postgres::{Client, NoTls};

use crate::db::{Connection, Dialect, ExecResult, Row, Value};
use crate::error::DatabaseError;

/// A single client connection to PostgreSQL.
pub struct PostgresConnection {
    client: Option<Client>,
    driver: Option<JoinHandle<()>>,
    in_transaction: bool,
}

impl PostgresConnection {
    /// Connect to the server at `url`.
    pub async fn connect(url: &SecretString) -> Result<Self, DatabaseError> {
        let (client, connection) = tokio_postgres::connect(url.expose_secret(), NoTls)
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "PostgreSQL connection error");
            }
        });

        Ok(Self {
            client: Some(client),
            driver: Some(driver),
            in_transaction: false,
        })
    }

    fn client(&self) -> Result<&Client, DatabaseError> {
        self.client
            .as_ref()
            .ok_or_else(|| DatabaseError::Connection("connection already closed".to_string()))
    }

    async fn begin_if_needed(&mut self) -> Result<(), DatabaseError> {
        if !self.in_transaction {
            self.client()?.batch_execute("BEGIN").await?;
            self.in_transaction = true;
        }
        Ok(())
    }

    fn prepare_sql(&self, sql: &str) -> String {
        self.dialect().rewrite_placeholders(sql)
    }
}

fn as_params(params: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

fn log_failure(sql: &str, e: &tokio_postgres::Error) {
    tracing::error!(backend = "postgres", sql = %sql, error = %e, "Statement failed");
}

fn decode_row(row: &tokio_postgres::Row) -> Result<Row, DatabaseError> {
    let mut out = Row::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let ty = column.type_();
        let value = if *ty == Type::INT8 {
            row.try_get::<_, Option<i64>>(idx)?.map(Value::Integer)
        } else if *ty == Type::INT4 {
            row.try_get::<_, Option<i32>>(idx)?
                .map(|v| Value::Integer(i64::from(v)))
        } else if *ty == Type::INT2 {
            row.try_get::<_, Option<i16>>(idx)?
                .map(|v| Value::Integer(i64::from(v)))
        } else if *ty == Type::BOOL {
            row.try_get::<_, Option<bool>>(idx)?
                .map(|v| Value::Integer(i64::from(v)))
        } else if *ty == Type::FLOAT8 {
            row.try_get::<_, Option<f64>>(idx)?.map(Value::Real)
        } else if *ty == Type::FLOAT4 {
            row.try_get::<_, Option<f32>>(idx)?
                .map(|v| Value::Real(f64::from(v)))
        } else if *ty == Type::TEXT
            || *ty == Type::VARCHAR
            || *ty == Type::BPCHAR
            || *ty == Type::NAME
        {
            row.try_get::<_, Option<String>>(idx)?.map(Value::Text)
        } else if *ty == Type::TIMESTAMP {
            row.try_get::<_, Option<NaiveDateTime>>(idx)?
                .map(Value::Timestamp)
        } else if *ty == Type::TIMESTAMPTZ {
            row.try_get::<_, Option<DateTime<Utc>>>(idx)?
                .map(|v| Value::Timestamp(v.naive_utc()))
        } else if *ty == Type::DATE {
            row.try_get::<_, Option<NaiveDate>>(idx)?
                .map(|v| Value::Text(v.to_string()))
        } else {
            return Err(DatabaseError::Serialization(format!(
                "column '{}': unsupported PostgreSQL type {}",
                column.name(),
                ty
            )));
        };
        out.push(column.name(), value.unwrap_or(Value::Null));
    }
    Ok(out)
}

#[async_trait]
impl Connection for PostgresConnection {
    fn dialect(&self) -> &'static Dialect {
        &Dialect::POSTGRES
    }

    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<ExecResult, DatabaseError> {
        self.begin_if_needed().await?;
        let pg_sql = self.prepare_sql(sql);
        tracing::debug!(backend = "postgres", sql = %pg_sql, params = params.len(), "execute");

        let rows_affected = self
            .client()?
            .execute(pg_sql.as_str(), &as_params(params))
            .await
            .inspect_err(|e| log_failure(&pg_sql, e))?;

        Ok(ExecResult {
            rows_affected,
            last_insert_id: None,
        })
    }

    async fn fetch_optional(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> Result<Option<Row>, DatabaseError> {
        self.begin_if_needed().await?;
        let pg_sql = self.prepare_sql(sql);
        tracing::debug!(backend = "postgres", sql = %pg_sql, params = params.len(), "fetch_optional");

        // query_opt errors on more than one row; the first row is what callers want.
        let rows = self
            .client()?
            .query(pg_sql.as_str(), &as_params(params))
            .await
            .inspect_err(|e| log_failure(&pg_sql, e))?;

        rows.first().map(decode_row).transpose()
    }

    async fn fetch_all(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DatabaseError> {
        self.begin_if_needed().await?;
        let pg_sql = self.prepare_sql(sql);
        tracing::debug!(backend = "postgres", sql = %pg_sql, params = params.len(), "fetch_all");

        let rows = self
            .client()?
            .query(pg_sql.as_str(), &as_params(params))
            .await
            .inspect_err(|e| log_failure(&pg_sql, e))?;

        rows.iter().map(decode_row).collect()
    }

    async fn commit(&mut self) -> Result<(), DatabaseError> {
        if self.in_transaction {
            self.client()?.batch_execute("COMMIT").await?;
            self.in_transaction = false;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DatabaseError> {
        let Some(client) = self.client.take() else {
            return Ok(());
        };
        if self.in_transaction {
            self.in_transaction = false;
            if let Err(e) = client.batch_execute("ROLLBACK").await {
                tracing::warn!(error = %e, "Rollback on close failed");
            }
        }
        // Dropping the client ends the connection task.
        drop(client);
        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.await {
                tracing::warn!(error = %e, "PostgreSQL connection task did not shut down cleanly");
            }
        }
        Ok(())
    }
}

impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Integer(v) => {
                if *ty == Type::INT2 {
                    i16::try_from(*v)?.to_sql(ty, out)
                } else if *ty == Type::INT4 {
                    i32::try_from(*v)?.to_sql(ty, out)
                } else if *ty == Type::FLOAT4 {
                    (*v as f32).to_sql(ty, out)
                } else if *ty == Type::FLOAT8 {
                    (*v as f64).to_sql(ty, out)
                } else if *ty == Type::BOOL {
                    (*v != 0).to_sql(ty, out)
                } else if *ty == Type::TEXT || *ty == Type::VARCHAR {
                    v.to_string().to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            Value::Real(v) => {
                if *ty == Type::FLOAT4 {
                    (*v as f32).to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            Value::Text(s) => s.to_sql(ty, out),
            Value::Timestamp(ts) => {
                if *ty == Type::TIMESTAMPTZ {
                    ts.and_utc().to_sql(ty, out)
                } else {
                    ts.to_sql(ty, out)
                }
            }
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_narrows_to_int4() {
        let mut buf = BytesMut::new();
        let is_null = Value::Integer(5).to_sql(&Type::INT4, &mut buf).unwrap();
        assert!(matches!(is_null, IsNull::No));
        assert_eq!(buf.len(), 4);
    }

    #[test]
    fn test_integer_out_of_range_for_int2() {
        let mut buf = BytesMut::new();
        assert!(Value::Integer(100_000).to_sql(&Type::INT2, &mut buf).is_err());
    }

    #[test]
    fn test_real_narrows_to_float4() {
        let mut buf = BytesMut::new();
        Value::Real(50.5).to_sql(&Type::FLOAT4, &mut buf).unwrap();
        assert_eq!(buf.len(), 4);
    }

    #[test]
    fn test_null_encodes_as_null() {
        let mut buf = BytesMut::new();
        let is_null = Value::Null.to_sql(&Type::TEXT, &mut buf).unwrap();
        assert!(matches!(is_null, IsNull::Yes));
        assert!(buf.is_empty());
    }
}
