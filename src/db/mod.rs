//! Database connection layer.
//!
//! One [`Connection`] trait with two implementations (SQLite via sqlx,
//! PostgreSQL via tokio-postgres). [`ConnectionFactory`] picks the
//! implementation once from config and hands out a fresh connection per call.

mod dialect;
mod postgres;
mod sqlite;
mod value;

use std::path::PathBuf;

use async_trait::async_trait;
use secrecy::SecretString;

pub use dialect::{Dialect, PlaceholderStyle, number_placeholders};
pub use postgres::PostgresConnection;
pub use sqlite::SqliteConnection;
pub use value::{Row, Value};

use crate::config::{DatabaseConfig, DbKind};
use crate::error::DatabaseError;

/// Outcome of a non-query statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Identity of the last inserted row. Only SQLite reports it; PostgreSQL
    /// callers must use `RETURNING` instead.
    pub last_insert_id: Option<i64>,
}

/// A single open connection to one backend.
///
/// Statements use `?` placeholders regardless of backend. The first statement
/// opens a transaction; [`Connection::commit`] makes the work durable and a
/// connection closed or dropped without committing rolls it back.
#[async_trait]
pub trait Connection: Send {
    fn dialect(&self) -> &'static Dialect;

    async fn execute(&mut self, sql: &str, params: &[Value]) -> Result<ExecResult, DatabaseError>;

    async fn fetch_optional(
        &mut self,
        sql: &str,
        params: &[Value],
    ) -> Result<Option<Row>, DatabaseError>;

    async fn fetch_all(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Row>, DatabaseError>;

    async fn fetch_one(&mut self, sql: &str, params: &[Value]) -> Result<Row, DatabaseError> {
        self.fetch_optional(sql, params)
            .await?
            .ok_or_else(|| DatabaseError::Query(format!("statement returned no rows: {sql}")))
    }

    async fn commit(&mut self) -> Result<(), DatabaseError>;

    /// Release the connection. Uncommitted work is rolled back.
    async fn close(&mut self) -> Result<(), DatabaseError>;
}

/// Chooses a backend once and opens connections to it.
#[derive(Debug, Clone)]
pub enum ConnectionFactory {
    Postgres { url: SecretString },
    Sqlite { path: PathBuf },
}

impl ConnectionFactory {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        match (config.kind(), &config.url) {
            (DbKind::Postgres, Some(url)) => ConnectionFactory::Postgres { url: url.clone() },
            _ => ConnectionFactory::Sqlite {
                path: config.sqlite_path().to_path_buf(),
            },
        }
    }

    pub fn kind(&self) -> DbKind {
        match self {
            ConnectionFactory::Postgres { .. } => DbKind::Postgres,
            ConnectionFactory::Sqlite { .. } => DbKind::Sqlite,
        }
    }

    pub fn dialect(&self) -> &'static Dialect {
        match self {
            ConnectionFactory::Postgres { .. } => &Dialect::POSTGRES,
            ConnectionFactory::Sqlite { .. } => &Dialect::SQLITE,
        }
    }

    /// Open a fresh connection. The caller owns it and must close it.
    pub async fn connect(&self) -> Result<Box<dyn Connection>, DatabaseError> {
        match self {
            ConnectionFactory::Postgres { url } => {
                Ok(Box::new(PostgresConnection::connect(url).await?))
            }
            ConnectionFactory::Sqlite { path } => {
                Ok(Box::new(SqliteConnection::open(path).await?))
            }
        }
    }
}

/// Close `conn` and hand back `result`. A close failure never changes the
/// outcome: any commit has already happened, so it is only logged.
pub async fn release<T>(
    mut conn: Box<dyn Connection>,
    result: Result<T, DatabaseError>,
) -> Result<T, DatabaseError> {
    if let Err(close_err) = conn.close().await {
        match &result {
            Ok(_) => tracing::warn!(error = %close_err, "failed to close connection after success"),
            Err(_) => tracing::warn!(error = %close_err, "failed to close connection after error"),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_follows_config() {
        let sqlite = ConnectionFactory::from_config(&DatabaseConfig::for_test("/tmp/a.db"));
        assert_eq!(sqlite.kind(), DbKind::Sqlite);
        assert_eq!(sqlite.dialect().name, "sqlite");

        let pg = ConnectionFactory::from_config(&DatabaseConfig::for_test(
            "postgres://localhost/citizen",
        ));
        assert_eq!(pg.kind(), DbKind::Postgres);
        assert_eq!(pg.dialect().placeholder, PlaceholderStyle::Numbered);
    }

    /// Accepts everything but fails to close.
    struct FailingClose;

    #[async_trait]
    impl Connection for FailingClose {
        fn dialect(&self) -> &'static Dialect {
            &Dialect::SQLITE
        }

        async fn execute(&mut self, _: &str, _: &[Value]) -> Result<ExecResult, DatabaseError> {
            Ok(ExecResult::default())
        }

        async fn fetch_optional(&mut self, _: &str, _: &[Value]) -> Result<Option<Row>, DatabaseError> {
            Ok(None)
        }

        async fn fetch_all(&mut self, _: &str, _: &[Value]) -> Result<Vec<Row>, DatabaseError> {
            Ok(Vec::new())
        }

        async fn commit(&mut self) -> Result<(), DatabaseError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), DatabaseError> {
            Err(DatabaseError::Connection("socket already gone".to_string()))
        }
    }

    #[tokio::test]
    async fn test_release_keeps_success_when_close_fails() {
        let mut conn = FailingClose;
        conn.commit().await.unwrap();
        let result = release(Box::new(conn), Ok(7)).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_release_keeps_original_error_when_close_fails() {
        let conn = FailingClose;
        let result: Result<i64, _> =
            release(Box::new(conn), Err(DatabaseError::InvalidInput("bad".to_string()))).await;
        assert!(matches!(result, Err(DatabaseError::InvalidInput(_))));
    }
}
