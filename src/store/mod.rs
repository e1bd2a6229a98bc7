//! Persistence and analytics for representatives, chats, sessions and events.
//!
//! [`Store`] is the public entry point. Each operation opens its own
//! connection, runs, commits when it writes, and closes the connection before
//! returning. Nothing is cached between calls.

pub mod analytics;
pub mod chats;
pub mod migrations;
pub mod models;
pub mod representatives;
pub mod seed;
pub mod sessions;

pub use analytics::Aggregator;
pub use models::{
    AdvancedStats, ChatExample, ChatInteraction, DailyStats, EventCount, HourCount,
    LocationCount, MigrationReport, NewRepresentative, NewSession, NewsItem, Representative,
    Session, StatsReport,
};

use crate::config::{DatabaseConfig, DbKind};
use crate::db::{self, Connection, ConnectionFactory, Dialect};
use crate::error::DatabaseError;

/// Commit `conn` when `result` succeeded. A failed result is returned as is
/// and the transaction is left for `close` to roll back.
async fn committed<T>(
    conn: &mut dyn Connection,
    result: Result<T, DatabaseError>,
) -> Result<T, DatabaseError> {
    let value = result?;
    conn.commit().await?;
    Ok(value)
}

/// Database store (PostgreSQL or SQLite, chosen once from config).
#[derive(Debug, Clone)]
pub struct Store {
    factory: ConnectionFactory,
    aggregator: Aggregator,
}

impl Store {
    /// Create a store from config. No connection is opened until the first
    /// operation.
    pub fn new(config: &DatabaseConfig) -> Self {
        let factory = ConnectionFactory::from_config(config);
        let aggregator = Aggregator::new(factory.dialect());
        Self {
            factory,
            aggregator,
        }
    }

    pub fn kind(&self) -> DbKind {
        self.factory.kind()
    }

    pub fn dialect(&self) -> &'static Dialect {
        self.factory.dialect()
    }

    /// Open a raw connection to the configured backend. The caller must
    /// `close` it.
    pub async fn connect(&self) -> Result<Box<dyn Connection>, DatabaseError> {
        self.factory.connect().await
    }

    // ==================== Migrations ====================

    /// Apply pending schema migrations, then reconcile the reference
    /// representatives. Safe to run on every start.
    pub async fn run_migrations(&self) -> Result<MigrationReport, DatabaseError> {
        let mut conn = self.connect().await?;
        let result = Self::migrate(conn.as_mut()).await;
        let result = committed(conn.as_mut(), result).await;
        let report = db::release(conn, result).await?;

        tracing::info!(
            backend = self.dialect().name,
            applied = report.applied.len(),
            seeded = report.seeded,
            removed = report.removed,
            enriched = report.enriched,
            inserted = report.inserted,
            "Database migrated"
        );
        Ok(report)
    }

    async fn migrate(conn: &mut dyn Connection) -> Result<MigrationReport, DatabaseError> {
        let applied = migrations::run(conn).await?;
        let outcome = seed::reconcile(conn).await?;
        Ok(MigrationReport {
            applied,
            seeded: outcome.seeded,
            removed: outcome.removed,
            enriched: outcome.enriched,
            inserted: outcome.inserted,
        })
    }

    // ==================== Sessions & events ====================

    /// Register a session. A token that already exists is left untouched.
    /// Returns whether a new row was created.
    pub async fn create_session(&self, session: &NewSession<'_>) -> Result<bool, DatabaseError> {
        let mut conn = self.connect().await?;
        let result = sessions::create(conn.as_mut(), session).await;
        let result = committed(conn.as_mut(), result).await;
        db::release(conn, result).await
    }

    /// Refresh a session's heartbeat and duration. Returns `false` for an
    /// unknown token.
    pub async fn update_heartbeat(&self, session_id: &str) -> Result<bool, DatabaseError> {
        let mut conn = self.connect().await?;
        let result = sessions::heartbeat(conn.as_mut(), session_id).await;
        let result = committed(conn.as_mut(), result).await;
        db::release(conn, result).await
    }

    /// Create the session if needed, then record a heartbeat for it.
    pub async fn record_heartbeat(&self, session: &NewSession<'_>) -> Result<bool, DatabaseError> {
        let mut conn = self.connect().await?;
        let result = match sessions::create(conn.as_mut(), session).await {
            Ok(_) => sessions::heartbeat(conn.as_mut(), session.session_id).await,
            Err(e) => Err(e),
        };
        let result = committed(conn.as_mut(), result).await;
        db::release(conn, result).await
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Option<Session>, DatabaseError> {
        let mut conn = self.connect().await?;
        let result = sessions::get(conn.as_mut(), session_id).await;
        db::release(conn, result).await
    }

    /// Append an analytics event and return its id.
    pub async fn log_event(
        &self,
        session_id: &str,
        event_type: &str,
        details: &str,
    ) -> Result<i64, DatabaseError> {
        let mut conn = self.connect().await?;
        let result = sessions::log_event(conn.as_mut(), session_id, event_type, details).await;
        let result = committed(conn.as_mut(), result).await;
        db::release(conn, result).await
    }

    // ==================== Analytics ====================

    pub async fn daily_stats(&self) -> Result<DailyStats, DatabaseError> {
        let mut conn = self.connect().await?;
        let result = self.aggregator.daily_stats(conn.as_mut()).await;
        db::release(conn, result).await
    }

    pub async fn advanced_stats(&self) -> Result<AdvancedStats, DatabaseError> {
        let mut conn = self.connect().await?;
        let result = self.aggregator.advanced_stats(conn.as_mut()).await;
        db::release(conn, result).await
    }

    /// Everything the admin dashboard shows, read over one connection.
    pub async fn stats_report(&self) -> Result<StatsReport, DatabaseError> {
        let mut conn = self.connect().await?;
        let result = self.aggregator.stats_report(conn.as_mut()).await;
        db::release(conn, result).await
    }

    // ==================== Representatives ====================

    pub async fn get_all_representatives(&self) -> Result<Vec<Representative>, DatabaseError> {
        let mut conn = self.connect().await?;
        let result = representatives::get_all(conn.as_mut()).await;
        db::release(conn, result).await
    }

    pub async fn get_representative_by_location(
        &self,
        constituency: &str,
    ) -> Result<Vec<Representative>, DatabaseError> {
        let mut conn = self.connect().await?;
        let result = representatives::get_by_location(conn.as_mut(), constituency).await;
        db::release(conn, result).await
    }

    pub async fn search_representatives(
        &self,
        term: &str,
    ) -> Result<Vec<Representative>, DatabaseError> {
        let mut conn = self.connect().await?;
        let result = representatives::search(conn.as_mut(), term).await;
        db::release(conn, result).await
    }

    /// Insert representatives not already present (same name and
    /// constituency). All or nothing; returns the number inserted.
    pub async fn ingest_representatives(
        &self,
        reps: &[NewRepresentative],
    ) -> Result<usize, DatabaseError> {
        let mut conn = self.connect().await?;
        let result = representatives::ingest(conn.as_mut(), reps).await;
        let result = committed(conn.as_mut(), result).await;
        db::release(conn, result).await
    }

    // ==================== Chats ====================

    pub async fn save_chat_interaction(
        &self,
        user_query: &str,
        ai_response: &str,
    ) -> Result<i64, DatabaseError> {
        let mut conn = self.connect().await?;
        let result = chats::save(conn.as_mut(), user_query, ai_response).await;
        let result = committed(conn.as_mut(), result).await;
        db::release(conn, result).await
    }

    /// Rate a chat 1 to 5. Returns `false` when the chat does not exist.
    pub async fn update_chat_rating(&self, id: i64, rating: i64) -> Result<bool, DatabaseError> {
        let mut conn = self.connect().await?;
        let result = chats::rate(conn.as_mut(), id, rating).await;
        let result = committed(conn.as_mut(), result).await;
        db::release(conn, result).await
    }

    pub async fn get_recent_chats(&self, limit: i64) -> Result<Vec<ChatInteraction>, DatabaseError> {
        let mut conn = self.connect().await?;
        let result = chats::recent(conn.as_mut(), limit).await;
        db::release(conn, result).await
    }

    /// Up to five 5-star exchanges, newest first.
    pub async fn get_high_quality_chats(&self) -> Result<Vec<ChatExample>, DatabaseError> {
        let mut conn = self.connect().await?;
        let result = chats::high_quality(conn.as_mut()).await;
        db::release(conn, result).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_picks_backend_without_connecting() {
        let store = Store::new(&DatabaseConfig::for_test("/nonexistent/dir/test.db"));
        assert_eq!(store.kind(), DbKind::Sqlite);
        assert_eq!(store.dialect().name, "sqlite");
    }

    #[test]
    fn test_store_is_shareable() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<Store>();
    }
}
