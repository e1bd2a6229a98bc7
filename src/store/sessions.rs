//! Visitor sessions and the analytics event log.

use crate::db::{Connection, Value};
use crate::error::DatabaseError;
use crate::store::models::{NewSession, Session};

/// Insert the session unless its token is already known. The start time of an
/// existing session is never touched. Returns whether a row was inserted.
pub async fn create(conn: &mut dyn Connection, session: &NewSession<'_>) -> Result<bool, DatabaseError> {
    if session.session_id.is_empty() {
        return Err(DatabaseError::InvalidInput(
            "session token must not be empty".to_string(),
        ));
    }

    let result = conn
        .execute(
            "INSERT INTO user_sessions \
             (session_id, ip_address, user_agent, location, latitude, longitude) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT (session_id) DO NOTHING",
            &[
                Value::from(session.session_id),
                Value::from(session.ip_address),
                Value::from(session.user_agent),
                Value::from(session.location),
                Value::from(session.latitude),
                Value::from(session.longitude),
            ],
        )
        .await?;
    Ok(result.rows_affected > 0)
}

/// Stamp the heartbeat and recompute the duration from the start time.
/// Returns `false` for an unknown token.
pub async fn heartbeat(conn: &mut dyn Connection, session_id: &str) -> Result<bool, DatabaseError> {
    let dialect = conn.dialect();
    let sql = format!(
        "UPDATE user_sessions SET last_heartbeat = {now}, duration_seconds = {elapsed} \
         WHERE session_id = ?",
        now = dialect.now,
        elapsed = dialect.elapsed_seconds_since("start_time"),
    );

    let result = conn.execute(&sql, &[Value::from(session_id)]).await?;
    if result.rows_affected == 0 {
        tracing::debug!(session_id, "Heartbeat for unknown session");
    }
    Ok(result.rows_affected > 0)
}

pub async fn get(conn: &mut dyn Connection, session_id: &str) -> Result<Option<Session>, DatabaseError> {
    conn.fetch_optional(
        "SELECT session_id, start_time, last_heartbeat, duration_seconds, ip_address, \
         user_agent, location, latitude, longitude \
         FROM user_sessions WHERE session_id = ?",
        &[Value::from(session_id)],
    )
    .await?
    .as_ref()
    .map(Session::from_row)
    .transpose()
}

/// Append an event. The session is not required to exist.
pub async fn log_event(
    conn: &mut dyn Connection,
    session_id: &str,
    event_type: &str,
    details: &str,
) -> Result<i64, DatabaseError> {
    let row = conn
        .fetch_one(
            "INSERT INTO analytics_events (session_id, event_type, details) \
             VALUES (?, ?, ?) RETURNING id",
            &[
                Value::from(session_id),
                Value::from(event_type),
                Value::from(details),
            ],
        )
        .await?;
    row.get_i64("id")
}
