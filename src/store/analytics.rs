//! Daily and traffic-shape aggregates over sessions and events.
//!
//! Everything is computed fresh on each call. "Today" is the backend's
//! current date, so results follow the engine's time zone rather than the
//! caller's.

use crate::db::{Connection, Dialect, Row, Value};
use crate::error::DatabaseError;
use crate::store::chats;
use crate::store::models::{
    AdvancedStats, DailyStats, EventCount, HourCount, LocationCount, StatsReport,
};

const TOP_ACTIONS_LIMIT: i64 = 5;
const TOP_LOCATIONS_LIMIT: i64 = 10;
const DROP_OFFS_LIMIT: i64 = 5;
const REPORT_RECENT_CHATS: i64 = 10;

/// Event types of each session's last event. Events sharing the latest
/// timestamp are resolved to the highest id, so a session counts once.
const DROP_OFFS_SQL: &str = "SELECT e.event_type AS event_type, COUNT(*) AS count \
     FROM analytics_events e \
     JOIN (SELECT MAX(a.id) AS id FROM analytics_events a \
           WHERE a.timestamp = (SELECT MAX(b.timestamp) FROM analytics_events b \
                                WHERE b.session_id = a.session_id) \
           GROUP BY a.session_id) AS latest \
       ON e.id = latest.id \
     GROUP BY e.event_type ORDER BY count DESC, event_type LIMIT ?";

/// Computes aggregates using one dialect's date and hour functions.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator {
    dialect: &'static Dialect,
}

impl Aggregator {
    pub fn new(dialect: &'static Dialect) -> Self {
        Self { dialect }
    }

    pub async fn daily_stats(&self, conn: &mut dyn Connection) -> Result<DailyStats, DatabaseError> {
        let today_sessions = self.dialect.is_today("start_time");

        let new_users = conn
            .fetch_one(
                &format!("SELECT COUNT(*) AS count FROM user_sessions WHERE {today_sessions}"),
                &[],
            )
            .await?
            .get_i64("count")?;

        let avg = conn
            .fetch_one(
                &format!(
                    "SELECT AVG(duration_seconds) AS avg FROM user_sessions WHERE {today_sessions}"
                ),
                &[],
            )
            .await?
            .opt_f64("avg")?;

        let top_actions = conn
            .fetch_all(
                &format!(
                    "SELECT event_type, COUNT(*) AS count FROM analytics_events \
                     WHERE {} GROUP BY event_type ORDER BY count DESC, event_type LIMIT ?",
                    self.dialect.is_today("timestamp")
                ),
                &[Value::from(TOP_ACTIONS_LIMIT)],
            )
            .await?
            .iter()
            .map(event_count)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DailyStats {
            new_users,
            avg_duration: round2(avg.unwrap_or(0.0)),
            top_actions,
        })
    }

    pub async fn advanced_stats(
        &self,
        conn: &mut dyn Connection,
    ) -> Result<AdvancedStats, DatabaseError> {
        let traffic_by_hour = conn
            .fetch_all(
                &format!(
                    "SELECT {hour} AS hour, COUNT(*) AS count FROM analytics_events \
                     WHERE {today} GROUP BY hour ORDER BY hour",
                    hour = self.dialect.hour_of("timestamp"),
                    today = self.dialect.is_today("timestamp"),
                ),
                &[],
            )
            .await?
            .iter()
            .map(|row| {
                Ok(HourCount {
                    hour: row.get_string("hour")?,
                    count: row.get_i64("count")?,
                })
            })
            .collect::<Result<Vec<_>, DatabaseError>>()?;

        // One coordinate pair per label; sessions sharing a label are
        // assumed to share coordinates.
        let top_locations = conn
            .fetch_all(
                "SELECT location, MAX(latitude) AS latitude, MAX(longitude) AS longitude, \
                 COUNT(*) AS count FROM user_sessions WHERE location IS NOT NULL \
                 GROUP BY location ORDER BY count DESC, location LIMIT ?",
                &[Value::from(TOP_LOCATIONS_LIMIT)],
            )
            .await?
            .iter()
            .map(|row| {
                Ok(LocationCount {
                    location: row.get_string("location")?,
                    latitude: row.opt_f64("latitude")?,
                    longitude: row.opt_f64("longitude")?,
                    count: row.get_i64("count")?,
                })
            })
            .collect::<Result<Vec<_>, DatabaseError>>()?;

        let drop_offs = conn
            .fetch_all(DROP_OFFS_SQL, &[Value::from(DROP_OFFS_LIMIT)])
            .await?
            .iter()
            .map(event_count)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AdvancedStats {
            traffic_by_hour,
            top_locations,
            drop_offs,
        })
    }

    /// Daily and advanced stats plus the newest chats.
    pub async fn stats_report(
        &self,
        conn: &mut dyn Connection,
    ) -> Result<StatsReport, DatabaseError> {
        let daily = self.daily_stats(conn).await?;
        let advanced = self.advanced_stats(conn).await?;
        let recent_chats = chats::recent(conn, REPORT_RECENT_CHATS).await?;
        Ok(StatsReport {
            daily,
            advanced,
            recent_chats,
        })
    }
}

fn event_count(row: &Row) -> Result<EventCount, DatabaseError> {
    Ok(EventCount {
        event_type: row.opt_string("event_type")?.unwrap_or_default(),
        count: row.get_i64("count")?,
    })
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(0.0), 0.0);
        assert_eq!(round2(12.345_6), 12.35);
        assert_eq!(round2(59.994), 59.99);
        assert_eq!(round2(7.0), 7.0);
    }

    #[test]
    fn test_event_count_tolerates_null_type() {
        let mut row = Row::new();
        row.push("event_type", Value::Null);
        row.push("count", Value::Integer(2));
        let count = event_count(&row).unwrap();
        assert_eq!(count.event_type, "");
        assert_eq!(count.count, 2);
    }
}
