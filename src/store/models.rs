//! Records owned by the store and the shapes it reports.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::db::Row;
use crate::error::DatabaseError;

/// An elected representative.
///
/// `achievements`, `news` and `sources` hold JSON text exactly as stored;
/// decoding them is left to the consumer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Representative {
    pub id: i64,
    pub name: String,
    pub role: String,
    pub party: Option<String>,
    pub constituency: Option<String>,
    pub state: Option<String>,
    pub bio: Option<String>,
    pub years_in_office: Option<i64>,
    pub funds_spent_crores: Option<f64>,
    pub funds_total_crores: Option<f64>,
    pub attendance_percentage: Option<i64>,
    pub achievements: Option<String>,
    pub image_url: Option<String>,
    pub news: Option<String>,
    pub sources: Option<String>,
}

impl Representative {
    pub(crate) fn from_row(row: &Row) -> Result<Self, DatabaseError> {
        Ok(Self {
            id: row.get_i64("id")?,
            name: row.get_string("name")?,
            role: row.get_string("role")?,
            party: row.opt_string("party")?,
            constituency: row.opt_string("constituency")?,
            state: row.opt_string("state")?,
            bio: row.opt_string("bio")?,
            years_in_office: row.opt_i64("years_in_office")?,
            funds_spent_crores: row.opt_f64("funds_spent_crores")?,
            funds_total_crores: row.opt_f64("funds_total_crores")?,
            attendance_percentage: row.opt_i64("attendance_percentage")?,
            achievements: row.opt_string("achievements")?,
            image_url: row.opt_string("image_url")?,
            news: row.opt_string("news")?,
            sources: row.opt_string("sources")?,
        })
    }
}

/// A representative to insert (seed data or bulk ingestion).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRepresentative {
    pub name: String,
    pub role: String,
    pub party: String,
    pub constituency: String,
    pub state: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub years_in_office: i64,
    #[serde(default)]
    pub funds_spent_crores: f64,
    #[serde(default)]
    pub funds_total_crores: f64,
    #[serde(default)]
    pub attendance_percentage: i64,
    #[serde(default)]
    pub achievements: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub news: Option<String>,
    #[serde(default)]
    pub sources: Option<String>,
}

/// One item of a representative's `news` column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub headline: String,
    pub date: String,
}

/// A stored chat exchange.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatInteraction {
    pub id: i64,
    pub timestamp: NaiveDateTime,
    pub user_query: Option<String>,
    pub ai_response: Option<String>,
    pub rating: Option<i64>,
}

impl ChatInteraction {
    pub(crate) fn from_row(row: &Row) -> Result<Self, DatabaseError> {
        Ok(Self {
            id: row.get_i64("id")?,
            timestamp: row.get_timestamp("timestamp")?,
            user_query: row.opt_string("user_query")?,
            ai_response: row.opt_string("ai_response")?,
            rating: row.opt_i64("rating")?,
        })
    }
}

/// A top-rated exchange used as a few-shot example.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatExample {
    pub user_query: String,
    pub ai_response: String,
}

/// Attributes captured when a visitor session is first seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewSession<'a> {
    pub session_id: &'a str,
    pub ip_address: Option<&'a str>,
    pub user_agent: Option<&'a str>,
    pub location: Option<&'a str>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl<'a> NewSession<'a> {
    pub fn new(session_id: &'a str) -> Self {
        Self {
            session_id,
            ..Default::default()
        }
    }
}

/// A visitor session row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub session_id: String,
    pub start_time: NaiveDateTime,
    pub last_heartbeat: NaiveDateTime,
    pub duration_seconds: f64,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Session {
    pub(crate) fn from_row(row: &Row) -> Result<Self, DatabaseError> {
        Ok(Self {
            session_id: row.get_string("session_id")?,
            start_time: row.get_timestamp("start_time")?,
            last_heartbeat: row.get_timestamp("last_heartbeat")?,
            duration_seconds: row.opt_f64("duration_seconds")?.unwrap_or(0.0),
            ip_address: row.opt_string("ip_address")?,
            user_agent: row.opt_string("user_agent")?,
            location: row.opt_string("location")?,
            latitude: row.opt_f64("latitude")?,
            longitude: row.opt_f64("longitude")?,
        })
    }
}

/// Frequency of one event type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventCount {
    pub event_type: String,
    pub count: i64,
}

/// Events in one hour of the day ("00".."23").
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourCount {
    pub hour: String,
    pub count: i64,
}

/// Sessions seen from one location label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationCount {
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub count: i64,
}

/// Today's headline numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStats {
    pub new_users: i64,
    pub avg_duration: f64,
    pub top_actions: Vec<EventCount>,
}

/// Traffic shape, geography and drop-off points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdvancedStats {
    pub traffic_by_hour: Vec<HourCount>,
    pub top_locations: Vec<LocationCount>,
    pub drop_offs: Vec<EventCount>,
}

/// Everything the admin dashboard shows, as one flat JSON object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    #[serde(flatten)]
    pub daily: DailyStats,
    #[serde(flatten)]
    pub advanced: AdvancedStats,
    pub recent_chats: Vec<ChatInteraction>,
}

/// What a migration run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub applied: Vec<String>,
    pub seeded: usize,
    pub removed: u64,
    pub enriched: usize,
    pub inserted: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_stats_report_is_flat() {
        let report = StatsReport {
            daily: DailyStats {
                new_users: 3,
                avg_duration: 12.5,
                top_actions: vec![EventCount {
                    event_type: "page_view".to_string(),
                    count: 4,
                }],
            },
            advanced: AdvancedStats {
                traffic_by_hour: vec![HourCount {
                    hour: "09".to_string(),
                    count: 4,
                }],
                top_locations: vec![],
                drop_offs: vec![],
            },
            recent_chats: vec![ChatInteraction {
                id: 1,
                timestamp: NaiveDate::from_ymd_opt(2025, 1, 26)
                    .unwrap()
                    .and_hms_opt(9, 0, 0)
                    .unwrap(),
                user_query: Some("Who is my MP?".to_string()),
                ai_response: Some("Shashi Tharoor".to_string()),
                rating: None,
            }],
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["new_users"], 3);
        assert_eq!(json["avg_duration"], 12.5);
        assert_eq!(json["top_actions"][0]["event_type"], "page_view");
        assert_eq!(json["traffic_by_hour"][0]["hour"], "09");
        assert!(json["top_locations"].as_array().unwrap().is_empty());
        assert_eq!(json["recent_chats"][0]["user_query"], "Who is my MP?");
        assert!(json.get("daily").is_none());
    }

    #[test]
    fn test_new_representative_defaults() {
        let rep: NewRepresentative = serde_json::from_str(
            r#"{"name": "A", "role": "MP (Lok Sabha)", "party": "INC",
                "constituency": "Wayanad", "state": "Kerala"}"#,
        )
        .unwrap();
        assert_eq!(rep.years_in_office, 0);
        assert_eq!(rep.bio, "");
        assert!(rep.news.is_none());
    }
}
