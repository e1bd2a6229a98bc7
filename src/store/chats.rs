//! Chat transcript persistence and rating.

use std::ops::RangeInclusive;

use crate::db::{Connection, Value};
use crate::error::DatabaseError;
use crate::store::models::{ChatExample, ChatInteraction};

/// Accepted star ratings.
pub const RATING_RANGE: RangeInclusive<i64> = 1..=5;

/// Rating that marks an exchange as a few-shot example.
const TOP_RATING: i64 = 5;
const HIGH_QUALITY_LIMIT: i64 = 5;

/// Store one exchange and return its id. Does not commit.
pub async fn save(
    conn: &mut dyn Connection,
    user_query: &str,
    ai_response: &str,
) -> Result<i64, DatabaseError> {
    let row = conn
        .fetch_one(
            "INSERT INTO chat_history (user_query, ai_response) VALUES (?, ?) RETURNING id",
            &[Value::from(user_query), Value::from(ai_response)],
        )
        .await?;
    row.get_i64("id")
}

/// Set the rating of chat `id`. Returns `false` when no such chat exists.
pub async fn rate(conn: &mut dyn Connection, id: i64, rating: i64) -> Result<bool, DatabaseError> {
    if !RATING_RANGE.contains(&rating) {
        return Err(DatabaseError::InvalidInput(format!(
            "rating must be between {} and {}, got {rating}",
            RATING_RANGE.start(),
            RATING_RANGE.end()
        )));
    }

    let result = conn
        .execute(
            "UPDATE chat_history SET rating = ? WHERE id = ?",
            &[Value::from(rating), Value::from(id)],
        )
        .await?;
    Ok(result.rows_affected > 0)
}

/// The `limit` newest exchanges.
pub async fn recent(
    conn: &mut dyn Connection,
    limit: i64,
) -> Result<Vec<ChatInteraction>, DatabaseError> {
    conn.fetch_all(
        "SELECT id, timestamp, user_query, ai_response, rating FROM chat_history \
         ORDER BY timestamp DESC, id DESC LIMIT ?",
        &[Value::from(limit.max(0))],
    )
    .await?
    .iter()
    .map(ChatInteraction::from_row)
    .collect()
}

/// Up to five top-rated exchanges, newest first.
pub async fn high_quality(conn: &mut dyn Connection) -> Result<Vec<ChatExample>, DatabaseError> {
    let rows = conn
        .fetch_all(
            "SELECT user_query, ai_response FROM chat_history \
             WHERE rating = ? ORDER BY id DESC LIMIT ?",
            &[Value::from(TOP_RATING), Value::from(HIGH_QUALITY_LIMIT)],
        )
        .await?;

    rows.iter()
        .map(|row| {
            Ok(ChatExample {
                user_query: row.opt_string("user_query")?.unwrap_or_default(),
                ai_response: row.opt_string("ai_response")?.unwrap_or_default(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_range() {
        assert!(RATING_RANGE.contains(&1));
        assert!(RATING_RANGE.contains(&TOP_RATING));
        assert!(!RATING_RANGE.contains(&0));
        assert!(!RATING_RANGE.contains(&6));
    }
}
