//! Representative lookups and ingestion.

use crate::db::{Connection, Value};
use crate::error::DatabaseError;
use crate::store::models::{NewRepresentative, Representative};

const COLUMNS: &str = "id, name, role, party, constituency, state, bio, years_in_office, \
     funds_spent_crores, funds_total_crores, attendance_percentage, \
     achievements, image_url, news, sources";

const INSERT: &str = "INSERT INTO representatives (name, role, party, constituency, state, bio, \
     years_in_office, funds_spent_crores, funds_total_crores, attendance_percentage, \
     achievements, image_url, news, sources) \
     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

/// `%term%`, for substring matching with `LIKE ... ESCAPE '\'`. Wildcards in
/// `term` match literally.
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.trim().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub(crate) async fn insert_representative(
    conn: &mut dyn Connection,
    rep: &NewRepresentative,
) -> Result<(), DatabaseError> {
    conn.execute(
        INSERT,
        &[
            Value::from(&rep.name),
            Value::from(&rep.role),
            Value::from(&rep.party),
            Value::from(&rep.constituency),
            Value::from(&rep.state),
            Value::from(&rep.bio),
            Value::from(rep.years_in_office),
            Value::from(rep.funds_spent_crores),
            Value::from(rep.funds_total_crores),
            Value::from(rep.attendance_percentage),
            Value::from(rep.achievements.as_deref()),
            Value::from(rep.image_url.as_deref()),
            Value::from(rep.news.as_deref()),
            Value::from(rep.sources.as_deref()),
        ],
    )
    .await?;
    Ok(())
}

async fn fetch(
    conn: &mut dyn Connection,
    filter: &str,
    params: &[Value],
) -> Result<Vec<Representative>, DatabaseError> {
    let sql = format!("SELECT {COLUMNS} FROM representatives {filter} ORDER BY id");
    conn.fetch_all(&sql, params)
        .await?
        .iter()
        .map(Representative::from_row)
        .collect()
}

/// Every representative, in insertion order.
pub async fn get_all(conn: &mut dyn Connection) -> Result<Vec<Representative>, DatabaseError> {
    fetch(conn, "", &[]).await
}

/// Representatives whose constituency contains `constituency`, ignoring case.
pub async fn get_by_location(
    conn: &mut dyn Connection,
    constituency: &str,
) -> Result<Vec<Representative>, DatabaseError> {
    fetch(
        conn,
        "WHERE LOWER(constituency) LIKE LOWER(?) ESCAPE '\\'",
        &[Value::from(contains_pattern(constituency))],
    )
    .await
}

/// Representatives whose constituency or state contains `term`, ignoring case.
pub async fn search(
    conn: &mut dyn Connection,
    term: &str,
) -> Result<Vec<Representative>, DatabaseError> {
    let pattern = contains_pattern(term);
    fetch(
        conn,
        "WHERE LOWER(constituency) LIKE LOWER(?) ESCAPE '\\' \
         OR LOWER(state) LIKE LOWER(?) ESCAPE '\\'",
        &[Value::from(&pattern), Value::from(&pattern)],
    )
    .await
}

/// Insert each record unless one with the same name and constituency exists.
/// Returns the number inserted. Does not commit.
pub async fn ingest(
    conn: &mut dyn Connection,
    reps: &[NewRepresentative],
) -> Result<usize, DatabaseError> {
    let mut inserted = 0;
    for rep in reps {
        if rep.name.trim().is_empty() || rep.role.trim().is_empty() {
            return Err(DatabaseError::InvalidInput(format!(
                "representative needs a name and a role (got name '{}', role '{}')",
                rep.name, rep.role
            )));
        }

        let existing = conn
            .fetch_optional(
                "SELECT id FROM representatives WHERE name = ? AND constituency = ?",
                &[Value::from(&rep.name), Value::from(&rep.constituency)],
            )
            .await?;
        if existing.is_some() {
            tracing::debug!(name = %rep.name, constituency = %rep.constituency, "Representative already present");
            continue;
        }

        insert_representative(conn, rep).await?;
        inserted += 1;
    }
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern() {
        assert_eq!(contains_pattern("kerala"), "%kerala%");
        assert_eq!(contains_pattern("  Rae Bareli "), "%Rae Bareli%");
    }

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("%"), r"%\%%");
        assert_eq!(contains_pattern("a_b"), r"%a\_b%");
        assert_eq!(contains_pattern(r"c:\x"), r"%c:\\x%");
    }

    #[test]
    fn test_insert_binds_every_column() {
        let columns = COLUMNS.split(',').count() - 1;
        let placeholders = INSERT.matches('?').count();
        assert_eq!(columns, placeholders);
    }
}
