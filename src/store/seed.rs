//! Reference representatives and their reconciliation after migrations.

use crate::db::{Connection, Value};
use crate::error::DatabaseError;
use crate::store::models::{NewRepresentative, NewsItem};
use crate::store::representatives::insert_representative;

/// Counts produced by [`reconcile`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedOutcome {
    pub seeded: usize,
    pub removed: u64,
    pub enriched: usize,
    pub inserted: usize,
}

struct SeedRecord {
    name: &'static str,
    role: &'static str,
    party: &'static str,
    constituency: &'static str,
    state: &'static str,
    bio: &'static str,
    years_in_office: i64,
    funds_spent_crores: f64,
    funds_total_crores: f64,
    attendance_percentage: i64,
    achievements: &'static [&'static str],
    image_url: &'static str,
    news: &'static [(&'static str, &'static str)],
    sources: &'static [&'static str],
}

const SEED: &[SeedRecord] = &[
    SeedRecord {
        name: "Narendra Modi",
        role: "Prime Minister",
        party: "BJP",
        constituency: "Varanasi",
        state: "Uttar Pradesh",
        bio: "India's 14th Prime Minister, focus on economic development and national security. Led BJP to third consecutive term in 2024. Launched initiatives like PM Awas Yojana (Housing).",
        years_in_office: 10,
        funds_spent_crores: 50.5,
        funds_total_crores: 50.5,
        attendance_percentage: 98,
        achievements: &["3rd Term as PM", "G20 Presidency", "Digital India Expansion"],
        image_url: "https://upload.wikimedia.org/wikipedia/commons/thumb/8/80/Prime_Minister_Narendra_Modi_in_New_Delhi_on_June_09%2C_2024_%28cropeed%29.jpg/440px-Prime_Minister_Narendra_Modi_in_New_Delhi_on_June_09%2C_2024_%28cropeed%29.jpg",
        news: &[
            ("PM Modi inaugurates new infrastructure projects", "2024-12-20"),
            ("Address to the nation on Republic Day", "2025-01-26"),
        ],
        sources: &["PMO India", "The Hindu", "ANI"],
    },
    SeedRecord {
        name: "Rahul Gandhi",
        role: "Leader of Opposition",
        party: "INC",
        constituency: "Rae Bareli",
        state: "Uttar Pradesh",
        bio: "Leader of the Opposition in Lok Sabha (2024-). Spearheaded Bharat Jodo Yatra. Focus on social justice and caste census advocacy. Won from Wayanad and Rae Bareli in 2024.",
        years_in_office: 20,
        funds_spent_crores: 12.0,
        funds_total_crores: 15.0,
        attendance_percentage: 85,
        achievements: &["Bharat Jodo Yatra", "Leader of Opposition 2024", "Caste Census Advocacy"],
        image_url: "https://upload.wikimedia.org/wikipedia/commons/thumb/6/6e/Rahul_Gandhi_2024.jpg/440px-Rahul_Gandhi_2024.jpg",
        news: &[
            ("Rahul Gandhi speaks on unemployment in Lok Sabha", "2024-12-15"),
            ("Bharat Jodo Nyay Yatra concludes", "2024-03-20"),
        ],
        sources: &["INC India", "The Indian Express", "NDTV"],
    },
    SeedRecord {
        name: "Amit Shah",
        role: "Home Minister",
        party: "BJP",
        constituency: "Gandhinagar",
        state: "Gujarat",
        bio: "Union Home Minister and Minister of Cooperation. Key strategist for BJP. Oversaw abrogation of Article 370 and new criminal laws. Longest serving Home Minister.",
        years_in_office: 5,
        funds_spent_crores: 25.0,
        funds_total_crores: 25.0,
        attendance_percentage: 92,
        achievements: &["Abrogation of Article 370", "New Criminal Laws", "Cooperation Ministry"],
        image_url: "https://upload.wikimedia.org/wikipedia/commons/thumb/8/88/Amit_Shah_in_New_Delhi_on_June_09%2C_2024_%28cropped%29.jpg/440px-Amit_Shah_in_New_Delhi_on_June_09%2C_2024_%28cropped%29.jpg",
        news: &[
            ("Amit Shah reviews security situation in J&K", "2024-12-22"),
            ("New criminal laws to be implemented", "2024-07-01"),
        ],
        sources: &["MHA", "Times of India", "News18"],
    },
    SeedRecord {
        name: "Shashi Tharoor",
        role: "MP",
        party: "INC",
        constituency: "Thiruvananthapuram",
        state: "Kerala",
        bio: "Diplomat, author, and politician. Chairman of Parliamentary Committee on External Affairs. Former UN Under-Secretary-General. Known for literary works and articulate speeches.",
        years_in_office: 15,
        funds_spent_crores: 8.5,
        funds_total_crores: 10.0,
        attendance_percentage: 90,
        achievements: &["Sahitya Akademi Award", "Chairman External Affairs", "Diplomatic Service"],
        image_url: "https://upload.wikimedia.org/wikipedia/commons/thumb/b/b3/Shashi_Tharoor_in_2024_%28cropped%29.jpg/440px-Shashi_Tharoor_in_2024_%28cropped%29.jpg",
        news: &[
            ("Tharoor discusses foreign policy challenges", "2024-11-10"),
            ("Launch of new book on Indian politics", "2024-10-05"),
        ],
        sources: &["Shashi Tharoor Official", "The Print", "Hindustan Times"],
    },
];

impl SeedRecord {
    fn to_new(&self) -> Result<NewRepresentative, DatabaseError> {
        let news: Vec<NewsItem> = self
            .news
            .iter()
            .map(|(headline, date)| NewsItem {
                headline: headline.to_string(),
                date: date.to_string(),
            })
            .collect();

        Ok(NewRepresentative {
            name: self.name.to_string(),
            role: self.role.to_string(),
            party: self.party.to_string(),
            constituency: self.constituency.to_string(),
            state: self.state.to_string(),
            bio: self.bio.to_string(),
            years_in_office: self.years_in_office,
            funds_spent_crores: self.funds_spent_crores,
            funds_total_crores: self.funds_total_crores,
            attendance_percentage: self.attendance_percentage,
            achievements: Some(serde_json::to_string(self.achievements)?),
            image_url: Some(self.image_url.to_string()),
            news: Some(serde_json::to_string(&news)?),
            sources: Some(serde_json::to_string(self.sources)?),
        })
    }
}

/// The reference representatives in insertion order.
pub fn seed_representatives() -> Result<Vec<NewRepresentative>, DatabaseError> {
    SEED.iter().map(SeedRecord::to_new).collect()
}

/// Bring the reference representatives up to date. Does not commit.
///
/// An empty table receives the full seed set. Otherwise rows without a party
/// are removed, seed records already present by exact name get their
/// `image_url`, `news` and `sources` refreshed, and missing ones are inserted.
pub async fn reconcile(conn: &mut dyn Connection) -> Result<SeedOutcome, DatabaseError> {
    let records = seed_representatives()?;
    let mut outcome = SeedOutcome::default();

    let count = conn
        .fetch_one("SELECT COUNT(*) AS count FROM representatives", &[])
        .await?
        .get_i64("count")?;

    if count == 0 {
        for rep in &records {
            insert_representative(conn, rep).await?;
        }
        outcome.seeded = records.len();
        tracing::info!(count = outcome.seeded, "Seeded representatives");
        return Ok(outcome);
    }

    outcome.removed = conn
        .execute(
            "DELETE FROM representatives WHERE party IS NULL OR party = ''",
            &[],
        )
        .await?
        .rows_affected;
    if outcome.removed > 0 {
        tracing::info!(removed = outcome.removed, "Removed representatives without a party");
    }

    for rep in &records {
        let existing = conn
            .fetch_optional(
                "SELECT id FROM representatives WHERE name = ?",
                &[Value::from(&rep.name)],
            )
            .await?;

        if existing.is_some() {
            conn.execute(
                "UPDATE representatives SET image_url = ?, news = ?, sources = ? WHERE name = ?",
                &[
                    Value::from(rep.image_url.as_deref()),
                    Value::from(rep.news.as_deref()),
                    Value::from(rep.sources.as_deref()),
                    Value::from(&rep.name),
                ],
            )
            .await?;
            outcome.enriched += 1;
        } else {
            insert_representative(conn, rep).await?;
            outcome.inserted += 1;
        }
    }

    tracing::debug!(
        enriched = outcome.enriched,
        inserted = outcome.inserted,
        "Reconciled reference representatives"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_order_and_parties() {
        let reps = seed_representatives().unwrap();
        let parties: Vec<&str> = reps.iter().map(|r| r.party.as_str()).collect();
        assert_eq!(parties, vec!["BJP", "INC", "BJP", "INC"]);
        assert_eq!(reps[3].constituency, "Thiruvananthapuram");
    }

    #[test]
    fn test_seed_json_columns_decode() {
        let reps = seed_representatives().unwrap();
        let modi = &reps[0];

        let achievements: Vec<String> =
            serde_json::from_str(modi.achievements.as_deref().unwrap()).unwrap();
        assert_eq!(achievements[1], "G20 Presidency");

        let news: Vec<NewsItem> = serde_json::from_str(modi.news.as_deref().unwrap()).unwrap();
        assert_eq!(news.len(), 2);
        assert_eq!(news[1].date, "2025-01-26");

        let sources: Vec<String> = serde_json::from_str(modi.sources.as_deref().unwrap()).unwrap();
        assert_eq!(sources, vec!["PMO India", "The Hindu", "ANI"]);
    }

    #[test]
    fn test_seed_funds_within_totals() {
        for rep in seed_representatives().unwrap() {
            assert!(rep.funds_spent_crores <= rep.funds_total_crores, "{}", rep.name);
            assert!((0..=100).contains(&rep.attendance_percentage));
        }
    }
}
