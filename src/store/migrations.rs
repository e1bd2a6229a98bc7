//! Versioned schema migrations.
//!
//! Steps are applied in order and recorded in `schema_migrations`, so a step
//! runs at most once per database. Column additions also consult the catalog
//! first, which lets databases created before the marker table existed
//! upgrade without tripping over columns they already have.

use std::collections::HashSet;

use crate::db::{Connection, Dialect, Value};
use crate::error::DatabaseError;

/// A single schema change.
pub enum Step {
    /// `CREATE TABLE IF NOT EXISTS`, rendered for the active dialect.
    CreateTable(fn(&Dialect) -> String),
    AddColumn {
        table: &'static str,
        column: &'static str,
        definition: &'static str,
    },
    /// Statement valid on every supported dialect as written.
    Sql(&'static str),
}

pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub step: Step,
}

const MARKER_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
)";

fn create_representatives(d: &Dialect) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS representatives (
            id {pk},
            name TEXT NOT NULL,
            role TEXT NOT NULL,
            party TEXT,
            constituency TEXT,
            state TEXT,
            bio TEXT,
            years_in_office INTEGER,
            funds_spent_crores REAL,
            funds_total_crores REAL,
            attendance_percentage INTEGER
        )",
        pk = d.serial_primary_key
    )
}

fn create_chat_history(d: &Dialect) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS chat_history (
            id {pk},
            timestamp TIMESTAMP DEFAULT {now},
            user_query TEXT,
            ai_response TEXT,
            rating INTEGER
        )",
        pk = d.serial_primary_key,
        now = d.timestamp_default
    )
}

fn create_user_sessions(d: &Dialect) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS user_sessions (
            session_id TEXT PRIMARY KEY,
            start_time TIMESTAMP DEFAULT {now},
            last_heartbeat TIMESTAMP DEFAULT {now},
            duration_seconds REAL DEFAULT 0,
            ip_address TEXT,
            user_agent TEXT,
            location TEXT,
            latitude REAL,
            longitude REAL
        )",
        now = d.timestamp_default
    )
}

fn create_analytics_events(d: &Dialect) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS analytics_events (
            id {pk},
            session_id TEXT,
            timestamp TIMESTAMP DEFAULT {now},
            event_type TEXT,
            details TEXT
        )",
        pk = d.serial_primary_key,
        now = d.timestamp_default
    )
}

/// Every migration, oldest first. Append only; never renumber.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_representatives",
        step: Step::CreateTable(create_representatives),
    },
    Migration {
        version: 2,
        name: "representatives_add_achievements",
        step: Step::AddColumn {
            table: "representatives",
            column: "achievements",
            definition: "TEXT",
        },
    },
    Migration {
        version: 3,
        name: "representatives_add_image_url",
        step: Step::AddColumn {
            table: "representatives",
            column: "image_url",
            definition: "TEXT",
        },
    },
    Migration {
        version: 4,
        name: "representatives_add_news",
        step: Step::AddColumn {
            table: "representatives",
            column: "news",
            definition: "TEXT",
        },
    },
    Migration {
        version: 5,
        name: "representatives_add_sources",
        step: Step::AddColumn {
            table: "representatives",
            column: "sources",
            definition: "TEXT",
        },
    },
    Migration {
        version: 6,
        name: "representatives_add_funds_spent_crores",
        step: Step::AddColumn {
            table: "representatives",
            column: "funds_spent_crores",
            definition: "REAL",
        },
    },
    Migration {
        version: 7,
        name: "representatives_add_funds_total_crores",
        step: Step::AddColumn {
            table: "representatives",
            column: "funds_total_crores",
            definition: "REAL",
        },
    },
    Migration {
        version: 8,
        name: "representatives_add_attendance_percentage",
        step: Step::AddColumn {
            table: "representatives",
            column: "attendance_percentage",
            definition: "INTEGER",
        },
    },
    Migration {
        version: 9,
        name: "create_chat_history",
        step: Step::CreateTable(create_chat_history),
    },
    Migration {
        version: 10,
        name: "create_user_sessions",
        step: Step::CreateTable(create_user_sessions),
    },
    Migration {
        version: 11,
        name: "create_analytics_events",
        step: Step::CreateTable(create_analytics_events),
    },
    Migration {
        version: 12,
        name: "index_analytics_events_session",
        step: Step::Sql(
            "CREATE INDEX IF NOT EXISTS idx_analytics_events_session \
             ON analytics_events (session_id, timestamp)",
        ),
    },
    Migration {
        version: 13,
        name: "index_analytics_events_timestamp",
        step: Step::Sql(
            "CREATE INDEX IF NOT EXISTS idx_analytics_events_timestamp \
             ON analytics_events (timestamp)",
        ),
    },
];

async fn applied_versions(conn: &mut dyn Connection) -> Result<HashSet<i64>, DatabaseError> {
    let rows = conn
        .fetch_all("SELECT version FROM schema_migrations", &[])
        .await?;
    rows.iter().map(|r| r.get_i64("version")).collect()
}

/// Whether `table.column` exists, according to the engine's catalog.
pub async fn column_exists(
    conn: &mut dyn Connection,
    table: &str,
    column: &str,
) -> Result<bool, DatabaseError> {
    let sql = conn.dialect().column_exists_sql;
    let row = conn
        .fetch_one(sql, &[Value::from(table), Value::from(column)])
        .await?;
    Ok(row.get_i64("count")? > 0)
}

async fn apply(conn: &mut dyn Connection, migration: &Migration) -> Result<(), DatabaseError> {
    match &migration.step {
        Step::CreateTable(render) => {
            let sql = render(conn.dialect());
            conn.execute(&sql, &[]).await?;
        }
        Step::AddColumn {
            table,
            column,
            definition,
        } => {
            if column_exists(conn, table, column).await? {
                tracing::debug!(table, column, "Column already present, recording migration only");
            } else {
                let sql = format!("ALTER TABLE {table} ADD COLUMN {column} {definition}");
                conn.execute(&sql, &[]).await?;
            }
        }
        Step::Sql(sql) => {
            conn.execute(sql, &[]).await?;
        }
    }
    Ok(())
}

/// Apply every pending migration on `conn`. Does not commit.
///
/// Returns the names of the migrations applied by this call.
pub async fn run(conn: &mut dyn Connection) -> Result<Vec<String>, DatabaseError> {
    conn.execute(MARKER_TABLE, &[]).await?;
    let applied = applied_versions(conn).await?;

    let mut newly_applied = Vec::new();
    for migration in MIGRATIONS {
        if applied.contains(&migration.version) {
            continue;
        }

        apply(conn, migration)
            .await
            .map_err(|e| DatabaseError::Migration {
                version: migration.version,
                name: migration.name,
                reason: e.to_string(),
            })?;

        let now = chrono::Utc::now().naive_utc();
        conn.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?, ?, ?)",
            &[
                Value::from(migration.version),
                Value::from(migration.name),
                Value::from(now.format("%Y-%m-%d %H:%M:%S").to_string()),
            ],
        )
        .await?;

        tracing::info!(version = migration.version, name = migration.name, "Applied migration");
        newly_applied.push(migration.name.to_string());
    }

    Ok(newly_applied)
}
