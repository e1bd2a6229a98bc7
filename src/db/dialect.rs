//! SQL dialect parameters.
//!
//! Every place where the two engines need different SQL text reads it from a
//! [`Dialect`]. Query code never checks which backend is active.

/// How positional parameters are written in statements sent to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `?` repeated for every parameter (SQLite).
    Question,
    /// `$1`, `$2`, ... (PostgreSQL).
    Numbered,
}

/// Dialect-specific SQL fragments for one backend.
#[derive(Debug)]
pub struct Dialect {
    pub name: &'static str,
    pub placeholder: PlaceholderStyle,
    /// Column declaration for an auto-incrementing integer primary key.
    pub serial_primary_key: &'static str,
    /// DEFAULT clause value for timestamp columns.
    pub timestamp_default: &'static str,
    /// Expression for "now" usable in DML.
    pub now: &'static str,
    /// Expression for today's calendar date.
    pub current_date: &'static str,
    /// Query counting columns named `?2` on table `?1`; yields a single
    /// `count` column.
    pub column_exists_sql: &'static str,
    hour_of: fn(&str) -> String,
    elapsed_seconds_since: fn(&str) -> String,
}

impl Dialect {
    pub const SQLITE: Dialect = Dialect {
        name: "sqlite",
        placeholder: PlaceholderStyle::Question,
        serial_primary_key: "INTEGER PRIMARY KEY AUTOINCREMENT",
        timestamp_default: "(strftime('%Y-%m-%d %H:%M:%f', 'now'))",
        now: "strftime('%Y-%m-%d %H:%M:%f', 'now')",
        current_date: "date('now')",
        column_exists_sql: "SELECT COUNT(*) AS count FROM pragma_table_info(?) WHERE name = ?",
        hour_of: |col| format!("strftime('%H', {col})"),
        elapsed_seconds_since: |col| {
            format!("((julianday('now') - julianday({col})) * 86400.0)")
        },
    };

    pub const POSTGRES: Dialect = Dialect {
        name: "postgres",
        placeholder: PlaceholderStyle::Numbered,
        serial_primary_key: "SERIAL PRIMARY KEY",
        timestamp_default: "CURRENT_TIMESTAMP",
        now: "CURRENT_TIMESTAMP",
        current_date: "CURRENT_DATE",
        column_exists_sql: "SELECT COUNT(*) AS count FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = ? AND column_name = ?",
        hour_of: |col| format!("TO_CHAR({col}, 'HH24')"),
        elapsed_seconds_since: |col| {
            format!("EXTRACT(EPOCH FROM (CURRENT_TIMESTAMP - {col}))")
        },
    };

    /// Predicate that is true when timestamp column `col` falls on today.
    pub fn is_today(&self, col: &str) -> String {
        format!("date({col}) = {}", self.current_date)
    }

    /// Two-digit hour-of-day label ("00".."23") of timestamp column `col`.
    pub fn hour_of(&self, col: &str) -> String {
        (self.hour_of)(col)
    }

    /// Seconds elapsed between timestamp column `col` and now.
    pub fn elapsed_seconds_since(&self, col: &str) -> String {
        (self.elapsed_seconds_since)(col)
    }

    /// Rewrite a `?`-placeholder statement into this dialect's style.
    pub fn rewrite_placeholders(&self, sql: &str) -> String {
        match self.placeholder {
            PlaceholderStyle::Question => sql.to_string(),
            PlaceholderStyle::Numbered => number_placeholders(sql),
        }
    }
}

/// Replace each `?` outside quoted literals and identifiers with `$n`.
pub fn number_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut n = 0;
    let mut quote: Option<char> = None;

    for c in sql.chars() {
        match quote {
            Some(q) => {
                // A doubled quote ('') closes and immediately reopens, which
                // toggling handles without lookahead.
                if c == q {
                    quote = None;
                }
                out.push(c);
            }
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    out.push(c);
                }
                '?' => {
                    n += 1;
                    out.push('$');
                    out.push_str(&n.to_string());
                }
                _ => out.push(c),
            },
        }
    }
    out
}
