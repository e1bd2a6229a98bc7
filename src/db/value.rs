//! Backend-neutral parameter and result values.
//!
//! Both adapters bind [`Value`] parameters and decode result cells into
//! [`Value`]s, so callers see the same [`Row`] shape regardless of engine.

use chrono::{DateTime, NaiveDateTime};

use crate::error::DatabaseError;

/// A single SQL value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Text layout used for timestamps stored in SQLite.
pub(crate) const SQLITE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Parse a timestamp stored as text. Accepts the SQLite layouts
/// (`YYYY-MM-DD HH:MM:SS[.fff]`) and RFC 3339.
pub(crate) fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc()))
}

/// One result row, addressable by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, value: Value) {
        self.columns.push((name.into(), value));
    }

    /// Raw value of a column, `None` when the row has no such column.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|(col, _)| col == name)
            .map(|(_, v)| v)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    fn require(&self, name: &str) -> Result<&Value, DatabaseError> {
        self.get(name)
            .ok_or_else(|| DatabaseError::Serialization(format!("no column named '{name}'")))
    }

    pub fn opt_i64(&self, name: &str) -> Result<Option<i64>, DatabaseError> {
        match self.require(name)? {
            Value::Null => Ok(None),
            Value::Integer(v) => Ok(Some(*v)),
            Value::Real(v) if v.fract() == 0.0 => Ok(Some(*v as i64)),
            Value::Text(s) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| mismatch(name, "integer", &format!("text '{s}'"))),
            other => Err(mismatch(name, "integer", &format!("{other:?}"))),
        }
    }

    pub fn get_i64(&self, name: &str) -> Result<i64, DatabaseError> {
        self.opt_i64(name)?.ok_or_else(|| null_in(name))
    }

    pub fn opt_f64(&self, name: &str) -> Result<Option<f64>, DatabaseError> {
        match self.require(name)? {
            Value::Null => Ok(None),
            Value::Integer(v) => Ok(Some(*v as f64)),
            Value::Real(v) => Ok(Some(*v)),
            Value::Text(s) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| mismatch(name, "real", &format!("text '{s}'"))),
            other => Err(mismatch(name, "real", &format!("{other:?}"))),
        }
    }

    pub fn get_f64(&self, name: &str) -> Result<f64, DatabaseError> {
        self.opt_f64(name)?.ok_or_else(|| null_in(name))
    }

    pub fn opt_string(&self, name: &str) -> Result<Option<String>, DatabaseError> {
        match self.require(name)? {
            Value::Null => Ok(None),
            Value::Text(s) => Ok(Some(s.clone())),
            Value::Integer(v) => Ok(Some(v.to_string())),
            Value::Real(v) => Ok(Some(v.to_string())),
            Value::Timestamp(ts) => Ok(Some(ts.format(SQLITE_TIMESTAMP_FORMAT).to_string())),
        }
    }

    pub fn get_string(&self, name: &str) -> Result<String, DatabaseError> {
        self.opt_string(name)?.ok_or_else(|| null_in(name))
    }

    pub fn opt_timestamp(&self, name: &str) -> Result<Option<NaiveDateTime>, DatabaseError> {
        match self.require(name)? {
            Value::Null => Ok(None),
            Value::Timestamp(ts) => Ok(Some(*ts)),
            Value::Text(s) => parse_timestamp(s)
                .map(Some)
                .ok_or_else(|| mismatch(name, "timestamp", &format!("text '{s}'"))),
            other => Err(mismatch(name, "timestamp", &format!("{other:?}"))),
        }
    }

    pub fn get_timestamp(&self, name: &str) -> Result<NaiveDateTime, DatabaseError> {
        self.opt_timestamp(name)?.ok_or_else(|| null_in(name))
    }
}

fn mismatch(column: &str, expected: &str, found: &str) -> DatabaseError {
    DatabaseError::Serialization(format!(
        "column '{column}': expected {expected}, found {found}"
    ))
}

fn null_in(column: &str) -> DatabaseError {
    DatabaseError::Serialization(format!("column '{column}' is NULL"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_row() -> Row {
        let mut row = Row::new();
        row.push("id", Value::Integer(7));
        row.push("name", Value::Text("Shashi Tharoor".to_string()));
        row.push("funds", Value::Integer(10));
        row.push("rating", Value::Null);
        row.push("created", Value::Text("2025-01-26 09:30:15.250".to_string()));
        row
    }

    #[test]
    fn test_lookup_by_column_name() {
        let row = sample_row();
        assert_eq!(row.get_i64("id").unwrap(), 7);
        assert_eq!(row.get_string("name").unwrap(), "Shashi Tharoor");
        assert_eq!(row.len(), 5);
        assert!(row.get("missing").is_none());
    }

    #[test]
    fn test_integer_widens_to_real() {
        let row = sample_row();
        assert_eq!(row.get_f64("funds").unwrap(), 10.0);
    }

    #[test]
    fn test_null_handling() {
        let row = sample_row();
        assert_eq!(row.opt_i64("rating").unwrap(), None);
        assert!(matches!(
            row.get_i64("rating"),
            Err(DatabaseError::Serialization(_))
        ));
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let row = sample_row();
        let err = row.get_string("party").unwrap_err();
        assert!(err.to_string().contains("party"));
    }

    #[test]
    fn test_type_mismatch() {
        let row = sample_row();
        assert!(row.get_i64("name").is_err());
    }

    #[test]
    fn test_timestamp_from_text() {
        let row = sample_row();
        let ts = row.get_timestamp("created").unwrap();
        let expected = NaiveDate::from_ymd_opt(2025, 1, 26)
            .unwrap()
            .and_hms_milli_opt(9, 30, 15, 250)
            .unwrap();
        assert_eq!(ts, expected);
    }

    #[test]
    fn test_parse_timestamp_layouts() {
        assert!(parse_timestamp("2024-12-20 10:00:00").is_some());
        assert!(parse_timestamp("2024-12-20T10:00:00.5").is_some());
        assert!(parse_timestamp("2024-12-20T10:00:00Z").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_option_into_value() {
        assert_eq!(Value::from(None::<String>), Value::Null);
        assert_eq!(Value::from(Some(4.5)), Value::Real(4.5));
        assert_eq!(Value::from("x"), Value::Text("x".to_string()));
    }
}
