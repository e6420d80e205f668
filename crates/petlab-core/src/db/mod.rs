//! Database layer: the persistence gateway for the laboratory core.
//!
//! Money is stored as decimal TEXT, instants as RFC 3339 TEXT with a fixed
//! precision (so range predicates compare lexicographically), and dates as
//! `YYYY-MM-DD`.

mod schema;
mod owners;
mod orders;
mod results;
mod appointments;
mod invoices;
mod payments;
mod inventory;

pub use schema::*;

#[cfg(test)]
pub(crate) use orders::test_support;

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::path::Path;
use thiserror::Error;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid decimal: {0}")]
    Decimal(#[from] rust_decimal::Error),

    #[error("Invalid timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` as one unit of work: committed if it returns `Ok`, rolled back
    /// otherwise. Must not be nested.
    pub fn atomically<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Database) -> Result<T, E>,
        E: From<DbError>,
    {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(DbError::from)?;
        let value = f(self)?;
        tx.commit().map_err(DbError::from)?;
        Ok(value)
    }
}

// =========================================================================
// Column codecs
// =========================================================================

pub(crate) fn ts_to_sql(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn opt_ts_to_sql(t: &Option<DateTime<Utc>>) -> Option<String> {
    t.as_ref().map(ts_to_sql)
}

pub(crate) fn parse_ts(s: &str) -> DbResult<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

pub(crate) fn parse_opt_ts(s: Option<String>) -> DbResult<Option<DateTime<Utc>>> {
    s.as_deref().map(parse_ts).transpose()
}

pub(crate) fn date_to_sql(d: &NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

pub(crate) fn opt_date_to_sql(d: &Option<NaiveDate>) -> Option<String> {
    d.as_ref().map(date_to_sql)
}

pub(crate) fn parse_date(s: &str) -> DbResult<NaiveDate> {
    Ok(NaiveDate::parse_from_str(s, "%Y-%m-%d")?)
}

pub(crate) fn parse_opt_date(s: Option<String>) -> DbResult<Option<NaiveDate>> {
    s.as_deref().map(parse_date).transpose()
}

pub(crate) fn parse_decimal(s: &str) -> DbResult<Decimal> {
    Ok(Decimal::from_str(s)?)
}

pub(crate) fn parse_opt_decimal(s: Option<String>) -> DbResult<Option<Decimal>> {
    s.as_deref().map(parse_decimal).transpose()
}

/// Parse a stored state column into its closed enum.
pub(crate) fn parse_wire<T: FromStr>(s: &str, what: &str) -> DbResult<T> {
    s.parse()
        .map_err(|_| DbError::Constraint(format!("Unknown {}: {}", what, s)))
}

/// Inclusive instant bounds covering whole calendar days.
pub(crate) fn day_bounds(start: NaiveDate, end: NaiveDate) -> (String, String) {
    let from = start.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
    let to = end
        .and_hms_micro_opt(23, 59, 59, 999_999)
        .unwrap_or_default()
        .and_utc();
    (ts_to_sql(&from), ts_to_sql(&to))
}
