//! Exam result database operations.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

use super::{day_bounds, opt_ts_to_sql, parse_opt_ts, parse_ts, ts_to_sql, Database, DbError, DbResult};
use crate::models::ExamResult;

const RESULT_COLUMNS: &str = "id, order_id, recorded_at, description, result_values, \
     reference_values, conclusions, recommendations, method, technical_notes, \
     validated, validated_at, delivered, delivered_at";

impl Database {
    /// Insert a new result.
    pub fn insert_result(&self, result: &ExamResult) -> DbResult<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO results ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                RESULT_COLUMNS
            ),
            params![
                result.id,
                result.order_id,
                ts_to_sql(&result.recorded_at),
                result.description,
                result.values,
                result.reference_values,
                result.conclusions,
                result.recommendations,
                result.method,
                result.technical_notes,
                result.validated,
                opt_ts_to_sql(&result.validated_at),
                result.delivered,
                opt_ts_to_sql(&result.delivered_at),
            ],
        )?;
        Ok(())
    }

    /// Persist the validation and delivery flags of a result.
    pub fn update_result_flags(&self, result: &ExamResult) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE results SET
                validated = ?2,
                validated_at = ?3,
                delivered = ?4,
                delivered_at = ?5
            WHERE id = ?1
            "#,
            params![
                result.id,
                result.validated,
                opt_ts_to_sql(&result.validated_at),
                result.delivered,
                opt_ts_to_sql(&result.delivered_at),
            ],
        )?;
        Ok(rows_affected > 0)
    }

    pub fn get_result(&self, id: &str) -> DbResult<Option<ExamResult>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM results WHERE id = ?", RESULT_COLUMNS),
                [id],
                ResultRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    pub fn delete_result(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM results WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    /// Results of one order, oldest first.
    pub fn list_results_for_order(&self, order_id: &str) -> DbResult<Vec<ExamResult>> {
        self.query_results(
            &format!(
                "SELECT {} FROM results WHERE order_id = ?1 ORDER BY recorded_at, id",
                RESULT_COLUMNS
            ),
            params![order_id],
        )
    }

    /// Most recently recorded result of an order.
    pub fn latest_result_for_order(&self, order_id: &str) -> DbResult<Option<ExamResult>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM results WHERE order_id = ? ORDER BY recorded_at DESC LIMIT 1",
                    RESULT_COLUMNS
                ),
                [order_id],
                ResultRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    pub fn list_unvalidated_results(&self) -> DbResult<Vec<ExamResult>> {
        self.query_results(
            &format!(
                "SELECT {} FROM results WHERE validated = 0 ORDER BY recorded_at",
                RESULT_COLUMNS
            ),
            params![],
        )
    }

    /// Validated results still waiting to be handed to the owner.
    pub fn list_undelivered_results(&self) -> DbResult<Vec<ExamResult>> {
        self.query_results(
            &format!(
                "SELECT {} FROM results WHERE validated = 1 AND delivered = 0 ORDER BY validated_at",
                RESULT_COLUMNS
            ),
            params![],
        )
    }

    /// Results recorded on the calendar days `[start, end]`.
    pub fn list_results_recorded_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DbResult<Vec<ExamResult>> {
        let (from, to) = day_bounds(start, end);
        self.query_results(
            &format!(
                "SELECT {} FROM results WHERE recorded_at >= ?1 AND recorded_at <= ?2 ORDER BY recorded_at",
                RESULT_COLUMNS
            ),
            params![from, to],
        )
    }

    pub fn count_results_for_order(&self, order_id: &str) -> DbResult<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM results WHERE order_id = ?",
            [order_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn query_results<P: rusqlite::Params>(&self, sql: &str, params: P) -> DbResult<Vec<ExamResult>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, ResultRow::from_row)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?.try_into()?);
        }
        Ok(results)
    }
}

/// Intermediate row struct for database mapping.
struct ResultRow {
    id: String,
    order_id: String,
    recorded_at: String,
    description: Option<String>,
    values: Option<String>,
    reference_values: Option<String>,
    conclusions: Option<String>,
    recommendations: Option<String>,
    method: Option<String>,
    technical_notes: Option<String>,
    validated: bool,
    validated_at: Option<String>,
    delivered: bool,
    delivered_at: Option<String>,
}

impl ResultRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            order_id: row.get(1)?,
            recorded_at: row.get(2)?,
            description: row.get(3)?,
            values: row.get(4)?,
            reference_values: row.get(5)?,
            conclusions: row.get(6)?,
            recommendations: row.get(7)?,
            method: row.get(8)?,
            technical_notes: row.get(9)?,
            validated: row.get(10)?,
            validated_at: row.get(11)?,
            delivered: row.get(12)?,
            delivered_at: row.get(13)?,
        })
    }
}

impl TryFrom<ResultRow> for ExamResult {
    type Error = DbError;

    fn try_from(row: ResultRow) -> Result<Self, Self::Error> {
        Ok(ExamResult {
            recorded_at: parse_ts(&row.recorded_at)?,
            validated_at: parse_opt_ts(row.validated_at)?,
            delivered_at: parse_opt_ts(row.delivered_at)?,
            id: row.id,
            order_id: row.order_id,
            description: row.description,
            values: row.values,
            reference_values: row.reference_values,
            conclusions: row.conclusions,
            recommendations: row.recommendations,
            method: row.method,
            technical_notes: row.technical_notes,
            validated: row.validated,
            delivered: row.delivered,
        })
    }
}
