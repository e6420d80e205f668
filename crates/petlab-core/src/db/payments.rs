//! Payment database operations, including the hospitalization sub-record.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use super::{
    date_to_sql, opt_date_to_sql, opt_ts_to_sql, parse_date, parse_decimal, parse_opt_date,
    parse_opt_decimal, parse_opt_ts, parse_wire, ts_to_sql, Database, DbError, DbResult,
};
use crate::models::{Hospitalization, Payment, PaymentState};

const PAYMENT_COLUMNS: &str = "id, number, owner_id, pet_id, concept, kind, amount, amount_paid, \
     method, state, issued_on, due_on, paid_at, notes, is_hospitalization, \
     hospitalization_start, hospitalization_end, hospitalization_daily_rate, hospitalization_days";

impl Database {
    pub fn insert_payment(&self, payment: &Payment) -> DbResult<()> {
        let hosp = HospitalizationColumns::from(&payment.hospitalization);
        self.conn.execute(
            &format!(
                "INSERT INTO payments ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
                PAYMENT_COLUMNS
            ),
            params![
                payment.id,
                payment.number,
                payment.owner_id,
                payment.pet_id,
                payment.concept,
                payment.kind,
                payment.amount.to_string(),
                payment.amount_paid.to_string(),
                payment.method,
                payment.state.as_str(),
                date_to_sql(&payment.issued_on),
                opt_date_to_sql(&payment.due_on),
                opt_ts_to_sql(&payment.paid_at),
                payment.notes,
                hosp.flag,
                hosp.start,
                hosp.end,
                hosp.daily_rate,
                hosp.days,
            ],
        )?;
        Ok(())
    }

    /// Persist every mutable field of a payment.
    pub fn update_payment(&self, payment: &Payment) -> DbResult<bool> {
        let hosp = HospitalizationColumns::from(&payment.hospitalization);
        let rows_affected = self.conn.execute(
            r#"
            UPDATE payments SET
                concept = ?2,
                amount = ?3,
                amount_paid = ?4,
                method = ?5,
                state = ?6,
                due_on = ?7,
                paid_at = ?8,
                notes = ?9,
                hospitalization_end = ?10,
                hospitalization_days = ?11
            WHERE id = ?1
            "#,
            params![
                payment.id,
                payment.concept,
                payment.amount.to_string(),
                payment.amount_paid.to_string(),
                payment.method,
                payment.state.as_str(),
                opt_date_to_sql(&payment.due_on),
                opt_ts_to_sql(&payment.paid_at),
                payment.notes,
                hosp.end,
                hosp.days,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    pub fn get_payment(&self, id: &str) -> DbResult<Option<Payment>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM payments WHERE id = ?", PAYMENT_COLUMNS),
                [id],
                PaymentRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    pub fn get_payment_by_number(&self, number: &str) -> DbResult<Option<Payment>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM payments WHERE number = ?", PAYMENT_COLUMNS),
                [number],
                PaymentRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    pub fn list_payments_for_owner(&self, owner_id: &str) -> DbResult<Vec<Payment>> {
        self.query_payments(
            &format!(
                "SELECT {} FROM payments WHERE owner_id = ?1 ORDER BY issued_on DESC, number DESC",
                PAYMENT_COLUMNS
            ),
            params![owner_id],
        )
    }

    /// Hospitalizations that have not been closed yet.
    pub fn list_open_hospitalizations(&self) -> DbResult<Vec<Payment>> {
        self.query_payments(
            &format!(
                "SELECT {} FROM payments WHERE is_hospitalization = 1 AND hospitalization_end IS NULL AND state != ?1 ORDER BY hospitalization_start",
                PAYMENT_COLUMNS
            ),
            params![PaymentState::Cancelled.as_str()],
        )
    }

    pub fn list_payments_by_state(&self, state: PaymentState) -> DbResult<Vec<Payment>> {
        self.query_payments(
            &format!(
                "SELECT {} FROM payments WHERE state = ?1 ORDER BY issued_on, number",
                PAYMENT_COLUMNS
            ),
            params![state.as_str()],
        )
    }

    /// Payments settled in full within `[from, to]`.
    pub fn list_payments_paid_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<Payment>> {
        self.query_payments(
            &format!(
                "SELECT {} FROM payments WHERE paid_at >= ?1 AND paid_at <= ?2 ORDER BY paid_at",
                PAYMENT_COLUMNS
            ),
            params![ts_to_sql(&from), ts_to_sql(&to)],
        )
    }

    fn query_payments<P: rusqlite::Params>(&self, sql: &str, params: P) -> DbResult<Vec<Payment>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, PaymentRow::from_row)?;

        let mut payments = Vec::new();
        for row in rows {
            payments.push(row?.try_into()?);
        }
        Ok(payments)
    }
}

/// Flattened hospitalization columns.
struct HospitalizationColumns {
    flag: bool,
    start: Option<String>,
    end: Option<String>,
    daily_rate: Option<String>,
    days: Option<u32>,
}

impl From<&Option<Hospitalization>> for HospitalizationColumns {
    fn from(h: &Option<Hospitalization>) -> Self {
        match h {
            Some(h) => Self {
                flag: true,
                start: Some(ts_to_sql(&h.started_at)),
                end: opt_ts_to_sql(&h.ended_at),
                daily_rate: Some(h.daily_rate.to_string()),
                days: Some(h.days),
            },
            None => Self {
                flag: false,
                start: None,
                end: None,
                daily_rate: None,
                days: None,
            },
        }
    }
}

/// Intermediate row struct for database mapping.
struct PaymentRow {
    id: String,
    number: String,
    owner_id: String,
    pet_id: Option<String>,
    concept: String,
    kind: Option<String>,
    amount: String,
    amount_paid: String,
    method: Option<String>,
    state: String,
    issued_on: String,
    due_on: Option<String>,
    paid_at: Option<String>,
    notes: Option<String>,
    is_hospitalization: bool,
    hospitalization_start: Option<String>,
    hospitalization_end: Option<String>,
    hospitalization_daily_rate: Option<String>,
    hospitalization_days: Option<u32>,
}

impl PaymentRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            number: row.get(1)?,
            owner_id: row.get(2)?,
            pet_id: row.get(3)?,
            concept: row.get(4)?,
            kind: row.get(5)?,
            amount: row.get(6)?,
            amount_paid: row.get(7)?,
            method: row.get(8)?,
            state: row.get(9)?,
            issued_on: row.get(10)?,
            due_on: row.get(11)?,
            paid_at: row.get(12)?,
            notes: row.get(13)?,
            is_hospitalization: row.get(14)?,
            hospitalization_start: row.get(15)?,
            hospitalization_end: row.get(16)?,
            hospitalization_daily_rate: row.get(17)?,
            hospitalization_days: row.get(18)?,
        })
    }
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DbError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let hospitalization = if row.is_hospitalization {
            let started_at = parse_opt_ts(row.hospitalization_start)?.ok_or_else(|| {
                DbError::Constraint(format!("payment {} has no hospitalization start", row.id))
            })?;
            let daily_rate = parse_opt_decimal(row.hospitalization_daily_rate)?.ok_or_else(|| {
                DbError::Constraint(format!("payment {} has no daily rate", row.id))
            })?;
            Some(Hospitalization {
                started_at,
                ended_at: parse_opt_ts(row.hospitalization_end)?,
                daily_rate,
                days: row.hospitalization_days.unwrap_or(0),
            })
        } else {
            None
        };

        Ok(Payment {
            amount: parse_decimal(&row.amount)?,
            amount_paid: parse_decimal(&row.amount_paid)?,
            state: parse_wire(&row.state, "payment state")?,
            issued_on: parse_date(&row.issued_on)?,
            due_on: parse_opt_date(row.due_on)?,
            paid_at: parse_opt_ts(row.paid_at)?,
            hospitalization,
            id: row.id,
            number: row.number,
            owner_id: row.owner_id,
            pet_id: row.pet_id,
            concept: row.concept,
            kind: row.kind,
            method: row.method,
            notes: row.notes,
        })
    }
}
