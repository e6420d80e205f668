//! Appointment database operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use super::{parse_opt_decimal, parse_ts, parse_wire, ts_to_sql, Database, DbError, DbResult};
use crate::models::{Appointment, AppointmentState};

const APPOINTMENT_COLUMNS: &str = "id, pet_id, vet_id, scheduled_at, reason, kind, state, \
     duration_minutes, notes, fee, reminder_sent";

impl Database {
    pub fn insert_appointment(&self, appt: &Appointment) -> DbResult<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO appointments ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                APPOINTMENT_COLUMNS
            ),
            params![
                appt.id,
                appt.pet_id,
                appt.vet_id,
                ts_to_sql(&appt.scheduled_at),
                appt.reason,
                appt.kind,
                appt.state.as_str(),
                appt.duration_minutes,
                appt.notes,
                appt.fee.map(|f| f.to_string()),
                appt.reminder_sent,
            ],
        )?;
        Ok(())
    }

    /// Persist every mutable field of an appointment.
    pub fn update_appointment(&self, appt: &Appointment) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE appointments SET
                vet_id = ?2,
                scheduled_at = ?3,
                reason = ?4,
                kind = ?5,
                state = ?6,
                duration_minutes = ?7,
                notes = ?8,
                fee = ?9,
                reminder_sent = ?10
            WHERE id = ?1
            "#,
            params![
                appt.id,
                appt.vet_id,
                ts_to_sql(&appt.scheduled_at),
                appt.reason,
                appt.kind,
                appt.state.as_str(),
                appt.duration_minutes,
                appt.notes,
                appt.fee.map(|f| f.to_string()),
                appt.reminder_sent,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    pub fn get_appointment(&self, id: &str) -> DbResult<Option<Appointment>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM appointments WHERE id = ?", APPOINTMENT_COLUMNS),
                [id],
                AppointmentRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Appointments scheduled in `[from, to]` that are not cancelled, soonest first.
    pub fn list_active_appointments_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<Appointment>> {
        self.query_appointments(
            &format!(
                "SELECT {} FROM appointments WHERE scheduled_at >= ?1 AND scheduled_at <= ?2 AND state != ?3 ORDER BY scheduled_at",
                APPOINTMENT_COLUMNS
            ),
            params![
                ts_to_sql(&from),
                ts_to_sql(&to),
                AppointmentState::Cancelled.as_str()
            ],
        )
    }

    /// Non-terminal appointments whose time has passed.
    pub fn list_overdue_appointments(&self, now: DateTime<Utc>) -> DbResult<Vec<Appointment>> {
        self.query_appointments(
            &format!(
                "SELECT {} FROM appointments WHERE scheduled_at < ?1 AND state IN (?2, ?3) ORDER BY scheduled_at",
                APPOINTMENT_COLUMNS
            ),
            params![
                ts_to_sql(&now),
                AppointmentState::Scheduled.as_str(),
                AppointmentState::Confirmed.as_str()
            ],
        )
    }

    /// Appointments in `state` scheduled at or after `from`, soonest first.
    pub fn list_appointments_by_state_from(
        &self,
        state: AppointmentState,
        from: DateTime<Utc>,
    ) -> DbResult<Vec<Appointment>> {
        self.query_appointments(
            &format!(
                "SELECT {} FROM appointments WHERE state = ?1 AND scheduled_at >= ?2 ORDER BY scheduled_at",
                APPOINTMENT_COLUMNS
            ),
            params![state.as_str(), ts_to_sql(&from)],
        )
    }

    /// Upcoming, non-cancelled appointments whose reminder has not gone out.
    pub fn list_pending_reminders(&self, now: DateTime<Utc>) -> DbResult<Vec<Appointment>> {
        self.query_appointments(
            &format!(
                "SELECT {} FROM appointments WHERE scheduled_at > ?1 AND reminder_sent = 0 AND state != ?2 ORDER BY scheduled_at",
                APPOINTMENT_COLUMNS
            ),
            params![ts_to_sql(&now), AppointmentState::Cancelled.as_str()],
        )
    }

    pub fn list_appointments_for_pet(&self, pet_id: &str) -> DbResult<Vec<Appointment>> {
        self.query_appointments(
            &format!(
                "SELECT {} FROM appointments WHERE pet_id = ?1 ORDER BY scheduled_at DESC",
                APPOINTMENT_COLUMNS
            ),
            params![pet_id],
        )
    }

    fn query_appointments<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> DbResult<Vec<Appointment>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, AppointmentRow::from_row)?;

        let mut appointments = Vec::new();
        for row in rows {
            appointments.push(row?.try_into()?);
        }
        Ok(appointments)
    }
}

/// Intermediate row struct for database mapping.
struct AppointmentRow {
    id: String,
    pet_id: String,
    vet_id: Option<String>,
    scheduled_at: String,
    reason: String,
    kind: Option<String>,
    state: String,
    duration_minutes: u32,
    notes: Option<String>,
    fee: Option<String>,
    reminder_sent: bool,
}

impl AppointmentRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            pet_id: row.get(1)?,
            vet_id: row.get(2)?,
            scheduled_at: row.get(3)?,
            reason: row.get(4)?,
            kind: row.get(5)?,
            state: row.get(6)?,
            duration_minutes: row.get(7)?,
            notes: row.get(8)?,
            fee: row.get(9)?,
            reminder_sent: row.get(10)?,
        })
    }
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = DbError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        Ok(Appointment {
            scheduled_at: parse_ts(&row.scheduled_at)?,
            state: parse_wire(&row.state, "appointment state")?,
            fee: parse_opt_decimal(row.fee)?,
            id: row.id,
            pet_id: row.pet_id,
            vet_id: row.vet_id,
            reason: row.reason,
            kind: row.kind,
            duration_minutes: row.duration_minutes,
            notes: row.notes,
            reminder_sent: row.reminder_sent,
        })
    }
}
