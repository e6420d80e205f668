//! Appointment scheduling and the staff alert dashboard.

mod classifier;

pub use classifier::*;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::clock::Clock;
use crate::config::LabConfig;
use crate::db::Database;
use crate::error::{LabError, LabResult, TransitionError};
use crate::models::{new_id, AlertTier, Appointment, AppointmentState, NewAppointment};

/// An appointment with its computed urgency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppointmentAlert {
    pub appointment: Appointment,
    pub tier: AlertTier,
    pub hours_until: f64,
}

/// The three alert views plus unconfirmed bookings, each sorted by time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AlertDashboard {
    /// Within the next hour
    pub critical: Vec<Appointment>,
    /// Within the next 24 hours
    pub upcoming: Vec<Appointment>,
    /// Same calendar date as now
    pub today: Vec<Appointment>,
    pub pending_confirmation: Vec<Appointment>,
}

pub struct AppointmentService<'a> {
    db: &'a Database,
    clock: &'a dyn Clock,
    config: &'a LabConfig,
}

impl<'a> AppointmentService<'a> {
    pub fn new(db: &'a Database, clock: &'a dyn Clock, config: &'a LabConfig) -> Self {
        Self { db, clock, config }
    }

    /// Book an appointment. It must not be in the past.
    pub fn schedule(&self, input: NewAppointment) -> LabResult<Appointment> {
        if input.reason.trim().is_empty() {
            return Err(LabError::validation("appointment reason is required"));
        }
        let scheduled_at = input
            .scheduled_at
            .ok_or_else(|| LabError::validation("appointment time is required"))?;
        if scheduled_at < self.clock.now() {
            return Err(LabError::validation("appointment time is in the past"));
        }
        if input.duration_minutes == Some(0) {
            return Err(LabError::validation("appointment duration must be positive"));
        }

        let appointment = Appointment {
            id: new_id(),
            pet_id: input.pet_id,
            vet_id: input.vet_id,
            scheduled_at,
            reason: input.reason.trim().to_string(),
            kind: input.kind,
            state: AppointmentState::Scheduled,
            duration_minutes: input
                .duration_minutes
                .unwrap_or(self.config.default_appointment_minutes),
            notes: input.notes,
            fee: input.fee,
            reminder_sent: false,
        };

        self.db.atomically(|db| -> LabResult<()> {
            if db.get_pet(&appointment.pet_id)?.is_none() {
                return Err(LabError::not_found("pet", &appointment.pet_id));
            }
            if let Some(vet_id) = &appointment.vet_id {
                if db.get_veterinarian(vet_id)?.is_none() {
                    return Err(LabError::not_found("veterinarian", vet_id));
                }
            }
            db.insert_appointment(&appointment)?;
            Ok(())
        })?;

        info!(appointment_id = %appointment.id, at = %appointment.scheduled_at, "appointment scheduled");
        Ok(appointment)
    }

    pub fn confirm(&self, id: &str) -> LabResult<Appointment> {
        self.transition(id, AppointmentState::Confirmed, |_| {})
    }

    pub fn start(&self, id: &str) -> LabResult<Appointment> {
        self.transition(id, AppointmentState::InProgress, |_| {})
    }

    pub fn complete(&self, id: &str) -> LabResult<Appointment> {
        self.transition(id, AppointmentState::Done, |_| {})
    }

    /// Cancel, appending the reason to the notes.
    pub fn cancel(&self, id: &str, reason: &str) -> LabResult<Appointment> {
        let line = format!("Cancelada: {}", reason.trim());
        self.transition(id, AppointmentState::Cancelled, move |appt| {
            appt.notes = Some(match appt.notes.take() {
                Some(notes) if !notes.is_empty() => format!("{}\n{}", notes, line),
                _ => line,
            });
        })
    }

    pub fn mark_reminder_sent(&self, id: &str) -> LabResult<Appointment> {
        self.db.atomically(|db| -> LabResult<Appointment> {
            let mut appt = db
                .get_appointment(id)?
                .ok_or_else(|| LabError::not_found("appointment", id))?;
            appt.reminder_sent = true;
            db.update_appointment(&appt)?;
            Ok(appt)
        })
    }

    pub fn get(&self, id: &str) -> LabResult<Appointment> {
        self.db
            .get_appointment(id)?
            .ok_or_else(|| LabError::not_found("appointment", id))
    }

    pub fn dashboard(&self) -> LabResult<AlertDashboard> {
        let now = self.clock.now();
        let upcoming = self
            .db
            .list_active_appointments_between(now, now + Duration::hours(24))?;
        let critical = upcoming
            .iter()
            .filter(|a| tier(now, a.scheduled_at) == AlertTier::Critical)
            .cloned()
            .collect();

        let today = self.clock.today();
        let start = today.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
        let end = start + Duration::days(1) - Duration::microseconds(1);
        let today = self.db.list_active_appointments_between(start, end)?;

        let pending_confirmation = self
            .db
            .list_appointments_by_state_from(AppointmentState::Scheduled, now)?;

        Ok(AlertDashboard {
            critical,
            upcoming,
            today,
            pending_confirmation,
        })
    }

    /// Every appointment that currently needs an alert, with its tier.
    pub fn alerts(&self) -> LabResult<Vec<AppointmentAlert>> {
        let now = self.clock.now();
        let window = self
            .db
            .list_active_appointments_between(now, now + Duration::hours(24))?;
        Ok(window
            .into_iter()
            .filter(|a| needs_alert(now, a))
            .map(|a| AppointmentAlert {
                tier: tier(now, a.scheduled_at),
                hours_until: hours_until(now, a.scheduled_at),
                appointment: a,
            })
            .collect())
    }

    /// Appointment history of one pet, most recent first.
    pub fn for_pet(&self, pet_id: &str) -> LabResult<Vec<Appointment>> {
        if self.db.get_pet(pet_id)?.is_none() {
            return Err(LabError::not_found("pet", pet_id));
        }
        Ok(self.db.list_appointments_for_pet(pet_id)?)
    }

    pub fn reminders_due(&self) -> LabResult<Vec<Appointment>> {
        Ok(self.db.list_pending_reminders(self.clock.now())?)
    }

    pub fn overdue(&self) -> LabResult<Vec<Appointment>> {
        Ok(self.db.list_overdue_appointments(self.clock.now())?)
    }

    fn transition<F>(&self, id: &str, target: AppointmentState, edit: F) -> LabResult<Appointment>
    where
        F: FnOnce(&mut Appointment),
    {
        let (appt, previous) = self.db.atomically(|db| -> LabResult<(Appointment, AppointmentState)> {
            let mut appt = db
                .get_appointment(id)?
                .ok_or_else(|| LabError::not_found("appointment", id))?;
            if appt.state.is_terminal() {
                return Err(TransitionError::AppointmentClosed {
                    appointment_id: appt.id,
                    state: appt.state.to_string(),
                }
                .into());
            }
            let previous = appt.state;
            appt.state = target;
            edit(&mut appt);
            db.update_appointment(&appt)?;
            Ok((appt, previous))
        })?;

        info!(appointment_id = %appt.id, from = %previous, to = %target, "appointment state changed");
        Ok(appt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::db::test_support::seed;
    use chrono::{TimeZone, Utc};

    fn new_appt(pet_id: &str, at: chrono::DateTime<Utc>) -> NewAppointment {
        NewAppointment {
            pet_id: pet_id.into(),
            scheduled_at: Some(at),
            reason: "Vacunación".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_schedule_defaults_and_past_rejection() {
        let db = Database::open_in_memory().unwrap();
        let seed = seed(&db);
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
        let config = LabConfig::default();
        let service = AppointmentService::new(&db, &clock, &config);

        let appt = service
            .schedule(new_appt(&seed.pet_id, clock.now() + Duration::hours(2)))
            .unwrap();
        assert_eq!(appt.state, AppointmentState::Scheduled);
        assert_eq!(appt.duration_minutes, 30);
        assert!(!appt.reminder_sent);

        let err = service
            .schedule(new_appt(&seed.pet_id, clock.now() - Duration::minutes(1)))
            .unwrap_err();
        assert!(matches!(err, LabError::Validation(_)));
    }

    #[test]
    fn test_cancel_appends_reason_and_closes() {
        let db = Database::open_in_memory().unwrap();
        let seed = seed(&db);
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
        let config = LabConfig::default();
        let service = AppointmentService::new(&db, &clock, &config);

        let mut input = new_appt(&seed.pet_id, clock.now() + Duration::hours(3));
        input.notes = Some("Traer carnet".into());
        let appt = service.schedule(input).unwrap();

        let cancelled = service.cancel(&appt.id, "owner travelling").unwrap();
        assert_eq!(cancelled.state, AppointmentState::Cancelled);
        assert_eq!(
            cancelled.notes.as_deref(),
            Some("Traer carnet\nCancelada: owner travelling")
        );

        let err = service.confirm(&appt.id).unwrap_err();
        assert!(matches!(
            err,
            LabError::IllegalTransition(TransitionError::AppointmentClosed { .. })
        ));
    }

    #[test]
    fn test_dashboard_views_are_consistent() {
        let db = Database::open_in_memory().unwrap();
        let seed = seed(&db);
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
        let config = LabConfig::default();
        let service = AppointmentService::new(&db, &clock, &config);

        let soon = service
            .schedule(new_appt(&seed.pet_id, clock.now() + Duration::minutes(30)))
            .unwrap();
        let later_today = service
            .schedule(new_appt(&seed.pet_id, clock.now() + Duration::hours(8)))
            .unwrap();
        let tomorrow = service
            .schedule(new_appt(&seed.pet_id, clock.now() + Duration::hours(20)))
            .unwrap();
        let next_week = service
            .schedule(new_appt(&seed.pet_id, clock.now() + Duration::days(7)))
            .unwrap();
        let cancelled = service
            .schedule(new_appt(&seed.pet_id, clock.now() + Duration::minutes(45)))
            .unwrap();
        service.cancel(&cancelled.id, "no show").unwrap();
        service.confirm(&later_today.id).unwrap();

        let dash = service.dashboard().unwrap();
        let ids = |v: &Vec<Appointment>| v.iter().map(|a| a.id.clone()).collect::<Vec<_>>();

        assert_eq!(ids(&dash.critical), vec![soon.id.clone()]);
        assert_eq!(
            ids(&dash.upcoming),
            vec![soon.id.clone(), later_today.id.clone(), tomorrow.id.clone()]
        );
        assert_eq!(ids(&dash.today), vec![soon.id.clone(), later_today.id.clone()]);
        assert_eq!(
            ids(&dash.pending_confirmation),
            vec![soon.id.clone(), tomorrow.id.clone(), next_week.id.clone()]
        );

        let alerts = service.alerts().unwrap();
        assert_eq!(alerts.len(), 3);
        assert_eq!(alerts[0].tier, AlertTier::Critical);
        assert_eq!(alerts[1].tier, AlertTier::Medium);
    }

    #[test]
    fn test_pet_history_includes_closed_appointments() {
        let db = Database::open_in_memory().unwrap();
        let seed = seed(&db);
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
        let config = LabConfig::default();
        let service = AppointmentService::new(&db, &clock, &config);

        let early = service
            .schedule(new_appt(&seed.pet_id, clock.now() + Duration::hours(2)))
            .unwrap();
        let late = service
            .schedule(new_appt(&seed.pet_id, clock.now() + Duration::days(3)))
            .unwrap();
        service.cancel(&early.id, "rescheduled").unwrap();

        let history = service.for_pet(&seed.pet_id).unwrap();
        let ids: Vec<_> = history.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec![late.id.as_str(), early.id.as_str()]);
        assert_eq!(history[1].state, AppointmentState::Cancelled);

        assert!(matches!(service.for_pet("ghost"), Err(LabError::NotFound(_))));
    }

    #[test]
    fn test_reminders_due() {
        let db = Database::open_in_memory().unwrap();
        let seed = seed(&db);
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
        let config = LabConfig::default();
        let service = AppointmentService::new(&db, &clock, &config);

        let a = service
            .schedule(new_appt(&seed.pet_id, clock.now() + Duration::hours(5)))
            .unwrap();
        let b = service
            .schedule(new_appt(&seed.pet_id, clock.now() + Duration::hours(6)))
            .unwrap();
        service.mark_reminder_sent(&a.id).unwrap();

        let due = service.reminders_due().unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, b.id);

        clock.advance(Duration::hours(7));
        assert!(service.reminders_due().unwrap().is_empty());
        assert_eq!(service.overdue().unwrap().len(), 2);
    }
}
