//! Appointment alert integration tests.

use chrono::{Duration, TimeZone, Utc};
use petlab_core::appointments::{tier, AppointmentService};
use petlab_core::db::Database;
use petlab_core::error::{LabError, TransitionError};
use petlab_core::models::{AlertTier, AppointmentState, NewAppointment, Owner, Pet};
use petlab_core::{Clock, FixedClock, LabConfig};

fn pet(db: &Database) -> String {
    let owner = Owner::new("70011122".into(), "Rosa".into(), "Huamán".into());
    db.insert_owner(&owner).unwrap();
    let pet = Pet::new(owner.id, "Toby".into(), "canine".into());
    db.insert_pet(&pet).unwrap();
    pet.id
}

fn booking(pet_id: &str, at: chrono::DateTime<Utc>) -> NewAppointment {
    NewAppointment {
        pet_id: pet_id.into(),
        scheduled_at: Some(at),
        reason: "Vacunación".into(),
        ..Default::default()
    }
}

#[test]
fn test_tier_boundaries() {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    assert_eq!(tier(now, now - Duration::seconds(1)), AlertTier::Overdue);
    assert_eq!(tier(now, now), AlertTier::Critical);
    assert_eq!(tier(now, now + Duration::hours(1)), AlertTier::Critical);
    assert_eq!(tier(now, now + Duration::minutes(61)), AlertTier::High);
    assert_eq!(tier(now, now + Duration::hours(6)), AlertTier::High);
    assert_eq!(tier(now, now + Duration::hours(24)), AlertTier::Medium);
    assert_eq!(tier(now, now + Duration::hours(25)), AlertTier::Low);
}

#[test]
fn test_dashboard_views() {
    let db = Database::open_in_memory().unwrap();
    let pet_id = pet(&db);
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
    let config = LabConfig::default();
    let service = AppointmentService::new(&db, &clock, &config);
    let now = clock.now();

    let soon = service.schedule(booking(&pet_id, now + Duration::minutes(40))).unwrap();
    let afternoon = service.schedule(booking(&pet_id, now + Duration::hours(5))).unwrap();
    let tomorrow = service.schedule(booking(&pet_id, now + Duration::hours(30))).unwrap();
    let dropped = service.schedule(booking(&pet_id, now + Duration::hours(2))).unwrap();
    service.confirm(&afternoon.id).unwrap();
    service.cancel(&dropped.id, "Dueño no puede asistir").unwrap();

    let dashboard = service.dashboard().unwrap();
    let ids = |list: &[petlab_core::Appointment]| -> Vec<String> {
        list.iter().map(|a| a.id.clone()).collect()
    };
    assert_eq!(ids(&dashboard.critical), vec![soon.id.clone()]);
    assert_eq!(
        ids(&dashboard.upcoming),
        vec![soon.id.clone(), afternoon.id.clone()]
    );
    assert_eq!(
        ids(&dashboard.today),
        vec![soon.id.clone(), afternoon.id.clone()]
    );
    assert_eq!(
        ids(&dashboard.pending_confirmation),
        vec![soon.id.clone(), tomorrow.id.clone()]
    );

    let alerts = service.alerts().unwrap();
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0].tier, AlertTier::Critical);
    assert_eq!(alerts[1].tier, AlertTier::High);
}

#[test]
fn test_closed_appointments_reject_transitions() {
    let db = Database::open_in_memory().unwrap();
    let pet_id = pet(&db);
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
    let config = LabConfig::default();
    let service = AppointmentService::new(&db, &clock, &config);

    let appt = service
        .schedule(booking(&pet_id, clock.now() + Duration::hours(1)))
        .unwrap();
    let cancelled = service.cancel(&appt.id, "Reprogramada").unwrap();
    assert_eq!(cancelled.state, AppointmentState::Cancelled);
    assert!(cancelled
        .notes
        .as_deref()
        .is_some_and(|n| n.contains("Cancelada: Reprogramada")));

    assert!(matches!(
        service.confirm(&appt.id),
        Err(LabError::IllegalTransition(TransitionError::AppointmentClosed { .. }))
    ));
}

#[test]
fn test_past_appointment_rejected() {
    let db = Database::open_in_memory().unwrap();
    let pet_id = pet(&db);
    let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
    let config = LabConfig::default();
    let service = AppointmentService::new(&db, &clock, &config);

    assert!(matches!(
        service.schedule(booking(&pet_id, clock.now() - Duration::minutes(5))),
        Err(LabError::Validation(_))
    ));
    assert!(matches!(
        service.schedule(booking("missing", clock.now() + Duration::hours(1))),
        Err(LabError::NotFound(_))
    ));
}
