//! Appointment urgency classification.
//!
//! Every boundary is inclusive on the more urgent tier: exactly one hour
//! away is CRITICA, exactly six is ALTA, exactly 24 is MEDIA.

use chrono::{DateTime, Duration, Utc};

use crate::models::{AlertTier, Appointment, AppointmentState};

/// Signed hours from `now` until `at`, fractional. Negative once `at` has passed.
pub fn hours_until(now: DateTime<Utc>, at: DateTime<Utc>) -> f64 {
    (at - now).num_milliseconds() as f64 / 3_600_000.0
}

/// Tier of an appointment at `at`, seen from `now`.
pub fn tier(now: DateTime<Utc>, at: DateTime<Utc>) -> AlertTier {
    let remaining = at - now;
    if remaining < Duration::zero() {
        AlertTier::Overdue
    } else if remaining <= Duration::hours(1) {
        AlertTier::Critical
    } else if remaining <= Duration::hours(6) {
        AlertTier::High
    } else if remaining <= Duration::hours(24) {
        AlertTier::Medium
    } else {
        AlertTier::Low
    }
}

/// Within the next 24 hours, inclusive, and not cancelled.
pub fn needs_alert(now: DateTime<Utc>, appointment: &Appointment) -> bool {
    let remaining = appointment.scheduled_at - now;
    appointment.state != AppointmentState::Cancelled
        && remaining >= Duration::zero()
        && remaining <= Duration::hours(24)
}
