//! Appointments.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

wire_enum! {
    pub enum AppointmentState {
        Scheduled => "SCHEDULED" | "PROGRAMADA",
        Confirmed => "CONFIRMED" | "CONFIRMADA",
        InProgress => "IN_PROGRESS" | "EN_CURSO",
        Done => "DONE" | "COMPLETADA",
        Cancelled => "CANCELLED" | "CANCELADA",
    }
}

impl AppointmentState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentState::Done | AppointmentState::Cancelled)
    }
}

wire_enum! {
    /// Urgency of an appointment by time remaining, most urgent first.
    pub enum AlertTier {
        Overdue => "VENCIDA",
        Critical => "CRITICA",
        High => "ALTA",
        Medium => "MEDIA",
        Low => "BAJA",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: String,
    pub pet_id: String,
    pub vet_id: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub reason: String,
    /// Consultation, vaccination, control, surgery, emergency...
    pub kind: Option<String>,
    pub state: AppointmentState,
    pub duration_minutes: u32,
    pub notes: Option<String>,
    pub fee: Option<Decimal>,
    pub reminder_sent: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewAppointment {
    pub pet_id: String,
    pub vet_id: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub reason: String,
    pub kind: Option<String>,
    /// Defaults to the configured appointment length
    pub duration_minutes: Option<u32>,
    pub notes: Option<String>,
    pub fee: Option<Decimal>,
}
