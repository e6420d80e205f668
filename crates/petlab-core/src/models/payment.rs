//! Payments, including per-day hospitalization billing.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

wire_enum! {
    pub enum PaymentState {
        Pending => "PENDING" | "PENDIENTE",
        Partial => "PARTIAL" | "PARCIAL",
        Paid => "PAID" | "PAGADO",
        Cancelled => "CANCELLED" | "CANCELADO",
    }
}

/// Hospitalization stay billed per elapsed day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Hospitalization {
    pub started_at: DateTime<Utc>,
    /// None while the pet is still admitted
    pub ended_at: Option<DateTime<Utc>>,
    pub daily_rate: Decimal,
    /// Billable days, derived
    pub days: u32,
}

impl Hospitalization {
    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: String,
    pub number: String,
    pub owner_id: String,
    pub pet_id: Option<String>,
    pub concept: String,
    /// Consultation, hospitalization, surgery...
    pub kind: Option<String>,
    pub amount: Decimal,
    pub amount_paid: Decimal,
    pub method: Option<String>,
    pub state: PaymentState,
    pub issued_on: NaiveDate,
    pub due_on: Option<NaiveDate>,
    pub paid_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub hospitalization: Option<Hospitalization>,
}

impl Payment {
    pub fn balance(&self) -> Decimal {
        self.amount - self.amount_paid
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.state == PaymentState::Pending && self.due_on.is_some_and(|due| today > due)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewHospitalization {
    /// Defaults to now
    pub started_at: Option<DateTime<Utc>>,
    pub daily_rate: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewPayment {
    pub owner_id: String,
    pub pet_id: Option<String>,
    pub concept: String,
    pub kind: Option<String>,
    /// Ignored for hospitalizations, where it is derived from the stay
    pub amount: Decimal,
    pub due_on: Option<NaiveDate>,
    pub notes: Option<String>,
    pub hospitalization: Option<NewHospitalization>,
}
