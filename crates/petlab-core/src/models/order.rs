//! Clinical orders.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

wire_enum! {
    /// Order lifecycle state.
    ///
    /// `Pending → InProgress → Completed`, with `Cancelled` reachable from
    /// either open state.
    pub enum OrderState {
        Pending => "PENDIENTE" | "PENDING",
        InProgress => "EN_PROCESO" | "IN_PROGRESS",
        Completed => "COMPLETADA" | "COMPLETED",
        Cancelled => "CANCELADA" | "CANCELLED",
    }
}

impl OrderState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderState::Completed | OrderState::Cancelled)
    }
}

wire_enum! {
    /// Clinical priority of an order.
    pub enum Priority {
        Low => "LOW" | "BAJA",
        Normal => "NORMAL",
        High => "HIGH" | "ALTA",
        Urgent => "URGENT" | "URGENTE",
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

/// A diagnostic exam request for one pet, signed by one veterinarian.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: String,
    pub pet_id: String,
    pub vet_id: String,
    /// Exam requested (e.g., "Hemograma", "Bioquímica")
    pub exam_type: String,
    pub priority: Priority,
    pub state: OrderState,
    pub ordered_on: NaiveDate,
    pub observations: Option<String>,
    pub presumptive_diagnosis: Option<String>,
    pub symptoms: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Caller input for creating an order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewOrder {
    pub pet_id: String,
    pub vet_id: String,
    pub exam_type: String,
    /// Defaults to NORMAL
    pub priority: Option<Priority>,
    /// Defaults to today
    pub ordered_on: Option<NaiveDate>,
    pub observations: Option<String>,
    pub presumptive_diagnosis: Option<String>,
    pub symptoms: Option<String>,
}

impl NewOrder {
    pub fn new(pet_id: impl Into<String>, vet_id: impl Into<String>, exam_type: impl Into<String>) -> Self {
        Self {
            pet_id: pet_id.into(),
            vet_id: vet_id.into(),
            exam_type: exam_type.into(),
            ..Default::default()
        }
    }
}
