//! Sample collection records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

wire_enum! {
    pub enum SampleState {
        Scheduled => "SCHEDULED" | "PROGRAMADA",
        Taken => "TAKEN" | "REALIZADA",
        Processing => "PROCESSING" | "PROCESANDO",
        Done => "DONE" | "COMPLETADA",
    }
}

/// The specimen record for an order (one per order).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SampleCollection {
    pub id: String,
    pub order_id: String,
    pub technician_id: String,
    /// Globally unique specimen label
    pub sample_code: String,
    /// Specimen kind (e.g., "Sangre", "Orina")
    pub sample_type: String,
    pub collection_method: Option<String>,
    pub volume: Option<String>,
    pub conditions: Option<String>,
    pub notes: Option<String>,
    pub state: SampleState,
    pub scheduled_at: DateTime<Utc>,
    pub taken_at: Option<DateTime<Utc>>,
}

impl SampleCollection {
    /// When the specimen was obtained, or the scheduled time if not yet recorded.
    pub fn collected_at(&self) -> DateTime<Utc> {
        self.taken_at.unwrap_or(self.scheduled_at)
    }
}

/// Caller input for scheduling a sample collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewSample {
    pub technician_id: String,
    pub sample_type: String,
    pub collection_method: Option<String>,
    pub volume: Option<String>,
    pub conditions: Option<String>,
    pub notes: Option<String>,
    /// Defaults to now
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl NewSample {
    pub fn new(technician_id: impl Into<String>, sample_type: impl Into<String>) -> Self {
        Self {
            technician_id: technician_id.into(),
            sample_type: sample_type.into(),
            ..Default::default()
        }
    }
}
