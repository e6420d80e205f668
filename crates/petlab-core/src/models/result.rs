//! Exam results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The recorded outcome of analyzing an order's sample.
///
/// Validation (professional sign-off) must precede delivery to the owner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExamResult {
    pub id: String,
    pub order_id: String,
    pub recorded_at: DateTime<Utc>,
    pub description: Option<String>,
    /// Measured values, free text or structured
    pub values: Option<String>,
    pub reference_values: Option<String>,
    pub conclusions: Option<String>,
    pub recommendations: Option<String>,
    pub method: Option<String>,
    pub technical_notes: Option<String>,
    pub validated: bool,
    pub validated_at: Option<DateTime<Utc>>,
    pub delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl ExamResult {
    pub fn awaiting_delivery(&self) -> bool {
        self.validated && !self.delivered
    }
}

/// Caller payload for registering a result.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewResult {
    pub description: Option<String>,
    pub values: Option<String>,
    pub reference_values: Option<String>,
    pub conclusions: Option<String>,
    pub recommendations: Option<String>,
    pub method: Option<String>,
    pub technical_notes: Option<String>,
    /// Defaults to now
    pub recorded_at: Option<DateTime<Utc>>,
    /// Ignored on registration; only validation may set it.
    #[serde(default)]
    pub validated: bool,
    /// Ignored on registration.
    #[serde(default)]
    pub delivered: bool,
}
