//! Operational KPIs over a date range.
//!
//! The KPI functions in [`kpi`] are pure: they read snapshot slices and never
//! touch the database. [`ReportService`] loads those snapshots.

mod kpi;

pub use kpi::*;

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::billing::recompute_invoice_totals;
use crate::config::LabConfig;
use crate::db::Database;
use crate::error::{LabError, LabResult};
use crate::models::{Order, SampleCollection};

/// Inclusive range of UTC calendar days.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> LabResult<Self> {
        if end < start {
            return Err(LabError::validation(format!(
                "range end {} precedes start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    pub fn day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

/// JSON rendering shared by every report record.
pub trait Report: Serialize {
    fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Sample-to-delivery time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TurnaroundReport {
    pub range: DateRange,
    /// Delivered results that could be paired with a sample
    pub samples: u32,
    pub average_hours: f64,
    pub average_days: f64,
    pub target_hours: f64,
    pub meets_target: bool,
}

/// Orders repeated for the same pet and exam type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RepeatReport {
    pub range: DateRange,
    pub total_orders: u32,
    /// (pet, exam type) groups with more than one order
    pub repeated_groups: u32,
    pub repeat_rate_percent: f64,
    pub target_percent: f64,
    pub meets_target: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RevenueReport {
    pub range: DateRange,
    pub invoice_count: u32,
    /// Non-void invoices issued in the range
    pub billed_total: Decimal,
    pub paid_total: Decimal,
    pub pending_total: Decimal,
    /// paid / billed × 100, zero when nothing was billed
    pub collection_rate_percent: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrdersByState {
    pub pending: u32,
    pub in_progress: u32,
    pub completed: u32,
    pub cancelled: u32,
    pub total: u32,
}

/// A count per label (exam type, species, staff member).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Breakdown {
    pub range: DateRange,
    pub total: u32,
    pub counts: BTreeMap<String, u32>,
}

/// Orders of one day that were completed that same day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SameDayReport {
    pub date: NaiveDate,
    pub total_orders: u32,
    pub completed: u32,
    pub percent: f64,
    pub target_percent: f64,
    pub meets_target: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabEfficiency {
    pub range: DateRange,
    pub turnaround: TurnaroundReport,
    pub repeats: RepeatReport,
    pub technician_workload: Breakdown,
}

impl Report for TurnaroundReport {}
impl Report for RepeatReport {}
impl Report for RevenueReport {}
impl Report for OrdersByState {}
impl Report for Breakdown {}
impl Report for SameDayReport {}
impl Report for LabEfficiency {}

/// Loads snapshots from the database and feeds them to the KPI functions.
pub struct ReportService<'a> {
    db: &'a Database,
    config: &'a LabConfig,
}

impl<'a> ReportService<'a> {
    pub fn new(db: &'a Database, config: &'a LabConfig) -> Self {
        Self { db, config }
    }

    pub fn turnaround(&self, range: DateRange) -> LabResult<TurnaroundReport> {
        let results = self
            .db
            .list_results_recorded_between(range.start, range.end)?;
        let mut samples: HashMap<String, SampleCollection> = HashMap::new();
        for result in &results {
            if samples.contains_key(&result.order_id) {
                continue;
            }
            if let Some(sample) = self.db.get_sample_for_order(&result.order_id)? {
                samples.insert(result.order_id.clone(), sample);
            }
        }
        let report = average_turnaround(
            range,
            &results,
            &samples,
            self.config.turnaround_target_hours,
        );
        debug!(samples = report.samples, average_hours = report.average_hours, "turnaround computed");
        Ok(report)
    }

    pub fn repeat_rate(&self, range: DateRange) -> LabResult<RepeatReport> {
        let orders = self.orders(range)?;
        Ok(repeat_rate(
            range,
            &orders,
            self.config.repeat_rate_target_percent,
        ))
    }

    pub fn revenue(&self, range: DateRange) -> LabResult<RevenueReport> {
        let mut invoices = self.db.list_invoices_between(range.start, range.end)?;
        for invoice in &mut invoices {
            recompute_invoice_totals(invoice, self.config.tax_rate)?;
        }
        let report = revenue(range, &invoices);
        debug!(billed = %report.billed_total, paid = %report.paid_total, "revenue computed");
        Ok(report)
    }

    /// Current counts over every order.
    pub fn orders_by_state(&self) -> LabResult<OrdersByState> {
        Ok(orders_by_state(&self.db.list_orders()?))
    }

    pub fn exams_by_type(&self, range: DateRange) -> LabResult<Breakdown> {
        Ok(exams_by_type(range, &self.orders(range)?))
    }

    pub fn species_seen(&self, range: DateRange) -> LabResult<Breakdown> {
        let orders = self.orders(range)?;
        let mut species: HashMap<String, String> = HashMap::new();
        for order in &orders {
            if species.contains_key(&order.pet_id) {
                continue;
            }
            if let Some(pet) = self.db.get_pet(&order.pet_id)? {
                species.insert(pet.id.clone(), pet.canonical_species());
            }
        }
        Ok(species_seen(range, &orders, &species))
    }

    pub fn vet_workload(&self, range: DateRange) -> LabResult<Breakdown> {
        let names = self
            .db
            .list_veterinarians()?
            .into_iter()
            .map(|v| (v.id, v.full_name))
            .collect();
        Ok(vet_workload(range, &self.orders(range)?, &names))
    }

    pub fn technician_workload(&self, range: DateRange) -> LabResult<Breakdown> {
        let names = self
            .db
            .list_technicians()?
            .into_iter()
            .map(|t| (t.id, t.full_name))
            .collect();
        let samples = self
            .db
            .list_samples_scheduled_between(range.start, range.end)?;
        Ok(technician_workload(range, &samples, &names))
    }

    pub fn same_day_completion(&self, day: NaiveDate) -> LabResult<SameDayReport> {
        let orders = self.db.list_orders_between(day, day)?;
        Ok(same_day_completion(
            day,
            &orders,
            self.config.same_day_target_percent,
        ))
    }

    pub fn lab_efficiency(&self, range: DateRange) -> LabResult<LabEfficiency> {
        Ok(LabEfficiency {
            range,
            turnaround: self.turnaround(range)?,
            repeats: self.repeat_rate(range)?,
            technician_workload: self.technician_workload(range)?,
        })
    }

    fn orders(&self, range: DateRange) -> LabResult<Vec<Order>> {
        Ok(self.db.list_orders_between(range.start, range.end)?)
    }
}
