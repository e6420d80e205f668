//! PetLab Core Library
//!
//! Business rules for a veterinary diagnostic laboratory: clinical orders,
//! sample collection, result validation and delivery, appointments with
//! urgency alerts, invoicing and hospitalization billing, and operational KPIs.
//!
//! # Architecture
//!
//! ```text
//!  Order ──► Sample ──► Result ──► Validated ──► Delivered
//!    │          (OrderLifecycle, events → Notifier)
//!    │
//!    ├──► Invoice / Payment (BillingEngine)
//!    │
//!    └──► Snapshots ──► KPI reports (ReportService)
//!
//!  Appointment ──► AlertTier (classifier) ──► AlertDashboard
//! ```
//!
//! Every mutating operation runs as one SQLite unit of work. Time comes from
//! an injected [`Clock`] so that alerts, hospitalization charges, and reports
//! are reproducible.
//!
//! # Modules
//!
//! - [`db`]: SQLite persistence and range queries
//! - [`models`]: Domain types and the closed state vocabularies
//! - [`lifecycle`]: Order → sample → result → validation → delivery
//! - [`appointments`]: Scheduling and alert tiers
//! - [`billing`]: Invoices, payments, hospitalization charges
//! - [`reports`]: Turnaround, repeat rate, revenue and workload KPIs
//! - [`inventory`]: Stock adjustments and expiry views

pub mod appointments;
pub mod billing;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod inventory;
pub mod lifecycle;
pub mod models;
pub mod notify;
pub mod reports;

// Re-export commonly used types
pub use appointments::{AlertDashboard, AppointmentAlert, AppointmentService};
pub use billing::{round_money, BillingEngine, SalesSummary};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::LabConfig;
pub use db::Database;
pub use error::{LabError, LabResult, TransitionError};
pub use inventory::{InventoryService, StockOperation};
pub use lifecycle::{OrderDetails, OrderLifecycle};
pub use models::{
    AlertTier, Appointment, AppointmentState, ExamResult, Invoice, InvoiceState, Order,
    OrderState, Payment, PaymentState, Priority, SampleCollection, SampleState,
};
pub use notify::{LabEvent, LogNotifier, Notifier, RecordingNotifier};
pub use reports::{DateRange, Report, ReportService};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum PetLabError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Illegal state transition: {0}")]
    IllegalTransition(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<LabError> for PetLabError {
    fn from(e: LabError) -> Self {
        let msg = e.to_string();
        match e {
            LabError::Validation(_) => PetLabError::InvalidInput(msg),
            LabError::NotFound(_) => PetLabError::NotFound(msg),
            LabError::Conflict(_) | LabError::InsufficientStock { .. } => {
                PetLabError::Conflict(msg)
            }
            LabError::IllegalTransition(_) => PetLabError::IllegalTransition(msg),
            LabError::Database(_) => PetLabError::DatabaseError(msg),
        }
    }
}

impl From<db::DbError> for PetLabError {
    fn from(e: db::DbError) -> Self {
        LabError::from(e).into()
    }
}

impl From<serde_json::Error> for PetLabError {
    fn from(e: serde_json::Error) -> Self {
        PetLabError::SerializationError(e.to_string())
    }
}

impl From<anyhow::Error> for PetLabError {
    fn from(e: anyhow::Error) -> Self {
        PetLabError::InvalidInput(format!("{:#}", e))
    }
}

impl<T> From<std::sync::PoisonError<T>> for PetLabError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        PetLabError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a database at the given path. An empty `config_json`
/// uses the default configuration.
#[uniffi::export]
pub fn open_database(path: String, config_json: String) -> Result<Arc<PetLabCore>, PetLabError> {
    let config = if config_json.trim().is_empty() {
        LabConfig::default()
    } else {
        LabConfig::from_json_str(&config_json)?
    };
    let db = Database::open(&path)?;
    Ok(Arc::new(PetLabCore::new(db, config)))
}

/// Create an in-memory database (for testing).
#[uniffi::export]
pub fn open_database_in_memory() -> Result<Arc<PetLabCore>, PetLabError> {
    let db = Database::open_in_memory()?;
    Ok(Arc::new(PetLabCore::new(db, LabConfig::default())))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe handle over the database and services for FFI.
#[derive(uniffi::Object)]
pub struct PetLabCore {
    db: Mutex<Database>,
    clock: SystemClock,
    notifier: LogNotifier,
    config: LabConfig,
}

impl PetLabCore {
    fn new(db: Database, config: LabConfig) -> Self {
        Self {
            db: Mutex::new(db),
            clock: SystemClock,
            notifier: LogNotifier,
            config,
        }
    }
}

#[uniffi::export]
impl PetLabCore {
    // =========================================================================
    // Registry
    // =========================================================================

    pub fn create_owner(
        &self,
        document_id: String,
        first_names: String,
        last_names: String,
    ) -> Result<String, PetLabError> {
        let db = self.db.lock()?;
        let owner = models::Owner::new(document_id, first_names, last_names);
        db.insert_owner(&owner)?;
        Ok(owner.id)
    }

    pub fn create_pet(
        &self,
        owner_id: String,
        name: String,
        species: String,
    ) -> Result<String, PetLabError> {
        let db = self.db.lock()?;
        let pet = models::Pet::new(owner_id, name, species);
        db.insert_pet(&pet)?;
        Ok(pet.id)
    }

    pub fn create_veterinarian(&self, full_name: String) -> Result<String, PetLabError> {
        let db = self.db.lock()?;
        let vet = models::Veterinarian::new(full_name);
        db.insert_veterinarian(&vet)?;
        Ok(vet.id)
    }

    pub fn create_technician(&self, full_name: String) -> Result<String, PetLabError> {
        let db = self.db.lock()?;
        let tech = models::Technician::new(full_name);
        db.insert_technician(&tech)?;
        Ok(tech.id)
    }

    // =========================================================================
    // Order Lifecycle
    // =========================================================================

    /// Create an order. `priority` accepts any spelling of the priority set.
    pub fn create_order(
        &self,
        pet_id: String,
        vet_id: String,
        exam_type: String,
        priority: Option<String>,
    ) -> Result<FfiOrder, PetLabError> {
        let db = self.db.lock()?;
        let mut input = models::NewOrder::new(pet_id, vet_id, exam_type);
        input.priority = priority.map(|p| p.parse::<Priority>()).transpose()?;
        let order = self.lifecycle(&db).create_order(input)?;
        Ok(order.into())
    }

    pub fn schedule_sample(
        &self,
        order_id: String,
        technician_id: String,
        sample_type: String,
        scheduled_at: Option<String>,
    ) -> Result<FfiSample, PetLabError> {
        let db = self.db.lock()?;
        let mut input = models::NewSample::new(technician_id, sample_type);
        input.scheduled_at = scheduled_at.as_deref().map(parse_timestamp).transpose()?;
        let sample = self.lifecycle(&db).schedule_sample(&order_id, input)?;
        Ok(sample.into())
    }

    pub fn mark_sample_taken(&self, sample_id: String) -> Result<FfiSample, PetLabError> {
        let db = self.db.lock()?;
        Ok(self.lifecycle(&db).mark_sample_taken(&sample_id)?.into())
    }

    pub fn register_result(
        &self,
        order_id: String,
        values: Option<String>,
        conclusions: Option<String>,
    ) -> Result<FfiResult, PetLabError> {
        let db = self.db.lock()?;
        let input = models::NewResult {
            values,
            conclusions,
            ..Default::default()
        };
        Ok(self.lifecycle(&db).register_result(&order_id, input)?.into())
    }

    pub fn validate_result(&self, result_id: String) -> Result<FfiResult, PetLabError> {
        let db = self.db.lock()?;
        Ok(self.lifecycle(&db).validate_result(&result_id)?.into())
    }

    pub fn deliver_result(&self, result_id: String) -> Result<FfiResult, PetLabError> {
        let db = self.db.lock()?;
        Ok(self.lifecycle(&db).deliver_result(&result_id)?.into())
    }

    /// Operational override of the order state.
    pub fn change_order_state(
        &self,
        order_id: String,
        new_state: String,
    ) -> Result<FfiOrder, PetLabError> {
        let db = self.db.lock()?;
        Ok(self.lifecycle(&db).change_state(&order_id, &new_state)?.into())
    }

    /// Order, sample, and results as JSON.
    pub fn order_details_json(&self, order_id: String) -> Result<String, PetLabError> {
        let db = self.db.lock()?;
        let details = self.lifecycle(&db).order_details(&order_id)?;
        Ok(serde_json::to_string(&details)?)
    }

    // =========================================================================
    // Appointments
    // =========================================================================

    pub fn schedule_appointment(
        &self,
        pet_id: String,
        scheduled_at: String,
        reason: String,
    ) -> Result<FfiAppointment, PetLabError> {
        let db = self.db.lock()?;
        let input = models::NewAppointment {
            pet_id,
            scheduled_at: Some(parse_timestamp(&scheduled_at)?),
            reason,
            ..Default::default()
        };
        let service = AppointmentService::new(&db, &self.clock, &self.config);
        Ok(service.schedule(input)?.into())
    }

    pub fn appointment_dashboard(&self) -> Result<FfiAlertDashboard, PetLabError> {
        let db = self.db.lock()?;
        let service = AppointmentService::new(&db, &self.clock, &self.config);
        Ok(service.dashboard()?.into())
    }

    // =========================================================================
    // Billing
    // =========================================================================

    pub fn create_invoice(
        &self,
        owner_id: String,
        line_items: Vec<FfiLineItemInput>,
    ) -> Result<FfiInvoice, PetLabError> {
        let db = self.db.lock()?;
        let line_items = line_items
            .into_iter()
            .map(models::NewLineItem::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let input = models::NewInvoice {
            owner_id,
            line_items,
            ..Default::default()
        };
        Ok(self.billing(&db).create_invoice(input)?.into())
    }

    pub fn pay_invoice(&self, invoice_id: String, method: String) -> Result<FfiInvoice, PetLabError> {
        let db = self.db.lock()?;
        Ok(self.billing(&db).mark_paid(&invoice_id, &method)?.into())
    }

    /// Create a payment. When `daily_rate` is set the payment is a
    /// hospitalization starting now and `amount` is ignored.
    pub fn create_payment(
        &self,
        owner_id: String,
        concept: String,
        amount: String,
        daily_rate: Option<String>,
    ) -> Result<FfiPayment, PetLabError> {
        let db = self.db.lock()?;
        let hospitalization = daily_rate
            .as_deref()
            .map(parse_money)
            .transpose()?
            .map(|daily_rate| models::NewHospitalization {
                started_at: None,
                daily_rate,
            });
        let input = models::NewPayment {
            owner_id,
            concept,
            amount: if hospitalization.is_some() {
                Decimal::ZERO
            } else {
                parse_money(&amount)?
            },
            hospitalization,
            ..Default::default()
        };
        Ok(self.billing(&db).create_payment(input)?.into())
    }

    pub fn register_payment(
        &self,
        payment_id: String,
        amount: String,
        method: String,
    ) -> Result<FfiPayment, PetLabError> {
        let db = self.db.lock()?;
        let amount = parse_money(&amount)?;
        Ok(self
            .billing(&db)
            .register_payment(&payment_id, amount, &method)?
            .into())
    }

    // =========================================================================
    // Reports
    // =========================================================================

    /// Dates are `YYYY-MM-DD`, both inclusive.
    pub fn turnaround_report(
        &self,
        start: String,
        end: String,
    ) -> Result<FfiTurnaroundReport, PetLabError> {
        let range = parse_range(&start, &end)?;
        let db = self.db.lock()?;
        let report = ReportService::new(&db, &self.config).turnaround(range)?;
        Ok(FfiTurnaroundReport {
            samples: report.samples,
            average_hours: report.average_hours,
            average_days: report.average_days,
            target_hours: report.target_hours,
            meets_target: report.meets_target,
        })
    }

    pub fn repeat_rate_report(
        &self,
        start: String,
        end: String,
    ) -> Result<FfiRepeatReport, PetLabError> {
        let range = parse_range(&start, &end)?;
        let db = self.db.lock()?;
        let report = ReportService::new(&db, &self.config).repeat_rate(range)?;
        Ok(FfiRepeatReport {
            total_orders: report.total_orders,
            repeated_groups: report.repeated_groups,
            repeat_rate_percent: report.repeat_rate_percent,
            target_percent: report.target_percent,
            meets_target: report.meets_target,
        })
    }

    pub fn revenue_report(
        &self,
        start: String,
        end: String,
    ) -> Result<FfiRevenueReport, PetLabError> {
        let range = parse_range(&start, &end)?;
        let db = self.db.lock()?;
        let report = ReportService::new(&db, &self.config).revenue(range)?;
        Ok(FfiRevenueReport {
            invoice_count: report.invoice_count,
            billed_total: report.billed_total.to_string(),
            paid_total: report.paid_total.to_string(),
            pending_total: report.pending_total.to_string(),
            collection_rate_percent: report.collection_rate_percent.to_string(),
        })
    }
}

impl PetLabCore {
    fn lifecycle<'a>(&'a self, db: &'a Database) -> OrderLifecycle<'a> {
        OrderLifecycle::new(db, &self.clock, &self.notifier, &self.config)
    }

    fn billing<'a>(&'a self, db: &'a Database) -> BillingEngine<'a> {
        BillingEngine::new(db, &self.clock, &self.config)
    }
}

// =========================================================================
// Boundary parsing
// =========================================================================

fn parse_money(raw: &str) -> Result<Decimal, PetLabError> {
    raw.trim()
        .parse::<Decimal>()
        .map_err(|e| PetLabError::InvalidInput(format!("invalid amount '{}': {}", raw, e)))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, PetLabError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| PetLabError::InvalidInput(format!("invalid timestamp '{}': {}", raw, e)))
}

fn parse_day(raw: &str) -> Result<NaiveDate, PetLabError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| PetLabError::InvalidInput(format!("invalid date '{}': {}", raw, e)))
}

fn parse_range(start: &str, end: &str) -> Result<DateRange, PetLabError> {
    Ok(DateRange::new(parse_day(start)?, parse_day(end)?)?)
}

fn format_ts(t: DateTime<Utc>) -> String {
    t.to_rfc3339()
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe order.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiOrder {
    pub id: String,
    pub pet_id: String,
    pub vet_id: String,
    pub exam_type: String,
    pub priority: String,
    pub state: String,
    pub ordered_on: String,
}

impl From<Order> for FfiOrder {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            pet_id: order.pet_id,
            vet_id: order.vet_id,
            exam_type: order.exam_type,
            priority: order.priority.to_string(),
            state: order.state.to_string(),
            ordered_on: order.ordered_on.to_string(),
        }
    }
}

/// FFI-safe sample collection.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSample {
    pub id: String,
    pub order_id: String,
    pub technician_id: String,
    pub sample_code: String,
    pub sample_type: String,
    pub state: String,
    pub scheduled_at: String,
    pub taken_at: Option<String>,
}

impl From<SampleCollection> for FfiSample {
    fn from(sample: SampleCollection) -> Self {
        Self {
            id: sample.id,
            order_id: sample.order_id,
            technician_id: sample.technician_id,
            sample_code: sample.sample_code,
            sample_type: sample.sample_type,
            state: sample.state.to_string(),
            scheduled_at: format_ts(sample.scheduled_at),
            taken_at: sample.taken_at.map(format_ts),
        }
    }
}

/// FFI-safe exam result.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiResult {
    pub id: String,
    pub order_id: String,
    pub recorded_at: String,
    pub values: Option<String>,
    pub conclusions: Option<String>,
    pub validated: bool,
    pub validated_at: Option<String>,
    pub delivered: bool,
    pub delivered_at: Option<String>,
}

impl From<ExamResult> for FfiResult {
    fn from(result: ExamResult) -> Self {
        Self {
            id: result.id,
            order_id: result.order_id,
            recorded_at: format_ts(result.recorded_at),
            values: result.values,
            conclusions: result.conclusions,
            validated: result.validated,
            validated_at: result.validated_at.map(format_ts),
            delivered: result.delivered,
            delivered_at: result.delivered_at.map(format_ts),
        }
    }
}

/// FFI-safe appointment.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAppointment {
    pub id: String,
    pub pet_id: String,
    pub scheduled_at: String,
    pub reason: String,
    pub state: String,
    pub duration_minutes: u32,
    pub reminder_sent: bool,
}

impl From<Appointment> for FfiAppointment {
    fn from(appointment: Appointment) -> Self {
        Self {
            id: appointment.id,
            pet_id: appointment.pet_id,
            scheduled_at: format_ts(appointment.scheduled_at),
            reason: appointment.reason,
            state: appointment.state.to_string(),
            duration_minutes: appointment.duration_minutes,
            reminder_sent: appointment.reminder_sent,
        }
    }
}

/// FFI-safe alert dashboard.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiAlertDashboard {
    pub critical: Vec<FfiAppointment>,
    pub upcoming: Vec<FfiAppointment>,
    pub today: Vec<FfiAppointment>,
    pub pending_confirmation: Vec<FfiAppointment>,
}

impl From<AlertDashboard> for FfiAlertDashboard {
    fn from(dashboard: AlertDashboard) -> Self {
        let convert = |list: Vec<Appointment>| -> Vec<FfiAppointment> {
            list.into_iter().map(Into::into).collect()
        };
        Self {
            critical: convert(dashboard.critical),
            upcoming: convert(dashboard.upcoming),
            today: convert(dashboard.today),
            pending_confirmation: convert(dashboard.pending_confirmation),
        }
    }
}

/// FFI-safe invoice line input. `unit_price` is a decimal string.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiLineItemInput {
    pub description: String,
    pub quantity: u32,
    pub unit_price: String,
    pub category: Option<String>,
}

impl TryFrom<FfiLineItemInput> for models::NewLineItem {
    type Error = PetLabError;

    fn try_from(item: FfiLineItemInput) -> Result<Self, Self::Error> {
        Ok(models::NewLineItem {
            description: item.description,
            quantity: item.quantity,
            unit_price: parse_money(&item.unit_price)?,
            category: item.category,
        })
    }
}

/// FFI-safe invoice with computed totals.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiInvoice {
    pub id: String,
    pub number: String,
    pub owner_id: String,
    pub issued_on: String,
    pub state: String,
    pub line_count: u32,
    pub subtotal: String,
    pub tax: String,
    pub total: String,
}

impl From<Invoice> for FfiInvoice {
    fn from(invoice: Invoice) -> Self {
        Self {
            id: invoice.id,
            number: invoice.number,
            owner_id: invoice.owner_id,
            issued_on: invoice.issued_on.to_string(),
            state: invoice.state.to_string(),
            line_count: invoice.line_items.len() as u32,
            subtotal: invoice.subtotal.to_string(),
            tax: invoice.tax.to_string(),
            total: invoice.total.to_string(),
        }
    }
}

/// FFI-safe payment.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPayment {
    pub id: String,
    pub number: String,
    pub owner_id: String,
    pub concept: String,
    pub amount: String,
    pub amount_paid: String,
    pub balance: String,
    pub state: String,
    pub hospitalization_days: Option<u32>,
}

impl From<Payment> for FfiPayment {
    fn from(payment: Payment) -> Self {
        Self {
            balance: payment.balance().to_string(),
            id: payment.id,
            number: payment.number,
            owner_id: payment.owner_id,
            concept: payment.concept,
            amount: payment.amount.to_string(),
            amount_paid: payment.amount_paid.to_string(),
            state: payment.state.to_string(),
            hospitalization_days: payment.hospitalization.map(|h| h.days),
        }
    }
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTurnaroundReport {
    pub samples: u32,
    pub average_hours: f64,
    pub average_days: f64,
    pub target_hours: f64,
    pub meets_target: bool,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRepeatReport {
    pub total_orders: u32,
    pub repeated_groups: u32,
    pub repeat_rate_percent: f64,
    pub target_percent: f64,
    pub meets_target: bool,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRevenueReport {
    pub invoice_count: u32,
    pub billed_total: String,
    pub paid_total: String,
    pub pending_total: String,
    pub collection_rate_percent: String,
}
