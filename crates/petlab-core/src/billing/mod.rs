//! Billing engine: invoices with derived totals, and payments with per-day
//! hospitalization billing.
//!
//! Invoice totals are never read from storage or from callers. They are
//! recomputed from the line items whenever an invoice is loaded or its
//! items change.

mod invoices;
mod payments;
mod totals;

pub use invoices::*;
pub use totals::*;

use crate::clock::Clock;
use crate::config::LabConfig;
use crate::db::Database;

pub struct BillingEngine<'a> {
    db: &'a Database,
    clock: &'a dyn Clock,
    config: &'a LabConfig,
}

impl<'a> BillingEngine<'a> {
    pub fn new(db: &'a Database, clock: &'a dyn Clock, config: &'a LabConfig) -> Self {
        Self { db, clock, config }
    }
}
