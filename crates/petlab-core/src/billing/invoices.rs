//! Invoice operations.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{generate_invoice_number, recompute_invoice_totals, BillingEngine};
use crate::db::Database;
use crate::error::{LabError, LabResult, TransitionError};
use crate::models::{Invoice, InvoiceState, NewInvoice, NewLineItem};

/// Aggregate of the non-void invoices issued in a period.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SalesSummary {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub invoice_count: u32,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub paid_total: Decimal,
    pub pending_total: Decimal,
}

impl<'a> BillingEngine<'a> {
    /// Create a PENDING invoice issued today. The number is generated unless
    /// the caller supplies one.
    pub fn create_invoice(&self, input: NewInvoice) -> LabResult<Invoice> {
        let items = input
            .line_items
            .into_iter()
            .map(NewLineItem::into_line_item)
            .collect::<LabResult<Vec<_>>>()?;
        let today = self.clock.today();

        let invoice = self.db.atomically(|db| -> LabResult<Invoice> {
            if db.get_owner(&input.owner_id)?.is_none() {
                return Err(LabError::not_found("owner", &input.owner_id));
            }
            let number = match input.number {
                Some(number) if !number.trim().is_empty() => number.trim().to_string(),
                _ => self.next_invoice_number(db, today.year())?,
            };
            if db.invoice_number_exists(&number)? {
                return Err(LabError::Conflict(format!("invoice number {} already exists", number)));
            }

            let mut invoice = Invoice::new(number, input.owner_id, today);
            invoice.due_on = input.due_on;
            invoice.notes = input.notes;
            invoice.line_items = items;
            recompute_invoice_totals(&mut invoice, self.config.tax_rate)?;
            db.insert_invoice(&invoice)?;
            Ok(invoice)
        })?;

        info!(invoice_id = %invoice.id, number = %invoice.number, total = %invoice.total, "invoice created");
        Ok(invoice)
    }

    /// Load an invoice with freshly computed totals.
    pub fn get_invoice(&self, id: &str) -> LabResult<Invoice> {
        load_invoice(self.db, id, self.config.tax_rate)
    }

    pub fn add_line_item(&self, invoice_id: &str, input: NewLineItem) -> LabResult<Invoice> {
        let item = input.into_line_item()?;
        let invoice = self.db.atomically(|db| -> LabResult<Invoice> {
            let invoice = load_invoice(db, invoice_id, self.config.tax_rate)?;
            ensure_editable(&invoice)?;
            let position = db.next_line_position(invoice_id)?;
            db.insert_line_item(invoice_id, position, &item)?;
            load_invoice(db, invoice_id, self.config.tax_rate)
        })?;

        info!(invoice_id = %invoice_id, item_id = %item.id, total = %invoice.total, "line item added");
        Ok(invoice)
    }

    pub fn update_line_item(
        &self,
        invoice_id: &str,
        item_id: &str,
        input: NewLineItem,
    ) -> LabResult<Invoice> {
        let mut item = input.into_line_item()?;
        item.id = item_id.to_string();
        let invoice = self.db.atomically(|db| -> LabResult<Invoice> {
            let invoice = load_invoice(db, invoice_id, self.config.tax_rate)?;
            ensure_editable(&invoice)?;
            if !db.update_line_item(invoice_id, &item)? {
                return Err(LabError::not_found("line item", item_id));
            }
            load_invoice(db, invoice_id, self.config.tax_rate)
        })?;

        info!(invoice_id = %invoice_id, item_id = %item_id, total = %invoice.total, "line item updated");
        Ok(invoice)
    }

    pub fn remove_line_item(&self, invoice_id: &str, item_id: &str) -> LabResult<Invoice> {
        let invoice = self.db.atomically(|db| -> LabResult<Invoice> {
            let invoice = load_invoice(db, invoice_id, self.config.tax_rate)?;
            ensure_editable(&invoice)?;
            if !db.delete_line_item(invoice_id, item_id)? {
                return Err(LabError::not_found("line item", item_id));
            }
            load_invoice(db, invoice_id, self.config.tax_rate)
        })?;

        info!(invoice_id = %invoice_id, item_id = %item_id, total = %invoice.total, "line item removed");
        Ok(invoice)
    }

    pub fn mark_paid(&self, invoice_id: &str, method: &str) -> LabResult<Invoice> {
        if method.trim().is_empty() {
            return Err(LabError::validation("payment method is required"));
        }
        let today = self.clock.today();
        let invoice = self.db.atomically(|db| -> LabResult<Invoice> {
            let mut invoice = load_invoice(db, invoice_id, self.config.tax_rate)?;
            ensure_editable(&invoice)?;
            invoice.state = InvoiceState::Paid;
            invoice.payment_method = Some(method.trim().to_string());
            invoice.paid_on = Some(today);
            db.update_invoice(&invoice)?;
            Ok(invoice)
        })?;

        info!(invoice_id = %invoice.id, number = %invoice.number, total = %invoice.total, "invoice paid");
        Ok(invoice)
    }

    /// Void a pending invoice, appending the reason to its notes.
    pub fn void_invoice(&self, invoice_id: &str, reason: &str) -> LabResult<Invoice> {
        let invoice = self.db.atomically(|db| -> LabResult<Invoice> {
            let mut invoice = load_invoice(db, invoice_id, self.config.tax_rate)?;
            ensure_editable(&invoice)?;
            invoice.state = InvoiceState::Void;
            let line = format!("Anulada: {}", reason.trim());
            invoice.notes = Some(match invoice.notes.take() {
                Some(notes) if !notes.is_empty() => format!("{}\n{}", notes, line),
                _ => line,
            });
            db.update_invoice(&invoice)?;
            Ok(invoice)
        })?;

        info!(invoice_id = %invoice.id, number = %invoice.number, "invoice voided");
        Ok(invoice)
    }

    /// Delete an unpaid invoice and its line items.
    pub fn delete_invoice(&self, invoice_id: &str) -> LabResult<()> {
        self.db.atomically(|db| -> LabResult<()> {
            let invoice = db
                .get_invoice(invoice_id)?
                .ok_or_else(|| LabError::not_found("invoice", invoice_id))?;
            if invoice.state == InvoiceState::Paid {
                return Err(LabError::Conflict(format!(
                    "invoice {} is paid and cannot be deleted",
                    invoice.number
                )));
            }
            db.delete_invoice(invoice_id)?;
            Ok(())
        })?;
        info!(invoice_id = %invoice_id, "invoice deleted");
        Ok(())
    }

    pub fn invoices_for_owner(&self, owner_id: &str) -> LabResult<Vec<Invoice>> {
        let mut invoices = self.db.list_invoices_for_owner(owner_id)?;
        for invoice in &mut invoices {
            recompute_invoice_totals(invoice, self.config.tax_rate)?;
        }
        Ok(invoices)
    }

    /// Invoices issued in `[start, end]` with computed totals.
    pub fn invoices_between(&self, start: NaiveDate, end: NaiveDate) -> LabResult<Vec<Invoice>> {
        let mut invoices = self.db.list_invoices_between(start, end)?;
        for invoice in &mut invoices {
            recompute_invoice_totals(invoice, self.config.tax_rate)?;
        }
        Ok(invoices)
    }

    pub fn sales_for_day(&self, day: NaiveDate) -> LabResult<SalesSummary> {
        self.sales_between(day, day)
    }

    pub fn sales_for_month(&self, year: i32, month: u32) -> LabResult<SalesSummary> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| LabError::validation(format!("invalid month {}-{}", year, month)))?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        };
        let end = next
            .and_then(|d| d.pred_opt())
            .ok_or_else(|| LabError::validation(format!("invalid month {}-{}", year, month)))?;
        self.sales_between(start, end)
    }

    /// Sum of every paid invoice.
    pub fn total_income(&self) -> LabResult<Decimal> {
        self.sum_by_state(InvoiceState::Paid)
    }

    /// Sum of every invoice still awaiting payment.
    pub fn total_pending(&self) -> LabResult<Decimal> {
        self.sum_by_state(InvoiceState::Pending)
    }

    fn sales_between(&self, start: NaiveDate, end: NaiveDate) -> LabResult<SalesSummary> {
        let mut summary = SalesSummary {
            start: Some(start),
            end: Some(end),
            ..Default::default()
        };
        for invoice in self.invoices_between(start, end)? {
            match invoice.state {
                InvoiceState::Void => continue,
                InvoiceState::Paid => summary.paid_total += invoice.total,
                InvoiceState::Pending => summary.pending_total += invoice.total,
            }
            summary.invoice_count += 1;
            summary.subtotal += invoice.subtotal;
            summary.tax += invoice.tax;
            summary.total += invoice.total;
        }
        debug!(%start, %end, count = summary.invoice_count, total = %summary.total, "sales summarized");
        Ok(summary)
    }

    fn sum_by_state(&self, state: InvoiceState) -> LabResult<Decimal> {
        let mut sum = Decimal::ZERO;
        for mut invoice in self.db.list_invoices_by_state(state)? {
            recompute_invoice_totals(&mut invoice, self.config.tax_rate)?;
            sum += invoice.total;
        }
        Ok(sum)
    }

    /// Count-then-format numbering, bumped past numbers still in use after
    /// deletions. Safe only with a single writer per year.
    fn next_invoice_number(&self, db: &Database, year: i32) -> LabResult<String> {
        let prefix = format!("{}{}-", self.config.invoice_prefix, year);
        let mut existing = db.count_invoices_with_prefix(&prefix)?;
        loop {
            let number = generate_invoice_number(&self.config.invoice_prefix, year, existing);
            if !db.invoice_number_exists(&number)? {
                return Ok(number);
            }
            existing += 1;
        }
    }
}

fn load_invoice(db: &Database, id: &str, tax_rate: Decimal) -> LabResult<Invoice> {
    let mut invoice = db
        .get_invoice(id)?
        .ok_or_else(|| LabError::not_found("invoice", id))?;
    recompute_invoice_totals(&mut invoice, tax_rate)?;
    debug!(invoice_id = %id, subtotal = %invoice.subtotal, tax = %invoice.tax, total = %invoice.total, "invoice totals recomputed");
    Ok(invoice)
}

fn ensure_editable(invoice: &Invoice) -> LabResult<()> {
    match invoice.state {
        InvoiceState::Pending => Ok(()),
        InvoiceState::Paid => Err(TransitionError::InvoiceAlreadyPaid(invoice.number.clone()).into()),
        InvoiceState::Void => Err(TransitionError::InvoiceVoid(invoice.number.clone()).into()),
    }
}
