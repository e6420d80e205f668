//! Payment operations.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, info};

use super::{compute_hospitalization_cost, hospitalization_cost, BillingEngine};
use crate::db::Database;
use crate::error::{LabError, LabResult, TransitionError};
use crate::models::{new_id, Hospitalization, NewPayment, Payment, PaymentState, MAX_AMOUNT};

impl<'a> BillingEngine<'a> {
    /// Create a PENDING payment. For hospitalizations the amount is derived
    /// from the stay so far and any caller amount is ignored.
    pub fn create_payment(&self, input: NewPayment) -> LabResult<Payment> {
        if input.concept.trim().is_empty() {
            return Err(LabError::validation("payment concept is required"));
        }
        let now = self.clock.now();

        let hospitalization = match input.hospitalization {
            Some(h) => {
                if h.daily_rate <= Decimal::ZERO {
                    return Err(LabError::validation("daily rate must be positive"));
                }
                ensure_within_cap("daily rate", h.daily_rate)?;
                Some(Hospitalization {
                    started_at: h.started_at.unwrap_or(now),
                    ended_at: None,
                    daily_rate: h.daily_rate,
                    days: 0,
                })
            }
            None => None,
        };
        let amount = match &hospitalization {
            Some(stay) => hospitalization_cost(stay, now).1,
            None => {
                ensure_within_cap("payment amount", input.amount)?;
                input.amount
            }
        };
        if amount <= Decimal::ZERO {
            return Err(LabError::validation("payment amount must be positive"));
        }

        let payment = self.db.atomically(|db| -> LabResult<Payment> {
            if db.get_owner(&input.owner_id)?.is_none() {
                return Err(LabError::not_found("owner", &input.owner_id));
            }
            if let Some(pet_id) = &input.pet_id {
                if db.get_pet(pet_id)?.is_none() {
                    return Err(LabError::not_found("pet", pet_id));
                }
            }

            let mut payment = Payment {
                id: new_id(),
                number: self.next_payment_number(db)?,
                owner_id: input.owner_id,
                pet_id: input.pet_id,
                concept: input.concept.trim().to_string(),
                kind: input.kind,
                amount,
                amount_paid: Decimal::ZERO,
                method: None,
                state: PaymentState::Pending,
                issued_on: now.date_naive(),
                due_on: input.due_on,
                paid_at: None,
                notes: input.notes,
                hospitalization,
            };
            compute_hospitalization_cost(&mut payment, now);
            db.insert_payment(&payment)?;
            Ok(payment)
        })?;

        info!(
            payment_id = %payment.id,
            number = %payment.number,
            amount = %payment.amount,
            hospitalization = payment.hospitalization.is_some(),
            "payment created"
        );
        Ok(payment)
    }

    /// Load a payment; an open hospitalization is re-priced against now.
    pub fn get_payment(&self, id: &str) -> LabResult<Payment> {
        let now = self.clock.now();
        self.db.atomically(|db| -> LabResult<Payment> {
            let mut payment = require_payment(db, id)?;
            if payment.state != PaymentState::Cancelled
                && compute_hospitalization_cost(&mut payment, now)
            {
                refresh_state(&mut payment);
                db.update_payment(&payment)?;
                debug!(payment_id = %id, amount = %payment.amount, "hospitalization re-priced");
            }
            Ok(payment)
        })
    }

    /// Accumulate a (possibly partial) payment.
    pub fn register_payment(&self, id: &str, amount: Decimal, method: &str) -> LabResult<Payment> {
        if amount < Decimal::ZERO {
            return Err(LabError::validation("payment amount cannot be negative"));
        }
        ensure_within_cap("payment amount", amount)?;
        let now = self.clock.now();

        let payment = self.db.atomically(|db| -> LabResult<Payment> {
            let mut payment = require_payment(db, id)?;
            if payment.state == PaymentState::Cancelled {
                return Err(TransitionError::PaymentCancelled(payment.number).into());
            }
            compute_hospitalization_cost(&mut payment, now);

            let paid = payment
                .amount_paid
                .checked_add(amount)
                .filter(|paid| *paid <= payment.amount);
            let Some(paid) = paid else {
                return Err(LabError::validation(format!(
                    "payment of {} exceeds the outstanding balance of {}",
                    amount,
                    payment.balance()
                )));
            };
            payment.amount_paid = paid;
            if !method.trim().is_empty() {
                payment.method = Some(method.trim().to_string());
            }
            refresh_state(&mut payment);
            if payment.state == PaymentState::Paid && payment.paid_at.is_none() {
                payment.paid_at = Some(now);
            }
            db.update_payment(&payment)?;
            Ok(payment)
        })?;

        info!(
            payment_id = %payment.id,
            registered = %amount,
            paid = %payment.amount_paid,
            state = %payment.state,
            "payment registered"
        );
        Ok(payment)
    }

    /// Close a hospitalization now; its amount is frozen from here on.
    pub fn finish_hospitalization(&self, id: &str) -> LabResult<Payment> {
        let now = self.clock.now();
        let payment = self.db.atomically(|db| -> LabResult<Payment> {
            let mut payment = require_payment(db, id)?;
            if payment.state == PaymentState::Cancelled {
                return Err(TransitionError::PaymentCancelled(payment.number).into());
            }
            match &payment.hospitalization {
                None => return Err(TransitionError::NotHospitalization(payment.number).into()),
                Some(stay) if !stay.is_open() => {
                    return Err(TransitionError::HospitalizationClosed(payment.number).into())
                }
                Some(_) => {}
            }

            compute_hospitalization_cost(&mut payment, now);
            if let Some(stay) = payment.hospitalization.as_mut() {
                stay.ended_at = Some(now);
            }
            refresh_state(&mut payment);
            db.update_payment(&payment)?;
            Ok(payment)
        })?;

        info!(
            payment_id = %payment.id,
            days = payment.hospitalization.as_ref().map(|h| h.days).unwrap_or(0),
            amount = %payment.amount,
            "hospitalization finished"
        );
        Ok(payment)
    }

    pub fn cancel_payment(&self, id: &str) -> LabResult<Payment> {
        let payment = self.db.atomically(|db| -> LabResult<Payment> {
            let mut payment = require_payment(db, id)?;
            if payment.state == PaymentState::Cancelled {
                return Err(TransitionError::PaymentCancelled(payment.number).into());
            }
            payment.state = PaymentState::Cancelled;
            db.update_payment(&payment)?;
            Ok(payment)
        })?;

        info!(payment_id = %payment.id, number = %payment.number, "payment cancelled");
        Ok(payment)
    }

    /// Open hospitalizations, priced as of now.
    pub fn active_hospitalizations(&self) -> LabResult<Vec<Payment>> {
        let now = self.clock.now();
        let mut payments = self.db.list_open_hospitalizations()?;
        for payment in &mut payments {
            compute_hospitalization_cost(payment, now);
        }
        Ok(payments)
    }

    /// Pending payments past their due date.
    pub fn overdue_payments(&self) -> LabResult<Vec<Payment>> {
        let today = self.clock.today();
        Ok(self
            .db
            .list_payments_by_state(PaymentState::Pending)?
            .into_iter()
            .filter(|p| p.is_overdue(today))
            .collect())
    }

    /// What an owner still owes across open payments.
    pub fn outstanding_for_owner(&self, owner_id: &str) -> LabResult<Decimal> {
        let now = self.clock.now();
        let mut owed = Decimal::ZERO;
        for mut payment in self.db.list_payments_for_owner(owner_id)? {
            if matches!(payment.state, PaymentState::Cancelled | PaymentState::Paid) {
                continue;
            }
            compute_hospitalization_cost(&mut payment, now);
            owed += payment.balance();
        }
        Ok(owed)
    }

    /// Sum of payments settled in full on the calendar days `[start, end]`.
    pub fn collected_between(&self, start: NaiveDate, end: NaiveDate) -> LabResult<Decimal> {
        if end < start {
            return Err(LabError::validation("range end precedes start"));
        }
        let from = start.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
        let to = end
            .and_hms_micro_opt(23, 59, 59, 999_999)
            .unwrap_or_default()
            .and_utc();
        Ok(self
            .db
            .list_payments_paid_between(from, to)?
            .iter()
            .filter(|p| p.state == PaymentState::Paid)
            .map(|p| p.amount_paid)
            .sum())
    }

    /// `<prefix>-<epoch millis>`, bumped until free.
    fn next_payment_number(&self, db: &Database) -> LabResult<String> {
        let mut millis = self.clock.now().timestamp_millis();
        loop {
            let number = format!("{}-{}", self.config.payment_prefix, millis);
            if db.get_payment_by_number(&number)?.is_none() {
                return Ok(number);
            }
            millis += 1;
        }
    }
}

fn ensure_within_cap(what: &str, amount: Decimal) -> LabResult<()> {
    if amount > MAX_AMOUNT {
        return Err(LabError::validation(format!("{} cannot exceed {}", what, MAX_AMOUNT)));
    }
    Ok(())
}

fn require_payment(db: &Database, id: &str) -> LabResult<Payment> {
    db.get_payment(id)?
        .ok_or_else(|| LabError::not_found("payment", id))
}

/// PAID once fully covered, PARTIAL while something is paid, else PENDING.
fn refresh_state(payment: &mut Payment) {
    if payment.state == PaymentState::Cancelled {
        return;
    }
    payment.state = if payment.amount_paid >= payment.amount {
        PaymentState::Paid
    } else if payment.amount_paid > Decimal::ZERO {
        PaymentState::Partial
    } else {
        PaymentState::Pending
    };
}
