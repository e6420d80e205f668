//! Pure billing arithmetic.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{LabError, LabResult};
use crate::models::{Hospitalization, Invoice, LineItem, Payment, MAX_AMOUNT};

const SECONDS_PER_DAY: i64 = 86_400;

/// Round to cents, midpoint away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Subtotal, tax, and total of a set of line items. A subtotal above
/// `MAX_AMOUNT` is rejected.
pub fn invoice_totals(
    items: &[LineItem],
    tax_rate: Decimal,
) -> LabResult<(Decimal, Decimal, Decimal)> {
    let subtotal = items
        .iter()
        .try_fold(Decimal::ZERO, |acc, item| acc.checked_add(item.subtotal()?))
        .filter(|subtotal| *subtotal <= MAX_AMOUNT)
        .ok_or_else(|| {
            LabError::validation(format!("invoice subtotal cannot exceed {}", MAX_AMOUNT))
        })?;
    let tax = subtotal.checked_mul(tax_rate).map(round_money);
    let total = tax.and_then(|tax| subtotal.checked_add(tax));
    match (tax, total) {
        (Some(tax), Some(total)) => Ok((subtotal, tax, total)),
        _ => Err(LabError::validation("tax rate out of range")),
    }
}

/// Overwrite an invoice's derived totals from its line items.
pub fn recompute_invoice_totals(invoice: &mut Invoice, tax_rate: Decimal) -> LabResult<()> {
    let (subtotal, tax, total) = invoice_totals(&invoice.line_items, tax_rate)?;
    invoice.subtotal = subtotal;
    invoice.tax = tax;
    invoice.total = total;
    Ok(())
}

/// `<prefix><year>-<count + 1, six digits>`.
pub fn generate_invoice_number(prefix: &str, year: i32, existing: u32) -> String {
    format!("{}{}-{:06}", prefix, year, existing + 1)
}

/// Billable days between two instants: whole days rounded up, never less than one.
pub fn hospitalization_days(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    let seconds = (end - start).num_seconds();
    if seconds <= 0 {
        return 1;
    }
    let days = (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY;
    u32::try_from(days).unwrap_or(u32::MAX).max(1)
}

/// Days and amount of a stay, ending at `ended_at` or else `now`.
pub fn hospitalization_cost(stay: &Hospitalization, now: DateTime<Utc>) -> (u32, Decimal) {
    let days = hospitalization_days(stay.started_at, stay.ended_at.unwrap_or(now));
    (days, Decimal::from(days).saturating_mul(stay.daily_rate))
}

/// Refresh the amount of a payment from its hospitalization stay. Closed
/// stays are frozen and left alone. Returns whether anything changed.
pub fn compute_hospitalization_cost(payment: &mut Payment, now: DateTime<Utc>) -> bool {
    let Some(stay) = payment.hospitalization.as_mut() else {
        return false;
    };
    if !stay.is_open() {
        return false;
    }
    let (days, amount) = hospitalization_cost(stay, now);
    let changed = stay.days != days || payment.amount != amount;
    stay.days = days;
    payment.amount = amount;
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn item(qty: u32, price: Decimal) -> LineItem {
        LineItem::new("Servicio", qty, price, None).unwrap()
    }

    #[test]
    fn test_reference_invoice() {
        let mut invoice = Invoice::new(
            "F2024-000001".into(),
            "o1".into(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        );
        invoice.line_items = vec![item(2, dec!(50.00)), item(1, dec!(30.00))];
        recompute_invoice_totals(&mut invoice, dec!(0.18)).unwrap();

        assert_eq!(invoice.subtotal, dec!(130.00));
        assert_eq!(invoice.tax, dec!(23.40));
        assert_eq!(invoice.total, dec!(153.40));
    }

    #[test]
    fn test_empty_invoice_is_zero() {
        assert_eq!(
            invoice_totals(&[], dec!(0.18)).unwrap(),
            (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO)
        );
    }

    #[test]
    fn test_totals_reject_amounts_past_the_cap() {
        let at_cap = item(1, MAX_AMOUNT);
        let (subtotal, _, _) = invoice_totals(&[at_cap.clone()], dec!(0.18)).unwrap();
        assert_eq!(subtotal, MAX_AMOUNT);

        let err = invoice_totals(&[at_cap.clone(), item(1, dec!(0.01))], dec!(0.18)).unwrap_err();
        assert!(matches!(err, LabError::Validation(_)));

        // Fields set directly skip the constructor's cap.
        let mut huge = at_cap;
        huge.quantity = 2;
        huge.unit_price = Decimal::MAX;
        assert!(invoice_totals(&[huge.clone()], dec!(0.18)).is_err());
        assert!(invoice_totals(&[huge.clone(), huge], dec!(0.18)).is_err());
    }

    #[test]
    fn test_hospitalization_cost_saturates() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let stay = Hospitalization {
            started_at: t,
            ended_at: Some(t + Duration::days(3)),
            daily_rate: Decimal::MAX,
            days: 0,
        };
        assert_eq!(hospitalization_cost(&stay, t), (3, Decimal::MAX));
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_money(dec!(0.125)), dec!(0.13));
        assert_eq!(round_money(dec!(0.124)), dec!(0.12));
        assert_eq!(round_money(dec!(-0.125)), dec!(-0.13));
    }

    #[test]
    fn test_tax_rounding() {
        // 0.25 * 0.18 = 0.045 -> 0.05
        let (subtotal, tax, total) = invoice_totals(&[item(1, dec!(0.25))], dec!(0.18)).unwrap();
        assert_eq!(subtotal, dec!(0.25));
        assert_eq!(tax, dec!(0.05));
        assert_eq!(total, dec!(0.30));
    }

    #[test]
    fn test_invoice_number_format() {
        assert_eq!(generate_invoice_number("F", 2024, 0), "F2024-000001");
        assert_eq!(generate_invoice_number("F", 2024, 41), "F2024-000042");
    }

    #[test]
    fn test_hospitalization_minimum_one_day() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let stay = Hospitalization {
            started_at: t,
            ended_at: Some(t),
            daily_rate: dec!(100),
            days: 0,
        };
        assert_eq!(hospitalization_cost(&stay, t), (1, dec!(100)));
    }

    #[test]
    fn test_hospitalization_rounds_up() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let stay = Hospitalization {
            started_at: t,
            ended_at: Some(t + Duration::hours(36)),
            daily_rate: dec!(100),
            days: 0,
        };
        assert_eq!(hospitalization_cost(&stay, t), (2, dec!(200)));
        assert_eq!(hospitalization_days(t, t + Duration::hours(48)), 2);
        assert_eq!(hospitalization_days(t, t + Duration::hours(48) + Duration::seconds(1)), 3);
    }

    #[test]
    fn test_closed_stay_is_frozen() {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let mut payment = Payment {
            id: "p".into(),
            number: "PAG-1".into(),
            owner_id: "o".into(),
            pet_id: None,
            concept: "Internamiento".into(),
            kind: None,
            amount: dec!(100),
            amount_paid: Decimal::ZERO,
            method: None,
            state: crate::models::PaymentState::Pending,
            issued_on: t.date_naive(),
            due_on: None,
            paid_at: None,
            notes: None,
            hospitalization: Some(Hospitalization {
                started_at: t,
                ended_at: Some(t + Duration::hours(2)),
                daily_rate: dec!(100),
                days: 1,
            }),
        };
        assert!(!compute_hospitalization_cost(&mut payment, t + Duration::days(10)));
        assert_eq!(payment.amount, dec!(100));

        if let Some(stay) = payment.hospitalization.as_mut() {
            stay.ended_at = None;
        }
        assert!(compute_hospitalization_cost(&mut payment, t + Duration::days(10)));
        assert_eq!(payment.amount, dec!(1000));
    }

    fn cents() -> impl Strategy<Value = Decimal> {
        (0i64..1_000_000).prop_map(|c| Decimal::new(c, 2))
    }

    proptest! {
        #[test]
        fn prop_totals_are_consistent(lines in prop::collection::vec((1u32..50, cents()), 0..12)) {
            let items: Vec<LineItem> = lines.iter().map(|(q, p)| item(*q, *p)).collect();
            let (subtotal, tax, total) = invoice_totals(&items, dec!(0.18)).unwrap();

            let expected: Decimal = lines.iter().map(|(q, p)| Decimal::from(*q) * *p).sum();
            prop_assert_eq!(subtotal, expected);
            prop_assert_eq!(tax, round_money(subtotal * dec!(0.18)));
            prop_assert_eq!(total, subtotal + tax);
        }

        #[test]
        fn prop_recompute_is_idempotent(lines in prop::collection::vec((1u32..50, cents()), 0..12)) {
            let mut invoice = Invoice::new("F".into(), "o".into(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
            invoice.line_items = lines.iter().map(|(q, p)| item(*q, *p)).collect();

            recompute_invoice_totals(&mut invoice, dec!(0.18)).unwrap();
            let first = (invoice.subtotal, invoice.tax, invoice.total);
            recompute_invoice_totals(&mut invoice, dec!(0.18)).unwrap();
            prop_assert_eq!(first, (invoice.subtotal, invoice.tax, invoice.total));
        }

        #[test]
        fn prop_hospitalization_days_at_least_one(hours in -100i64..2_000) {
            let t = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
            let days = hospitalization_days(t, t + Duration::hours(hours));
            prop_assert!(days >= 1);
            prop_assert!(i64::from(days) * 24 >= hours);
        }
    }
}
