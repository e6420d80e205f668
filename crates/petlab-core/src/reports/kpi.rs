//! KPI computations over snapshot slices. None of these divide by zero:
//! empty input yields zeroed reports.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::{
    Breakdown, DateRange, OrdersByState, RepeatReport, RevenueReport, SameDayReport,
    TurnaroundReport,
};
use crate::billing::round_money;
use crate::models::{ExamResult, Invoice, InvoiceState, Order, OrderState, SampleCollection};

/// Average whole hours from sample collection to delivery.
///
/// `samples` maps order id to its sample collection. Results without a
/// delivery time or without a sample are skipped.
pub fn average_turnaround(
    range: DateRange,
    results: &[ExamResult],
    samples: &HashMap<String, SampleCollection>,
    target_hours: f64,
) -> TurnaroundReport {
    let hours: Vec<i64> = results
        .iter()
        .filter_map(|r| {
            let delivered = r.delivered_at?;
            let sample = samples.get(&r.order_id)?;
            Some((delivered - sample.collected_at()).num_hours())
        })
        .collect();

    let average_hours = if hours.is_empty() {
        0.0
    } else {
        hours.iter().sum::<i64>() as f64 / hours.len() as f64
    };

    TurnaroundReport {
        range,
        samples: hours.len() as u32,
        average_hours,
        average_days: average_hours / 24.0,
        target_hours,
        meets_target: average_hours < target_hours,
    }
}

/// Share of (pet, exam type) groups ordered more than once, over all orders.
pub fn repeat_rate(range: DateRange, orders: &[Order], target_percent: f64) -> RepeatReport {
    let mut groups: HashMap<(&str, &str), u32> = HashMap::new();
    for order in orders.iter().filter(|o| range.contains(o.ordered_on)) {
        *groups
            .entry((order.pet_id.as_str(), order.exam_type.as_str()))
            .or_default() += 1;
    }
    let total_orders: u32 = groups.values().sum();
    let repeated_groups = groups.values().filter(|&&n| n > 1).count() as u32;

    let repeat_rate_percent = if total_orders == 0 {
        0.0
    } else {
        f64::from(repeated_groups) * 100.0 / f64::from(total_orders)
    };

    RepeatReport {
        range,
        total_orders,
        repeated_groups,
        repeat_rate_percent,
        target_percent,
        meets_target: repeat_rate_percent < target_percent,
    }
}

/// Billed, paid, and pending totals. Invoices must carry computed totals.
pub fn revenue(range: DateRange, invoices: &[Invoice]) -> RevenueReport {
    let mut report = RevenueReport {
        range,
        invoice_count: 0,
        billed_total: Decimal::ZERO,
        paid_total: Decimal::ZERO,
        pending_total: Decimal::ZERO,
        collection_rate_percent: Decimal::ZERO,
    };
    for invoice in invoices.iter().filter(|i| range.contains(i.issued_on)) {
        match invoice.state {
            InvoiceState::Paid => report.paid_total += invoice.total,
            InvoiceState::Pending => report.pending_total += invoice.total,
            InvoiceState::Void => continue,
        }
        report.invoice_count += 1;
        report.billed_total += invoice.total;
    }
    if !report.billed_total.is_zero() {
        report.collection_rate_percent =
            round_money(report.paid_total * Decimal::ONE_HUNDRED / report.billed_total);
    }
    report
}

pub fn orders_by_state(orders: &[Order]) -> OrdersByState {
    let mut counts = OrdersByState::default();
    for order in orders {
        match order.state {
            OrderState::Pending => counts.pending += 1,
            OrderState::InProgress => counts.in_progress += 1,
            OrderState::Completed => counts.completed += 1,
            OrderState::Cancelled => counts.cancelled += 1,
        }
        counts.total += 1;
    }
    counts
}

pub fn exams_by_type(range: DateRange, orders: &[Order]) -> Breakdown {
    breakdown(
        range,
        orders
            .iter()
            .filter(|o| range.contains(o.ordered_on))
            .map(|o| o.exam_type.clone()),
    )
}

/// Orders per species; `species` maps pet id to species.
pub fn species_seen(
    range: DateRange,
    orders: &[Order],
    species: &HashMap<String, String>,
) -> Breakdown {
    breakdown(
        range,
        orders
            .iter()
            .filter(|o| range.contains(o.ordered_on))
            .map(|o| label(species, &o.pet_id)),
    )
}

/// Orders per veterinarian; `names` maps vet id to display name.
pub fn vet_workload(range: DateRange, orders: &[Order], names: &HashMap<String, String>) -> Breakdown {
    breakdown(
        range,
        orders
            .iter()
            .filter(|o| range.contains(o.ordered_on))
            .map(|o| label(names, &o.vet_id)),
    )
}

/// Sample collections per technician; `names` maps technician id to display name.
pub fn technician_workload(
    range: DateRange,
    samples: &[SampleCollection],
    names: &HashMap<String, String>,
) -> Breakdown {
    breakdown(
        range,
        samples
            .iter()
            .filter(|s| range.contains(s.scheduled_at.date_naive()))
            .map(|s| label(names, &s.technician_id)),
    )
}

pub fn same_day_completion(day: NaiveDate, orders: &[Order], target_percent: f64) -> SameDayReport {
    let todays: Vec<&Order> = orders.iter().filter(|o| o.ordered_on == day).collect();
    let completed = todays
        .iter()
        .filter(|o| o.state == OrderState::Completed)
        .count() as u32;
    let total_orders = todays.len() as u32;
    let percent = if total_orders == 0 {
        0.0
    } else {
        f64::from(completed) * 100.0 / f64::from(total_orders)
    };

    SameDayReport {
        date: day,
        total_orders,
        completed,
        percent,
        target_percent,
        meets_target: percent >= target_percent,
    }
}

fn breakdown(range: DateRange, labels: impl Iterator<Item = String>) -> Breakdown {
    let mut counts: BTreeMap<String, u32> = BTreeMap::new();
    let mut total = 0;
    for label in labels {
        *counts.entry(label).or_default() += 1;
        total += 1;
    }
    Breakdown {
        range,
        total,
        counts,
    }
}

fn label(names: &HashMap<String, String>, id: &str) -> String {
    names.get(id).cloned().unwrap_or_else(|| id.to_string())
}
