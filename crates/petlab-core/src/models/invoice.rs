//! Invoices and their line items.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::new_id;
use crate::error::{LabError, LabResult};

/// Largest monetary amount accepted as input: 10^15.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

wire_enum! {
    pub enum InvoiceState {
        Pending => "PENDING" | "PENDIENTE",
        Paid => "PAID" | "PAGADA",
        Void => "VOID" | "ANULADA",
    }
}

/// One billed service or product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    pub id: String,
    pub description: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    /// EXAMEN, CONSULTA, MEDICAMENTO, ...
    pub category: Option<String>,
}

impl LineItem {
    /// Build a validated line item: quantity > 0, unit price in `[0, MAX_AMOUNT]`,
    /// description set.
    pub fn new(
        description: impl Into<String>,
        quantity: u32,
        unit_price: Decimal,
        category: Option<String>,
    ) -> LabResult<Self> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(LabError::validation("line item description is required"));
        }
        if quantity == 0 {
            return Err(LabError::validation("line item quantity must be positive"));
        }
        if unit_price < Decimal::ZERO {
            return Err(LabError::validation("unit price cannot be negative"));
        }
        if unit_price > MAX_AMOUNT {
            return Err(LabError::validation(format!(
                "unit price cannot exceed {}",
                MAX_AMOUNT
            )));
        }
        Ok(Self {
            id: new_id(),
            description,
            quantity,
            unit_price,
            category,
        })
    }

    /// `quantity × unit_price`, or `None` when it leaves the decimal range.
    pub fn subtotal(&self) -> Option<Decimal> {
        Decimal::from(self.quantity).checked_mul(self.unit_price)
    }
}

/// An invoice. `subtotal`, `tax`, and `total` are derived from the line
/// items and are overwritten on every recomputation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invoice {
    pub id: String,
    pub number: String,
    pub owner_id: String,
    pub issued_on: NaiveDate,
    pub due_on: Option<NaiveDate>,
    pub state: InvoiceState,
    pub payment_method: Option<String>,
    pub paid_on: Option<NaiveDate>,
    pub notes: Option<String>,
    pub line_items: Vec<LineItem>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl Invoice {
    pub fn new(number: String, owner_id: String, issued_on: NaiveDate) -> Self {
        Self {
            id: new_id(),
            number,
            owner_id,
            issued_on,
            due_on: None,
            state: InvoiceState::Pending,
            payment_method: None,
            paid_on: None,
            notes: None,
            line_items: Vec::new(),
            subtotal: Decimal::ZERO,
            tax: Decimal::ZERO,
            total: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewLineItem {
    pub description: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub category: Option<String>,
}

impl NewLineItem {
    pub fn into_line_item(self) -> LabResult<LineItem> {
        LineItem::new(self.description, self.quantity, self.unit_price, self.category)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewInvoice {
    pub owner_id: String,
    /// Generated when absent
    pub number: Option<String>,
    pub due_on: Option<NaiveDate>,
    pub notes: Option<String>,
    pub line_items: Vec<NewLineItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_item_subtotal() {
        let item = LineItem::new("Hemograma", 3, Decimal::new(2550, 2), None).unwrap();
        assert_eq!(item.subtotal(), Some(Decimal::new(7650, 2)));
    }

    #[test]
    fn test_line_item_price_cap() {
        assert_eq!(MAX_AMOUNT, Decimal::from(1_000_000_000_000_000u64));
        assert!(LineItem::new("Hemograma", 2, MAX_AMOUNT, None).is_ok());
        assert!(matches!(
            LineItem::new("Hemograma", 2, Decimal::MAX, None),
            Err(LabError::Validation(_))
        ));
        assert!(LineItem::new("Hemograma", 1, MAX_AMOUNT + Decimal::ONE, None).is_err());
    }

    #[test]
    fn test_line_item_rejects_zero_quantity() {
        assert!(LineItem::new("Hemograma", 0, Decimal::ONE, None).is_err());
    }

    #[test]
    fn test_line_item_rejects_negative_price() {
        assert!(LineItem::new("Hemograma", 1, Decimal::new(-1, 0), None).is_err());
    }
}
