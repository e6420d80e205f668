//! Stock items.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::new_id;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryItem {
    pub id: String,
    pub code: String,
    pub name: String,
    pub category: Option<String>,
    pub purchase_price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub stock: u32,
    pub min_stock: u32,
    pub max_stock: Option<u32>,
    /// Unit, box, vial, mL...
    pub unit: Option<String>,
    pub expires_on: Option<NaiveDate>,
    pub supplier: Option<String>,
    pub active: bool,
}

impl InventoryItem {
    pub fn new(code: String, name: String, stock: u32, min_stock: u32) -> Self {
        Self {
            id: new_id(),
            code,
            name,
            category: None,
            purchase_price: None,
            sale_price: None,
            stock,
            min_stock,
            max_stock: None,
            unit: None,
            expires_on: None,
            supplier: None,
            active: true,
        }
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expires_on.is_some_and(|d| d < today)
    }
}
