//! Stock keeping for reagents and supplies.

use chrono::{Datelike, Days};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::db::Database;
use crate::error::{LabError, LabResult};
use crate::models::InventoryItem;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StockOperation {
    Add,
    Subtract,
}

pub struct InventoryService<'a> {
    db: &'a Database,
    clock: &'a dyn Clock,
}

impl<'a> InventoryService<'a> {
    pub fn new(db: &'a Database, clock: &'a dyn Clock) -> Self {
        Self { db, clock }
    }

    pub fn add_item(&self, item: InventoryItem) -> LabResult<InventoryItem> {
        if item.code.trim().is_empty() || item.name.trim().is_empty() {
            return Err(LabError::validation("item code and name are required"));
        }
        if item.max_stock.is_some_and(|max| max < item.min_stock) {
            return Err(LabError::validation("max_stock is below min_stock"));
        }
        self.db.insert_inventory_item(&item)?;
        info!(item_id = %item.id, code = %item.code, stock = item.stock, "inventory item added");
        Ok(item)
    }

    pub fn get_item(&self, id: &str) -> LabResult<InventoryItem> {
        self.db
            .get_inventory_item(id)?
            .ok_or_else(|| LabError::not_found("inventory item", id))
    }

    /// Move stock up or down by `quantity`. Stock never goes negative.
    pub fn adjust_stock(
        &self,
        id: &str,
        quantity: u32,
        op: StockOperation,
    ) -> LabResult<InventoryItem> {
        if quantity == 0 {
            return Err(LabError::validation("quantity must be positive"));
        }

        let item = self.db.atomically(|db| -> LabResult<InventoryItem> {
            let mut item = db
                .get_inventory_item(id)?
                .ok_or_else(|| LabError::not_found("inventory item", id))?;

            item.stock = match op {
                StockOperation::Add => item.stock.checked_add(quantity).ok_or_else(|| {
                    LabError::validation(format!("stock overflow for {}", item.code))
                })?,
                StockOperation::Subtract => {
                    item.stock
                        .checked_sub(quantity)
                        .ok_or_else(|| LabError::InsufficientStock {
                            item: item.code.clone(),
                            requested: quantity,
                            available: item.stock,
                        })?
                }
            };
            db.set_stock(&item.id, item.stock)?;
            Ok(item)
        })?;

        info!(item_id = %item.id, ?op, quantity, stock = item.stock, "stock adjusted");
        if item.is_low_stock() {
            warn!(item_id = %item.id, code = %item.code, stock = item.stock, min_stock = item.min_stock, "stock at or below minimum");
        }
        Ok(item)
    }

    pub fn low_stock(&self) -> LabResult<Vec<InventoryItem>> {
        Ok(self.db.list_low_stock_items()?)
    }

    /// Items whose expiry date is already behind today.
    pub fn expired(&self) -> LabResult<Vec<InventoryItem>> {
        Ok(self.db.list_items_expiring_before(self.clock.today())?)
    }

    /// Items expiring between today and `days` from now, inclusive. The
    /// window must end within four-digit years.
    pub fn expiring_within(&self, days: u32) -> LabResult<Vec<InventoryItem>> {
        let today = self.clock.today();
        let until = today
            .checked_add_days(Days::new(u64::from(days)))
            .filter(|until| until.year() <= 9999)
            .ok_or_else(|| {
                LabError::validation(format!("expiry window of {} days is out of range", days))
            })?;
        Ok(self.db.list_items_expiring_between(today, until)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn clock() -> FixedClock {
        FixedClock::new(Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap())
    }

    #[test]
    fn test_add_and_subtract_stock() {
        let db = Database::open_in_memory().unwrap();
        let clock = clock();
        let inventory = InventoryService::new(&db, &clock);
        let item = inventory
            .add_item(InventoryItem::new("REA-01".into(), "Reactivo HCT".into(), 10, 3))
            .unwrap();

        let item = inventory.adjust_stock(&item.id, 5, StockOperation::Add).unwrap();
        assert_eq!(item.stock, 15);
        let item = inventory.adjust_stock(&item.id, 12, StockOperation::Subtract).unwrap();
        assert_eq!(item.stock, 3);
        assert_eq!(inventory.low_stock().unwrap().len(), 1);
    }

    #[test]
    fn test_subtract_beyond_stock_fails_and_keeps_stock() {
        let db = Database::open_in_memory().unwrap();
        let clock = clock();
        let inventory = InventoryService::new(&db, &clock);
        let item = inventory
            .add_item(InventoryItem::new("REA-02".into(), "Tiras".into(), 4, 1))
            .unwrap();

        let err = inventory
            .adjust_stock(&item.id, 5, StockOperation::Subtract)
            .unwrap_err();
        assert!(matches!(
            err,
            LabError::InsufficientStock { requested: 5, available: 4, .. }
        ));
        assert_eq!(inventory.get_item(&item.id).unwrap().stock, 4);
    }

    #[test]
    fn test_zero_quantity_and_unknown_item() {
        let db = Database::open_in_memory().unwrap();
        let clock = clock();
        let inventory = InventoryService::new(&db, &clock);

        assert!(matches!(
            inventory.adjust_stock("x", 0, StockOperation::Add),
            Err(LabError::Validation(_))
        ));
        assert!(matches!(
            inventory.adjust_stock("x", 1, StockOperation::Add),
            Err(LabError::NotFound(_))
        ));
    }

    #[test]
    fn test_expiry_views() {
        let db = Database::open_in_memory().unwrap();
        let clock = clock();
        let inventory = InventoryService::new(&db, &clock);
        let d = |day| NaiveDate::from_ymd_opt(2024, 3, day).unwrap();

        let mut old = InventoryItem::new("A".into(), "Old".into(), 2, 1);
        old.expires_on = Some(d(9));
        let mut soon = InventoryItem::new("B".into(), "Soon".into(), 2, 1);
        soon.expires_on = Some(d(15));
        let mut later = InventoryItem::new("C".into(), "Later".into(), 2, 1);
        later.expires_on = Some(d(30));
        for item in [old, soon, later] {
            inventory.add_item(item).unwrap();
        }

        assert_eq!(inventory.expired().unwrap().len(), 1);
        let within = inventory.expiring_within(7).unwrap();
        assert_eq!(within.len(), 1);
        assert_eq!(within[0].code, "B");
    }

    #[test]
    fn test_expiry_window_out_of_range() {
        let db = Database::open_in_memory().unwrap();
        let clock = clock();
        let inventory = InventoryService::new(&db, &clock);

        assert!(matches!(
            inventory.expiring_within(u32::MAX),
            Err(LabError::Validation(_))
        ));
        assert!(inventory.expiring_within(365 * 1000).unwrap().is_empty());
    }
}
