//! Inventory database operations.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

use super::{date_to_sql, opt_date_to_sql, parse_opt_date, parse_opt_decimal, Database, DbError, DbResult};
use crate::models::InventoryItem;

const ITEM_COLUMNS: &str = "id, code, name, category, purchase_price, sale_price, stock, \
     min_stock, max_stock, unit, expires_on, supplier, active";

impl Database {
    pub fn insert_inventory_item(&self, item: &InventoryItem) -> DbResult<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO inventory_items ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                ITEM_COLUMNS
            ),
            params![
                item.id,
                item.code,
                item.name,
                item.category,
                item.purchase_price.map(|p| p.to_string()),
                item.sale_price.map(|p| p.to_string()),
                item.stock,
                item.min_stock,
                item.max_stock,
                item.unit,
                opt_date_to_sql(&item.expires_on),
                item.supplier,
                item.active,
            ],
        )?;
        Ok(())
    }

    pub fn get_inventory_item(&self, id: &str) -> DbResult<Option<InventoryItem>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM inventory_items WHERE id = ?", ITEM_COLUMNS),
                [id],
                ItemRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    pub fn set_stock(&self, id: &str, stock: u32) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE inventory_items SET stock = ?2 WHERE id = ?1",
            params![id, stock],
        )?;
        Ok(rows_affected > 0)
    }

    /// Active items at or below their minimum stock.
    pub fn list_low_stock_items(&self) -> DbResult<Vec<InventoryItem>> {
        self.query_items(
            &format!(
                "SELECT {} FROM inventory_items WHERE active = 1 AND stock <= min_stock ORDER BY stock, name",
                ITEM_COLUMNS
            ),
            params![],
        )
    }

    /// Active items whose expiry date falls before `date`.
    pub fn list_items_expiring_before(&self, date: NaiveDate) -> DbResult<Vec<InventoryItem>> {
        self.query_items(
            &format!(
                "SELECT {} FROM inventory_items WHERE active = 1 AND expires_on IS NOT NULL AND expires_on < ?1 ORDER BY expires_on",
                ITEM_COLUMNS
            ),
            params![date_to_sql(&date)],
        )
    }

    /// Active items whose expiry date falls in `[from, to]`.
    pub fn list_items_expiring_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<InventoryItem>> {
        self.query_items(
            &format!(
                "SELECT {} FROM inventory_items WHERE active = 1 AND expires_on >= ?1 AND expires_on <= ?2 ORDER BY expires_on",
                ITEM_COLUMNS
            ),
            params![date_to_sql(&from), date_to_sql(&to)],
        )
    }

    fn query_items<P: rusqlite::Params>(&self, sql: &str, params: P) -> DbResult<Vec<InventoryItem>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, ItemRow::from_row)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?.try_into()?);
        }
        Ok(items)
    }
}

/// Intermediate row struct for database mapping.
struct ItemRow {
    id: String,
    code: String,
    name: String,
    category: Option<String>,
    purchase_price: Option<String>,
    sale_price: Option<String>,
    stock: u32,
    min_stock: u32,
    max_stock: Option<u32>,
    unit: Option<String>,
    expires_on: Option<String>,
    supplier: Option<String>,
    active: bool,
}

impl ItemRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            code: row.get(1)?,
            name: row.get(2)?,
            category: row.get(3)?,
            purchase_price: row.get(4)?,
            sale_price: row.get(5)?,
            stock: row.get(6)?,
            min_stock: row.get(7)?,
            max_stock: row.get(8)?,
            unit: row.get(9)?,
            expires_on: row.get(10)?,
            supplier: row.get(11)?,
            active: row.get(12)?,
        })
    }
}

impl TryFrom<ItemRow> for InventoryItem {
    type Error = DbError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        Ok(InventoryItem {
            purchase_price: parse_opt_decimal(row.purchase_price)?,
            sale_price: parse_opt_decimal(row.sale_price)?,
            expires_on: parse_opt_date(row.expires_on)?,
            id: row.id,
            code: row.code,
            name: row.name,
            category: row.category,
            stock: row.stock,
            min_stock: row.min_stock,
            max_stock: row.max_stock,
            unit: row.unit,
            supplier: row.supplier,
            active: row.active,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_roundtrip_and_stock_update() {
        let db = Database::open_in_memory().unwrap();
        let mut item = InventoryItem::new("REA-01".into(), "Reactivo HCT".into(), 10, 3);
        item.purchase_price = Some(rust_decimal::Decimal::new(1250, 2));
        db.insert_inventory_item(&item).unwrap();

        assert!(db.set_stock(&item.id, 2).unwrap());
        item.stock = 2;
        assert_eq!(db.get_inventory_item(&item.id).unwrap().unwrap(), item);
        assert_eq!(db.list_low_stock_items().unwrap().len(), 1);
    }

    #[test]
    fn test_expiry_queries() {
        let db = Database::open_in_memory().unwrap();
        let d = |day| NaiveDate::from_ymd_opt(2024, 3, day).unwrap();

        let mut expired = InventoryItem::new("A".into(), "Expired".into(), 5, 1);
        expired.expires_on = Some(d(1));
        let mut soon = InventoryItem::new("B".into(), "Soon".into(), 5, 1);
        soon.expires_on = Some(d(20));
        let never = InventoryItem::new("C".into(), "Never".into(), 5, 1);
        for item in [&expired, &soon, &never] {
            db.insert_inventory_item(item).unwrap();
        }

        let before = db.list_items_expiring_before(d(10)).unwrap();
        assert_eq!(before.len(), 1);
        assert_eq!(before[0].code, "A");
        assert_eq!(db.list_items_expiring_between(d(10), d(25)).unwrap().len(), 1);
    }
}
