//! Invoice and line item database operations.
//!
//! Invoice totals are not stored. Invoices come back with their line items
//! and zeroed totals; the billing layer recomputes them.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rusqlite::{params, OptionalExtension};

use super::{
    date_to_sql, opt_date_to_sql, parse_date, parse_decimal, parse_opt_date, parse_wire,
    Database, DbError, DbResult,
};
use crate::models::{Invoice, InvoiceState, LineItem};

const INVOICE_COLUMNS: &str =
    "id, number, owner_id, issued_on, due_on, state, payment_method, paid_on, notes";

impl Database {
    /// Insert an invoice together with its line items, in order.
    pub fn insert_invoice(&self, invoice: &Invoice) -> DbResult<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO invoices ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                INVOICE_COLUMNS
            ),
            params![
                invoice.id,
                invoice.number,
                invoice.owner_id,
                date_to_sql(&invoice.issued_on),
                opt_date_to_sql(&invoice.due_on),
                invoice.state.as_str(),
                invoice.payment_method,
                opt_date_to_sql(&invoice.paid_on),
                invoice.notes,
            ],
        )?;
        for (position, item) in invoice.line_items.iter().enumerate() {
            self.insert_line_item(&invoice.id, position as u32, item)?;
        }
        Ok(())
    }

    /// Persist the header fields of an invoice. Line items are untouched.
    pub fn update_invoice(&self, invoice: &Invoice) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE invoices SET
                due_on = ?2,
                state = ?3,
                payment_method = ?4,
                paid_on = ?5,
                notes = ?6
            WHERE id = ?1
            "#,
            params![
                invoice.id,
                opt_date_to_sql(&invoice.due_on),
                invoice.state.as_str(),
                invoice.payment_method,
                opt_date_to_sql(&invoice.paid_on),
                invoice.notes,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get an invoice and its line items.
    pub fn get_invoice(&self, id: &str) -> DbResult<Option<Invoice>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM invoices WHERE id = ?", INVOICE_COLUMNS),
                [id],
                InvoiceRow::from_row,
            )
            .optional()?;
        match row {
            Some(row) => Ok(Some(self.hydrate_invoice(row)?)),
            None => Ok(None),
        }
    }

    /// Delete an invoice; its line items go with it.
    pub fn delete_invoice(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM invoices WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    /// Invoices issued on `[start, end]`.
    pub fn list_invoices_between(&self, start: NaiveDate, end: NaiveDate) -> DbResult<Vec<Invoice>> {
        self.query_invoices(
            &format!(
                "SELECT {} FROM invoices WHERE issued_on >= ?1 AND issued_on <= ?2 ORDER BY issued_on, number",
                INVOICE_COLUMNS
            ),
            params![date_to_sql(&start), date_to_sql(&end)],
        )
    }

    pub fn list_invoices_by_state(&self, state: InvoiceState) -> DbResult<Vec<Invoice>> {
        self.query_invoices(
            &format!(
                "SELECT {} FROM invoices WHERE state = ?1 ORDER BY issued_on, number",
                INVOICE_COLUMNS
            ),
            params![state.as_str()],
        )
    }

    pub fn list_invoices_for_owner(&self, owner_id: &str) -> DbResult<Vec<Invoice>> {
        self.query_invoices(
            &format!(
                "SELECT {} FROM invoices WHERE owner_id = ?1 ORDER BY issued_on DESC, number DESC",
                INVOICE_COLUMNS
            ),
            params![owner_id],
        )
    }

    /// Number of invoices whose number starts with `prefix`.
    pub fn count_invoices_with_prefix(&self, prefix: &str) -> DbResult<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM invoices WHERE substr(number, 1, length(?1)) = ?1",
            [prefix],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn invoice_number_exists(&self, number: &str) -> DbResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM invoices WHERE number = ?",
            [number],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // =====================================================================
    // Line items
    // =====================================================================

    pub fn insert_line_item(&self, invoice_id: &str, position: u32, item: &LineItem) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO invoice_line_items (
                id, invoice_id, position, description, quantity, unit_price, category
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                item.id,
                invoice_id,
                position,
                item.description,
                item.quantity,
                item.unit_price.to_string(),
                item.category,
            ],
        )?;
        Ok(())
    }

    /// Position after the last line item of an invoice.
    pub fn next_line_position(&self, invoice_id: &str) -> DbResult<u32> {
        let next: u32 = self.conn.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM invoice_line_items WHERE invoice_id = ?",
            [invoice_id],
            |row| row.get(0),
        )?;
        Ok(next)
    }

    pub fn update_line_item(&self, invoice_id: &str, item: &LineItem) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE invoice_line_items SET
                description = ?3,
                quantity = ?4,
                unit_price = ?5,
                category = ?6
            WHERE id = ?1 AND invoice_id = ?2
            "#,
            params![
                item.id,
                invoice_id,
                item.description,
                item.quantity,
                item.unit_price.to_string(),
                item.category,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    pub fn delete_line_item(&self, invoice_id: &str, item_id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "DELETE FROM invoice_line_items WHERE id = ?1 AND invoice_id = ?2",
            params![item_id, invoice_id],
        )?;
        Ok(rows_affected > 0)
    }

    pub fn list_line_items(&self, invoice_id: &str) -> DbResult<Vec<LineItem>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, description, quantity, unit_price, category
            FROM invoice_line_items
            WHERE invoice_id = ?
            ORDER BY position
            "#,
        )?;
        let rows = stmt.query_map([invoice_id], |row| {
            Ok(LineItemRow {
                id: row.get(0)?,
                description: row.get(1)?,
                quantity: row.get(2)?,
                unit_price: row.get(3)?,
                category: row.get(4)?,
            })
        })?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?.try_into()?);
        }
        Ok(items)
    }

    fn query_invoices<P: rusqlite::Params>(&self, sql: &str, params: P) -> DbResult<Vec<Invoice>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, InvoiceRow::from_row)?;

        let mut headers = Vec::new();
        for row in rows {
            headers.push(row?);
        }
        headers
            .into_iter()
            .map(|row| self.hydrate_invoice(row))
            .collect()
    }

    fn hydrate_invoice(&self, row: InvoiceRow) -> DbResult<Invoice> {
        let mut invoice: Invoice = row.try_into()?;
        invoice.line_items = self.list_line_items(&invoice.id)?;
        Ok(invoice)
    }
}

/// Intermediate row struct for database mapping.
struct InvoiceRow {
    id: String,
    number: String,
    owner_id: String,
    issued_on: String,
    due_on: Option<String>,
    state: String,
    payment_method: Option<String>,
    paid_on: Option<String>,
    notes: Option<String>,
}

impl InvoiceRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            number: row.get(1)?,
            owner_id: row.get(2)?,
            issued_on: row.get(3)?,
            due_on: row.get(4)?,
            state: row.get(5)?,
            payment_method: row.get(6)?,
            paid_on: row.get(7)?,
            notes: row.get(8)?,
        })
    }
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = DbError;

    fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
        Ok(Invoice {
            issued_on: parse_date(&row.issued_on)?,
            due_on: parse_opt_date(row.due_on)?,
            state: parse_wire(&row.state, "invoice state")?,
            paid_on: parse_opt_date(row.paid_on)?,
            id: row.id,
            number: row.number,
            owner_id: row.owner_id,
            payment_method: row.payment_method,
            notes: row.notes,
            line_items: Vec::new(),
            subtotal: Decimal::ZERO,
            tax: Decimal::ZERO,
            total: Decimal::ZERO,
        })
    }
}

struct LineItemRow {
    id: String,
    description: String,
    quantity: u32,
    unit_price: String,
    category: Option<String>,
}

impl TryFrom<LineItemRow> for LineItem {
    type Error = DbError;

    fn try_from(row: LineItemRow) -> Result<Self, Self::Error> {
        Ok(LineItem {
            unit_price: parse_decimal(&row.unit_price)?,
            id: row.id,
            description: row.description,
            quantity: row.quantity,
            category: row.category,
        })
    }
}
