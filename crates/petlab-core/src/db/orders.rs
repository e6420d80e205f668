//! Order and sample collection database operations.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

use super::{
    date_to_sql, day_bounds, opt_ts_to_sql, parse_date, parse_opt_ts, parse_ts, parse_wire, ts_to_sql,
    Database, DbError, DbResult,
};
use crate::models::{Order, OrderState, Priority, SampleCollection};

const ORDER_COLUMNS: &str = "id, pet_id, vet_id, exam_type, priority, state, ordered_on, \
     observations, presumptive_diagnosis, symptoms, created_at";

const SAMPLE_COLUMNS: &str = "id, order_id, technician_id, sample_code, sample_type, \
     collection_method, volume, conditions, notes, state, scheduled_at, taken_at";

impl Database {
    /// Insert a new order.
    pub fn insert_order(&self, order: &Order) -> DbResult<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO orders ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                ORDER_COLUMNS
            ),
            params![
                order.id,
                order.pet_id,
                order.vet_id,
                order.exam_type,
                order.priority.as_str(),
                order.state.as_str(),
                date_to_sql(&order.ordered_on),
                order.observations,
                order.presumptive_diagnosis,
                order.symptoms,
                ts_to_sql(&order.created_at),
            ],
        )?;
        Ok(())
    }

    /// Set the state of an order. Returns false if the order does not exist.
    pub fn update_order_state(&self, order_id: &str, state: OrderState) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "UPDATE orders SET state = ?2 WHERE id = ?1",
            params![order_id, state.as_str()],
        )?;
        Ok(rows_affected > 0)
    }

    /// Get an order by ID.
    pub fn get_order(&self, id: &str) -> DbResult<Option<Order>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM orders WHERE id = ?", ORDER_COLUMNS),
                [id],
                OrderRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Get an order, failing with `NotFound` if absent.
    pub fn require_order(&self, id: &str) -> DbResult<Order> {
        self.get_order(id)?
            .ok_or_else(|| DbError::NotFound(format!("order {}", id)))
    }

    /// Delete an order. Its sample collection goes with it; results block the delete.
    pub fn delete_order(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM orders WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    /// Orders in a given state, newest first.
    pub fn list_orders_by_state(&self, state: OrderState) -> DbResult<Vec<Order>> {
        self.query_orders(
            &format!(
                "SELECT {} FROM orders WHERE state = ?1 ORDER BY created_at DESC",
                ORDER_COLUMNS
            ),
            params![state.as_str()],
        )
    }

    /// Orders for one pet, newest first.
    pub fn list_orders_for_pet(&self, pet_id: &str) -> DbResult<Vec<Order>> {
        self.query_orders(
            &format!(
                "SELECT {} FROM orders WHERE pet_id = ?1 ORDER BY created_at DESC",
                ORDER_COLUMNS
            ),
            params![pet_id],
        )
    }

    /// Open orders with the given priority, oldest first.
    pub fn list_open_orders_by_priority(&self, priority: Priority) -> DbResult<Vec<Order>> {
        self.query_orders(
            &format!(
                "SELECT {} FROM orders WHERE priority = ?1 AND state IN (?2, ?3) ORDER BY created_at",
                ORDER_COLUMNS
            ),
            params![
                priority.as_str(),
                OrderState::Pending.as_str(),
                OrderState::InProgress.as_str()
            ],
        )
    }

    /// Orders whose order date falls in `[start, end]`.
    pub fn list_orders_between(&self, start: NaiveDate, end: NaiveDate) -> DbResult<Vec<Order>> {
        self.query_orders(
            &format!(
                "SELECT {} FROM orders WHERE ordered_on >= ?1 AND ordered_on <= ?2 ORDER BY ordered_on, created_at",
                ORDER_COLUMNS
            ),
            params![date_to_sql(&start), date_to_sql(&end)],
        )
    }

    pub fn list_orders(&self) -> DbResult<Vec<Order>> {
        self.query_orders(
            &format!("SELECT {} FROM orders ORDER BY created_at", ORDER_COLUMNS),
            params![],
        )
    }

    fn query_orders<P: rusqlite::Params>(&self, sql: &str, params: P) -> DbResult<Vec<Order>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, OrderRow::from_row)?;

        let mut orders = Vec::new();
        for row in rows {
            orders.push(row?.try_into()?);
        }
        Ok(orders)
    }

    // =====================================================================
    // Sample collections
    // =====================================================================

    /// Insert a sample collection.
    pub fn insert_sample(&self, sample: &SampleCollection) -> DbResult<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO sample_collections ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                SAMPLE_COLUMNS
            ),
            params![
                sample.id,
                sample.order_id,
                sample.technician_id,
                sample.sample_code,
                sample.sample_type,
                sample.collection_method,
                sample.volume,
                sample.conditions,
                sample.notes,
                sample.state.as_str(),
                ts_to_sql(&sample.scheduled_at),
                opt_ts_to_sql(&sample.taken_at),
            ],
        )?;
        Ok(())
    }

    /// Persist the mutable fields of a sample collection.
    pub fn update_sample(&self, sample: &SampleCollection) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE sample_collections SET
                technician_id = ?2,
                collection_method = ?3,
                volume = ?4,
                conditions = ?5,
                notes = ?6,
                state = ?7,
                scheduled_at = ?8,
                taken_at = ?9
            WHERE id = ?1
            "#,
            params![
                sample.id,
                sample.technician_id,
                sample.collection_method,
                sample.volume,
                sample.conditions,
                sample.notes,
                sample.state.as_str(),
                ts_to_sql(&sample.scheduled_at),
                opt_ts_to_sql(&sample.taken_at),
            ],
        )?;
        Ok(rows_affected > 0)
    }

    pub fn get_sample(&self, id: &str) -> DbResult<Option<SampleCollection>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM sample_collections WHERE id = ?", SAMPLE_COLUMNS),
                [id],
                SampleRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// The sample collection of an order, if one was scheduled.
    pub fn get_sample_for_order(&self, order_id: &str) -> DbResult<Option<SampleCollection>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM sample_collections WHERE order_id = ?",
                    SAMPLE_COLUMNS
                ),
                [order_id],
                SampleRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    pub fn list_samples(&self) -> DbResult<Vec<SampleCollection>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM sample_collections ORDER BY scheduled_at",
            SAMPLE_COLUMNS
        ))?;
        let rows = stmt.query_map([], SampleRow::from_row)?;

        let mut samples = Vec::new();
        for row in rows {
            samples.push(row?.try_into()?);
        }
        Ok(samples)
    }

    /// Samples scheduled on the calendar days `[start, end]`.
    pub fn list_samples_scheduled_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DbResult<Vec<SampleCollection>> {
        let (from, to) = day_bounds(start, end);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM sample_collections WHERE scheduled_at >= ?1 AND scheduled_at <= ?2 ORDER BY scheduled_at",
            SAMPLE_COLUMNS
        ))?;
        let rows = stmt.query_map(params![from, to], SampleRow::from_row)?;

        let mut samples = Vec::new();
        for row in rows {
            samples.push(row?.try_into()?);
        }
        Ok(samples)
    }

    pub fn sample_code_exists(&self, code: &str) -> DbResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sample_collections WHERE sample_code = ?",
            [code],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

/// Intermediate row struct for database mapping.
struct OrderRow {
    id: String,
    pet_id: String,
    vet_id: String,
    exam_type: String,
    priority: String,
    state: String,
    ordered_on: String,
    observations: Option<String>,
    presumptive_diagnosis: Option<String>,
    symptoms: Option<String>,
    created_at: String,
}

impl OrderRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            pet_id: row.get(1)?,
            vet_id: row.get(2)?,
            exam_type: row.get(3)?,
            priority: row.get(4)?,
            state: row.get(5)?,
            ordered_on: row.get(6)?,
            observations: row.get(7)?,
            presumptive_diagnosis: row.get(8)?,
            symptoms: row.get(9)?,
            created_at: row.get(10)?,
        })
    }
}

impl TryFrom<OrderRow> for Order {
    type Error = DbError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            priority: parse_wire(&row.priority, "priority")?,
            state: parse_wire(&row.state, "order state")?,
            ordered_on: parse_date(&row.ordered_on)?,
            created_at: parse_ts(&row.created_at)?,
            id: row.id,
            pet_id: row.pet_id,
            vet_id: row.vet_id,
            exam_type: row.exam_type,
            observations: row.observations,
            presumptive_diagnosis: row.presumptive_diagnosis,
            symptoms: row.symptoms,
        })
    }
}

struct SampleRow {
    id: String,
    order_id: String,
    technician_id: String,
    sample_code: String,
    sample_type: String,
    collection_method: Option<String>,
    volume: Option<String>,
    conditions: Option<String>,
    notes: Option<String>,
    state: String,
    scheduled_at: String,
    taken_at: Option<String>,
}

impl SampleRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            order_id: row.get(1)?,
            technician_id: row.get(2)?,
            sample_code: row.get(3)?,
            sample_type: row.get(4)?,
            collection_method: row.get(5)?,
            volume: row.get(6)?,
            conditions: row.get(7)?,
            notes: row.get(8)?,
            state: row.get(9)?,
            scheduled_at: row.get(10)?,
            taken_at: row.get(11)?,
        })
    }
}

impl TryFrom<SampleRow> for SampleCollection {
    type Error = DbError;

    fn try_from(row: SampleRow) -> Result<Self, Self::Error> {
        Ok(SampleCollection {
            state: parse_wire(&row.state, "sample state")?,
            scheduled_at: parse_ts(&row.scheduled_at)?,
            taken_at: parse_opt_ts(row.taken_at)?,
            id: row.id,
            order_id: row.order_id,
            technician_id: row.technician_id,
            sample_code: row.sample_code,
            sample_type: row.sample_type,
            collection_method: row.collection_method,
            volume: row.volume,
            conditions: row.conditions,
            notes: row.notes,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::models::{new_id, Owner, Pet, Technician, Veterinarian};
    use chrono::{TimeZone, Utc};

    /// Seeded ids for one owner, pet, vet, and technician.
    pub(crate) struct Seed {
        pub owner_id: String,
        pub pet_id: String,
        pub vet_id: String,
        pub tech_id: String,
    }

    pub(crate) fn seed(db: &Database) -> Seed {
        let owner = Owner::new(new_id(), "Ana".into(), "Quispe".into());
        db.insert_owner(&owner).unwrap();
        let pet = Pet::new(owner.id.clone(), "Max".into(), "canine".into());
        db.insert_pet(&pet).unwrap();
        let vet = Veterinarian::new("Dr. Rojas".into());
        db.insert_veterinarian(&vet).unwrap();
        let tech = Technician::new("Luis Paz".into());
        db.insert_technician(&tech).unwrap();
        Seed {
            owner_id: owner.id,
            pet_id: pet.id,
            vet_id: vet.id,
            tech_id: tech.id,
        }
    }

    pub(crate) fn order(seed: &Seed, exam_type: &str, ordered_on: NaiveDate) -> Order {
        Order {
            id: new_id(),
            pet_id: seed.pet_id.clone(),
            vet_id: seed.vet_id.clone(),
            exam_type: exam_type.into(),
            priority: Priority::Normal,
            state: OrderState::Pending,
            ordered_on,
            observations: None,
            presumptive_diagnosis: None,
            symptoms: None,
            created_at: Utc.from_utc_datetime(&ordered_on.and_hms_opt(8, 0, 0).unwrap()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::models::{new_id, SampleState};
    use chrono::{TimeZone, Utc};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_insert_and_get_order() {
        let db = Database::open_in_memory().unwrap();
        let seed = seed(&db);
        let order = order(&seed, "Hemograma", day(1));
        db.insert_order(&order).unwrap();

        let retrieved = db.get_order(&order.id).unwrap().unwrap();
        assert_eq!(retrieved, order);
        assert!(db.get_order("missing").unwrap().is_none());
        assert!(matches!(db.require_order("missing"), Err(DbError::NotFound(_))));
    }

    #[test]
    fn test_update_state_and_list_by_state() {
        let db = Database::open_in_memory().unwrap();
        let seed = seed(&db);
        let a = order(&seed, "Hemograma", day(1));
        let b = order(&seed, "Urianálisis", day(2));
        db.insert_order(&a).unwrap();
        db.insert_order(&b).unwrap();

        assert!(db.update_order_state(&a.id, OrderState::InProgress).unwrap());
        assert!(!db.update_order_state("missing", OrderState::InProgress).unwrap());

        let pending = db.list_orders_by_state(OrderState::Pending).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, b.id);
    }

    #[test]
    fn test_orders_between_is_inclusive() {
        let db = Database::open_in_memory().unwrap();
        let seed = seed(&db);
        for d in [1, 5, 10] {
            db.insert_order(&order(&seed, "Hemograma", day(d))).unwrap();
        }
        assert_eq!(db.list_orders_between(day(1), day(5)).unwrap().len(), 2);
        assert_eq!(db.list_orders_between(day(6), day(9)).unwrap().len(), 0);
    }

    #[test]
    fn test_sample_roundtrip_and_lookup_by_order() {
        let db = Database::open_in_memory().unwrap();
        let seed = seed(&db);
        let order = order(&seed, "Hemograma", day(1));
        db.insert_order(&order).unwrap();

        let mut sample = SampleCollection {
            id: new_id(),
            order_id: order.id.clone(),
            technician_id: seed.tech_id.clone(),
            sample_code: "TM-000001-ABCDEF01".into(),
            sample_type: "Sangre".into(),
            collection_method: None,
            volume: Some("2 mL".into()),
            conditions: None,
            notes: None,
            state: SampleState::Scheduled,
            scheduled_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
            taken_at: None,
        };
        db.insert_sample(&sample).unwrap();
        assert!(db.sample_code_exists("TM-000001-ABCDEF01").unwrap());

        sample.state = SampleState::Taken;
        sample.taken_at = Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 15, 0).unwrap());
        assert!(db.update_sample(&sample).unwrap());

        let retrieved = db.get_sample_for_order(&order.id).unwrap().unwrap();
        assert_eq!(retrieved, sample);
    }

    #[test]
    fn test_delete_order_cascades_sample() {
        let db = Database::open_in_memory().unwrap();
        let seed = seed(&db);
        let order = order(&seed, "Hemograma", day(1));
        db.insert_order(&order).unwrap();
        db.insert_sample(&SampleCollection {
            id: new_id(),
            order_id: order.id.clone(),
            technician_id: seed.tech_id.clone(),
            sample_code: "TM-1".into(),
            sample_type: "Sangre".into(),
            collection_method: None,
            volume: None,
            conditions: None,
            notes: None,
            state: SampleState::Scheduled,
            scheduled_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
            taken_at: None,
        })
        .unwrap();

        assert!(db.delete_order(&order.id).unwrap());
        assert!(db.list_samples().unwrap().is_empty());
    }
}
