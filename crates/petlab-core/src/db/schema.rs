//! SQLite schema definition.

/// Complete database schema for the laboratory core.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Owners, Pets, Staff
-- ============================================================================

CREATE TABLE IF NOT EXISTS owners (
    id TEXT PRIMARY KEY,
    document_id TEXT NOT NULL UNIQUE,
    first_names TEXT NOT NULL,
    last_names TEXT NOT NULL,
    phone TEXT,
    email TEXT,
    address TEXT
);

CREATE TABLE IF NOT EXISTS pets (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL REFERENCES owners(id),
    name TEXT NOT NULL,
    species TEXT NOT NULL,
    breed TEXT,
    age_years INTEGER,
    sex TEXT,
    weight_kg REAL,
    color TEXT,
    notes TEXT
);

CREATE INDEX IF NOT EXISTS idx_pets_owner ON pets(owner_id);

CREATE TABLE IF NOT EXISTS veterinarians (
    id TEXT PRIMARY KEY,
    full_name TEXT NOT NULL,
    license_number TEXT,
    specialty TEXT,
    active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS technicians (
    id TEXT PRIMARY KEY,
    full_name TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1
);

-- ============================================================================
-- Orders, Samples, Results
-- ============================================================================

CREATE TABLE IF NOT EXISTS orders (
    id TEXT PRIMARY KEY,
    pet_id TEXT NOT NULL REFERENCES pets(id),
    vet_id TEXT NOT NULL REFERENCES veterinarians(id),
    exam_type TEXT NOT NULL,
    priority TEXT NOT NULL DEFAULT 'NORMAL',
    state TEXT NOT NULL DEFAULT 'PENDIENTE',
    ordered_on TEXT NOT NULL,                    -- YYYY-MM-DD
    observations TEXT,
    presumptive_diagnosis TEXT,
    symptoms TEXT,
    created_at TEXT NOT NULL                     -- RFC 3339
);

CREATE INDEX IF NOT EXISTS idx_orders_pet ON orders(pet_id);
CREATE INDEX IF NOT EXISTS idx_orders_state ON orders(state);
CREATE INDEX IF NOT EXISTS idx_orders_ordered_on ON orders(ordered_on);

-- One sample collection per order, removed together with the order
CREATE TABLE IF NOT EXISTS sample_collections (
    id TEXT PRIMARY KEY,
    order_id TEXT NOT NULL UNIQUE REFERENCES orders(id) ON DELETE CASCADE,
    technician_id TEXT NOT NULL REFERENCES technicians(id),
    sample_code TEXT NOT NULL UNIQUE,
    sample_type TEXT NOT NULL,
    collection_method TEXT,
    volume TEXT,
    conditions TEXT,
    notes TEXT,
    state TEXT NOT NULL DEFAULT 'SCHEDULED',
    scheduled_at TEXT NOT NULL,
    taken_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_samples_technician ON sample_collections(technician_id);

-- Results block order deletion (no cascade)
CREATE TABLE IF NOT EXISTS results (
    id TEXT PRIMARY KEY,
    order_id TEXT NOT NULL REFERENCES orders(id),
    recorded_at TEXT NOT NULL,
    description TEXT,
    result_values TEXT,
    reference_values TEXT,
    conclusions TEXT,
    recommendations TEXT,
    method TEXT,
    technical_notes TEXT,
    validated INTEGER NOT NULL DEFAULT 0,
    validated_at TEXT,
    delivered INTEGER NOT NULL DEFAULT 0,
    delivered_at TEXT,
    CHECK (delivered = 0 OR validated = 1)
);

CREATE INDEX IF NOT EXISTS idx_results_order ON results(order_id);
CREATE INDEX IF NOT EXISTS idx_results_recorded_at ON results(recorded_at);

-- ============================================================================
-- Appointments
-- ============================================================================

CREATE TABLE IF NOT EXISTS appointments (
    id TEXT PRIMARY KEY,
    pet_id TEXT NOT NULL REFERENCES pets(id),
    vet_id TEXT REFERENCES veterinarians(id),
    scheduled_at TEXT NOT NULL,
    reason TEXT NOT NULL,
    kind TEXT,
    state TEXT NOT NULL DEFAULT 'SCHEDULED',
    duration_minutes INTEGER NOT NULL DEFAULT 30,
    notes TEXT,
    fee TEXT,                                    -- decimal
    reminder_sent INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_appointments_scheduled_at ON appointments(scheduled_at);

-- ============================================================================
-- Billing
-- ============================================================================

-- Totals are derived from line items and never stored
CREATE TABLE IF NOT EXISTS invoices (
    id TEXT PRIMARY KEY,
    number TEXT NOT NULL UNIQUE,
    owner_id TEXT NOT NULL REFERENCES owners(id),
    issued_on TEXT NOT NULL,
    due_on TEXT,
    state TEXT NOT NULL DEFAULT 'PENDING',
    payment_method TEXT,
    paid_on TEXT,
    notes TEXT
);

CREATE INDEX IF NOT EXISTS idx_invoices_owner ON invoices(owner_id);
CREATE INDEX IF NOT EXISTS idx_invoices_issued_on ON invoices(issued_on);

CREATE TABLE IF NOT EXISTS invoice_line_items (
    id TEXT PRIMARY KEY,
    invoice_id TEXT NOT NULL REFERENCES invoices(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    description TEXT NOT NULL,
    quantity INTEGER NOT NULL CHECK (quantity > 0),
    unit_price TEXT NOT NULL,                    -- decimal
    category TEXT
);

CREATE INDEX IF NOT EXISTS idx_line_items_invoice ON invoice_line_items(invoice_id, position);

CREATE TABLE IF NOT EXISTS payments (
    id TEXT PRIMARY KEY,
    number TEXT NOT NULL UNIQUE,
    owner_id TEXT NOT NULL REFERENCES owners(id),
    pet_id TEXT REFERENCES pets(id),
    concept TEXT NOT NULL,
    kind TEXT,
    amount TEXT NOT NULL,                        -- decimal
    amount_paid TEXT NOT NULL DEFAULT '0',       -- decimal
    method TEXT,
    state TEXT NOT NULL DEFAULT 'PENDING',
    issued_on TEXT NOT NULL,
    due_on TEXT,
    paid_at TEXT,
    notes TEXT,
    is_hospitalization INTEGER NOT NULL DEFAULT 0,
    hospitalization_start TEXT,
    hospitalization_end TEXT,
    hospitalization_daily_rate TEXT,             -- decimal
    hospitalization_days INTEGER
);

CREATE INDEX IF NOT EXISTS idx_payments_owner ON payments(owner_id);

-- ============================================================================
-- Inventory
-- ============================================================================

CREATE TABLE IF NOT EXISTS inventory_items (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    category TEXT,
    purchase_price TEXT,
    sale_price TEXT,
    stock INTEGER NOT NULL DEFAULT 0 CHECK (stock >= 0),
    min_stock INTEGER NOT NULL DEFAULT 0,
    max_stock INTEGER,
    unit TEXT,
    expires_on TEXT,
    supplier TEXT,
    active INTEGER NOT NULL DEFAULT 1
);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn.execute(
            "INSERT INTO owners (id, document_id, first_names, last_names) VALUES ('o1', 'D1', 'Ana', 'Quispe')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO pets (id, owner_id, name, species) VALUES ('p1', 'o1', 'Max', 'canine')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO veterinarians (id, full_name) VALUES ('v1', 'Dr. Rojas')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO technicians (id, full_name) VALUES ('t1', 'Luis Paz')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO orders (id, pet_id, vet_id, exam_type, ordered_on, created_at) VALUES ('ord1', 'p1', 'v1', 'Hemograma', '2024-01-01', '2024-01-01T00:00:00Z')",
            [],
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_schema_valid() {
        let conn = Connection::open_in_memory().unwrap();
        let result = conn.execute_batch(SCHEMA);
        assert!(result.is_ok(), "Schema should be valid SQL: {:?}", result);
        // Idempotent
        assert!(conn.execute_batch(SCHEMA).is_ok());
    }

    #[test]
    fn test_one_sample_per_order() {
        let conn = setup();
        conn.execute(
            "INSERT INTO sample_collections (id, order_id, technician_id, sample_code, sample_type, scheduled_at) VALUES ('s1', 'ord1', 't1', 'TM-1', 'Sangre', '2024-01-01T00:00:00Z')",
            [],
        )
        .unwrap();

        let result = conn.execute(
            "INSERT INTO sample_collections (id, order_id, technician_id, sample_code, sample_type, scheduled_at) VALUES ('s2', 'ord1', 't1', 'TM-2', 'Sangre', '2024-01-01T00:00:00Z')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_sample_cascades_with_order() {
        let conn = setup();
        conn.execute(
            "INSERT INTO sample_collections (id, order_id, technician_id, sample_code, sample_type, scheduled_at) VALUES ('s1', 'ord1', 't1', 'TM-1', 'Sangre', '2024-01-01T00:00:00Z')",
            [],
        )
        .unwrap();
        conn.execute("DELETE FROM orders WHERE id = 'ord1'", []).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM sample_collections", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_results_block_order_delete() {
        let conn = setup();
        conn.execute(
            "INSERT INTO results (id, order_id, recorded_at) VALUES ('r1', 'ord1', '2024-01-01T00:00:00Z')",
            [],
        )
        .unwrap();

        let result = conn.execute("DELETE FROM orders WHERE id = 'ord1'", []);
        assert!(result.is_err());
    }

    #[test]
    fn test_delivery_requires_validation() {
        let conn = setup();
        let result = conn.execute(
            "INSERT INTO results (id, order_id, recorded_at, validated, delivered) VALUES ('r1', 'ord1', '2024-01-01T00:00:00Z', 0, 1)",
            [],
        );
        assert!(result.is_err());
    }
}
