//! Owner, pet, and staff database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::models::{Owner, Pet, Technician, Veterinarian};

const PET_COLUMNS: &str =
    "id, owner_id, name, species, breed, age_years, sex, weight_kg, color, notes";

fn pet_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Pet> {
    Ok(Pet {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        species: row.get(3)?,
        breed: row.get(4)?,
        age_years: row.get(5)?,
        sex: row.get(6)?,
        weight_kg: row.get(7)?,
        color: row.get(8)?,
        notes: row.get(9)?,
    })
}

impl Database {
    /// Insert a new owner.
    pub fn insert_owner(&self, owner: &Owner) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO owners (id, document_id, first_names, last_names, phone, email, address)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                owner.id,
                owner.document_id,
                owner.first_names,
                owner.last_names,
                owner.phone,
                owner.email,
                owner.address,
            ],
        )?;
        Ok(())
    }

    /// Get an owner by ID.
    pub fn get_owner(&self, id: &str) -> DbResult<Option<Owner>> {
        self.conn
            .query_row(
                r#"
                SELECT id, document_id, first_names, last_names, phone, email, address
                FROM owners
                WHERE id = ?
                "#,
                [id],
                |row| {
                    Ok(Owner {
                        id: row.get(0)?,
                        document_id: row.get(1)?,
                        first_names: row.get(2)?,
                        last_names: row.get(3)?,
                        phone: row.get(4)?,
                        email: row.get(5)?,
                        address: row.get(6)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// Insert a new pet.
    pub fn insert_pet(&self, pet: &Pet) -> DbResult<()> {
        self.conn.execute(
            &format!("INSERT INTO pets ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)", PET_COLUMNS),
            params![
                pet.id,
                pet.owner_id,
                pet.name,
                pet.species,
                pet.breed,
                pet.age_years,
                pet.sex,
                pet.weight_kg,
                pet.color,
                pet.notes,
            ],
        )?;
        Ok(())
    }

    /// Get a pet by ID.
    pub fn get_pet(&self, id: &str) -> DbResult<Option<Pet>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM pets WHERE id = ?", PET_COLUMNS),
                [id],
                pet_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// List the pets of one owner.
    pub fn list_pets_for_owner(&self, owner_id: &str) -> DbResult<Vec<Pet>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM pets WHERE owner_id = ? ORDER BY name",
            PET_COLUMNS
        ))?;
        let rows = stmt.query_map([owner_id], pet_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn insert_veterinarian(&self, vet: &Veterinarian) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO veterinarians (id, full_name, license_number, specialty, active) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![vet.id, vet.full_name, vet.license_number, vet.specialty, vet.active],
        )?;
        Ok(())
    }

    pub fn get_veterinarian(&self, id: &str) -> DbResult<Option<Veterinarian>> {
        self.conn
            .query_row(
                "SELECT id, full_name, license_number, specialty, active FROM veterinarians WHERE id = ?",
                [id],
                |row| {
                    Ok(Veterinarian {
                        id: row.get(0)?,
                        full_name: row.get(1)?,
                        license_number: row.get(2)?,
                        specialty: row.get(3)?,
                        active: row.get(4)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_veterinarians(&self) -> DbResult<Vec<Veterinarian>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, full_name, license_number, specialty, active FROM veterinarians ORDER BY full_name",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Veterinarian {
                id: row.get(0)?,
                full_name: row.get(1)?,
                license_number: row.get(2)?,
                specialty: row.get(3)?,
                active: row.get(4)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn insert_technician(&self, tech: &Technician) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO technicians (id, full_name, active) VALUES (?1, ?2, ?3)",
            params![tech.id, tech.full_name, tech.active],
        )?;
        Ok(())
    }

    pub fn get_technician(&self, id: &str) -> DbResult<Option<Technician>> {
        self.conn
            .query_row(
                "SELECT id, full_name, active FROM technicians WHERE id = ?",
                [id],
                |row| {
                    Ok(Technician {
                        id: row.get(0)?,
                        full_name: row.get(1)?,
                        active: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_technicians(&self) -> DbResult<Vec<Technician>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, full_name, active FROM technicians ORDER BY full_name")?;
        let rows = stmt.query_map([], |row| {
            Ok(Technician {
                id: row.get(0)?,
                full_name: row.get(1)?,
                active: row.get(2)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}
