//! Owners and their pets.

use serde::{Deserialize, Serialize};

use super::new_id;

/// A pet owner (billing party).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Owner {
    pub id: String,
    /// National identity document
    pub document_id: String,
    pub first_names: String,
    pub last_names: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl Owner {
    pub fn new(document_id: String, first_names: String, last_names: String) -> Self {
        Self {
            id: new_id(),
            document_id,
            first_names,
            last_names,
            phone: None,
            email: None,
            address: None,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_names, self.last_names)
    }
}

/// A patient of the laboratory. Belongs to exactly one owner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pet {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    /// Species (e.g., "canine", "feline")
    pub species: String,
    pub breed: Option<String>,
    pub age_years: Option<u32>,
    pub sex: Option<String>,
    pub weight_kg: Option<f64>,
    pub color: Option<String>,
    pub notes: Option<String>,
}

impl Pet {
    pub fn new(owner_id: String, name: String, species: String) -> Self {
        Self {
            id: new_id(),
            owner_id,
            name,
            species,
            breed: None,
            age_years: None,
            sex: None,
            weight_kg: None,
            color: None,
            notes: None,
        }
    }

    /// Lowercased species, used as the grouping key in reports.
    pub fn canonical_species(&self) -> String {
        self.species.trim().to_lowercase()
    }
}
