//! Laboratory staff.

use serde::{Deserialize, Serialize};

use super::new_id;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Veterinarian {
    pub id: String,
    pub full_name: String,
    pub license_number: Option<String>,
    pub specialty: Option<String>,
    pub active: bool,
}

impl Veterinarian {
    pub fn new(full_name: String) -> Self {
        Self {
            id: new_id(),
            full_name,
            license_number: None,
            specialty: None,
            active: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Technician {
    pub id: String,
    pub full_name: String,
    pub active: bool,
}

impl Technician {
    pub fn new(full_name: String) -> Self {
        Self {
            id: new_id(),
            full_name,
            active: true,
        }
    }
}
