//! Domain models for the laboratory workflow.
//!
//! Entities reference each other by id only. Owners own pets, pets aggregate
//! orders, and reverse lookups go through the database queries.

/// Closed state vocabulary with a canonical wire spelling plus accepted
/// legacy aliases. Parsing is case-insensitive.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal $(| $alias:literal)* ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Canonical wire spelling.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::error::LabError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_uppercase();
                $(
                    if normalized == $wire $(|| normalized == $alias)* {
                        return Ok($name::$variant);
                    }
                )+
                Err(crate::error::LabError::Validation(format!(
                    "unknown {} '{}'",
                    stringify!($name),
                    s
                )))
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

mod appointment;
mod inventory;
mod invoice;
mod order;
mod owner;
mod payment;
mod result;
mod sample;
mod staff;

pub use appointment::*;
pub use inventory::*;
pub use invoice::*;
pub use order::*;
pub use owner::*;
pub use payment::*;
pub use result::*;
pub use sample::*;
pub use staff::*;

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_enum_parse_is_case_insensitive() {
        assert_eq!("en_proceso".parse::<OrderState>().unwrap(), OrderState::InProgress);
        assert_eq!(" Completada ".parse::<OrderState>().unwrap(), OrderState::Completed);
    }

    #[test]
    fn test_wire_enum_accepts_legacy_aliases() {
        assert_eq!("URGENTE".parse::<Priority>().unwrap(), Priority::Urgent);
        assert_eq!("cancelada".parse::<AppointmentState>().unwrap(), AppointmentState::Cancelled);
        assert_eq!("PAGADA".parse::<InvoiceState>().unwrap(), InvoiceState::Paid);
    }

    #[test]
    fn test_wire_enum_rejects_unknown() {
        assert!("ARCHIVED".parse::<OrderState>().is_err());
    }

    #[test]
    fn test_wire_enum_serde_uses_canonical_spelling() {
        let json = serde_json::to_string(&OrderState::InProgress).unwrap();
        assert_eq!(json, "\"EN_PROCESO\"");
        let back: OrderState = serde_json::from_str("\"in_progress\"").unwrap();
        assert_eq!(back, OrderState::InProgress);
    }
}
