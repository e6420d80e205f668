//! Domain error taxonomy shared by every core component.

use thiserror::Error;

use crate::db::DbError;

/// Illegal moves through one of the lifecycle state machines.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransitionError {
    #[error("result {0} has already been validated")]
    AlreadyValidated(String),

    #[error("result {0} must be validated before delivery")]
    NotValidated(String),

    #[error("result {0} has already been delivered")]
    AlreadyDelivered(String),

    #[error("order {order_id} is closed ({state})")]
    OrderClosed { order_id: String, state: String },

    #[error("appointment {appointment_id} is closed ({state})")]
    AppointmentClosed {
        appointment_id: String,
        state: String,
    },

    #[error("payment {0} is not a hospitalization")]
    NotHospitalization(String),

    #[error("hospitalization for payment {0} has already ended")]
    HospitalizationClosed(String),

    #[error("invoice {0} is already paid")]
    InvoiceAlreadyPaid(String),

    #[error("invoice {0} has been voided")]
    InvoiceVoid(String),

    #[error("payment {0} has been cancelled")]
    PaymentCancelled(String),
}

/// Errors surfaced by the core operations.
#[derive(Error, Debug)]
pub enum LabError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Illegal state transition: {0}")]
    IllegalTransition(#[from] TransitionError),

    #[error("Insufficient stock for {item}: requested {requested}, available {available}")]
    InsufficientStock {
        item: String,
        requested: u32,
        available: u32,
    },

    #[error("Database error: {0}")]
    Database(DbError),
}

pub type LabResult<T> = Result<T, LabError>;

impl LabError {
    /// Status code the transport layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            LabError::Validation(_) => 400,
            LabError::NotFound(_) => 404,
            LabError::Conflict(_)
            | LabError::IllegalTransition(_)
            | LabError::InsufficientStock { .. } => 409,
            LabError::Database(_) => 500,
        }
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        LabError::Validation(msg.into())
    }

    pub(crate) fn not_found(kind: &str, id: &str) -> Self {
        LabError::NotFound(format!("{} {}", kind, id))
    }
}

impl From<DbError> for LabError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(what) => LabError::NotFound(what),
            DbError::Constraint(msg) => LabError::Conflict(msg),
            DbError::Sqlite(rusqlite::Error::SqliteFailure(err, msg))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                LabError::Conflict(msg.unwrap_or_else(|| err.to_string()))
            }
            other => LabError::Database(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(LabError::validation("x").http_status(), 400);
        assert_eq!(LabError::not_found("order", "1").http_status(), 404);
        assert_eq!(LabError::Conflict("dup".into()).http_status(), 409);
        assert_eq!(
            LabError::from(TransitionError::NotValidated("r1".into())).http_status(),
            409
        );
    }

    #[test]
    fn test_db_not_found_maps_to_not_found() {
        let err: LabError = DbError::NotFound("order abc".into()).into();
        assert!(matches!(err, LabError::NotFound(ref s) if s == "order abc"));
    }

    #[test]
    fn test_db_constraint_maps_to_conflict() {
        let err: LabError = DbError::Constraint("duplicate".into()).into();
        assert!(matches!(err, LabError::Conflict(_)));
    }
}
